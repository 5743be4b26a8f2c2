//! Helper functions shared by `start()` and `process()`.

use super::{FragmentTag, ShaderProgram};
use crate::features::ShaderFeatures;

/// Hash, value noise and curl noise used by turbulence.
pub const NOISE_HELPERS: &str = r#"
// Gradient hash on a lattice point, components in [-1, 1].
vec3 hash_noise(vec3 p) {
    p *= mat3(vec3(127.1, 311.7, -53.7), vec3(269.5, 183.3, 77.1), vec3(-301.7, 27.3, 215.3));
    return 2.0 * fract(fract(p) * 4375.55) - 1.0;
}

// Gradient noise with cubic Hermite interpolation.
float noise(vec3 p) {
    vec3 i = floor(p);
    vec3 f = fract(p);
    vec3 u = f * f * (3.0 - 2.0 * f);

    return 2.0 * mix(
        mix(
            mix(dot(hash_noise(i + vec3(0.0, 0.0, 0.0)), f - vec3(0.0, 0.0, 0.0)),
                dot(hash_noise(i + vec3(1.0, 0.0, 0.0)), f - vec3(1.0, 0.0, 0.0)), u.x),
            mix(dot(hash_noise(i + vec3(0.0, 1.0, 0.0)), f - vec3(0.0, 1.0, 0.0)),
                dot(hash_noise(i + vec3(1.0, 1.0, 0.0)), f - vec3(1.0, 1.0, 0.0)), u.x),
            u.y),
        mix(
            mix(dot(hash_noise(i + vec3(0.0, 0.0, 1.0)), f - vec3(0.0, 0.0, 1.0)),
                dot(hash_noise(i + vec3(1.0, 0.0, 1.0)), f - vec3(1.0, 0.0, 1.0)), u.x),
            mix(dot(hash_noise(i + vec3(0.0, 1.0, 1.0)), f - vec3(0.0, 1.0, 1.0)),
                dot(hash_noise(i + vec3(1.0, 1.0, 1.0)), f - vec3(1.0, 1.0, 1.0)), u.x),
            u.y),
        u.z);
}

// Three decorrelated noise channels.
vec3 noise_3d(vec3 p) {
    float s = noise(p);
    float s1 = noise(vec3(p.y - 19.1, p.z + 33.4, p.x + 47.2));
    float s2 = noise(vec3(p.z + 74.2, p.x - 124.5, p.y + 99.4));
    return vec3(s, s1, s2);
}

// Curl of the noise field by central differences.
vec3 curl_3d(vec3 p, float c) {
    float epsilon = 0.001 + c;
    vec3 dx = vec3(epsilon, 0.0, 0.0);
    vec3 dy = vec3(0.0, epsilon, 0.0);
    vec3 dz = vec3(0.0, 0.0, epsilon);
    vec3 x0 = noise_3d(p - dx);
    vec3 x1 = noise_3d(p + dx);
    vec3 y0 = noise_3d(p - dy);
    vec3 y1 = noise_3d(p + dy);
    vec3 z0 = noise_3d(p - dz);
    vec3 z1 = noise_3d(p + dz);
    float x = y1.z - y0.z - z1.y + z0.y;
    float y = z1.x - z0.x - x1.z + x0.z;
    float z = x1.y - x0.y - y1.x + y0.x;
    float divisor = 1.0 / (2.0 * epsilon);
    return normalize(vec3(x, y, z) * divisor);
}

vec3 get_noise_direction(vec3 pos, vec3 emission_pos, vec3 time_noise) {
    float adj_contrast = max(turbulence_noise_strength - 1.0, 0.0) * 70.0;
    vec3 noise_time = vec3(TIME) * turbulence_noise_speed + time_noise;
    vec3 noise_pos = pos * turbulence_noise_scale - emission_pos;
    vec3 diff = pos - emission_pos;
    vec3 noise_direction = curl_3d(noise_pos + noise_time - diff, adj_contrast);
    return mix(0.9 * noise_direction, noise_direction, turbulence_noise_strength - 9.0);
}
"#;

/// Park-Miller generator and seed hash.
pub const RANDOM_HELPERS: &str = r#"
float rand_from_seed(inout uint seed) {
    int k;
    int s = int(seed);
    if (s == 0) {
        s = 305420679;
    }
    k = s / 127773;
    s = 16807 * (s - k * 127773) - 2836 * k;
    if (s < 0) {
        s += 2147483647;
    }
    seed = uint(s);
    return float(seed % uint(65536)) / 65535.0;
}

float rand_from_seed_m1_p1(inout uint seed) {
    return rand_from_seed(seed) * 2.0 - 1.0;
}

uint hash(uint x) {
    x = ((x >> uint(16)) ^ x) * uint(73244475);
    x = ((x >> uint(16)) ^ x) * uint(73244475);
    x = (x >> uint(16)) ^ x;
    return x;
}

"#;

pub(super) fn emit(program: &mut ShaderProgram, f: &ShaderFeatures) {
    if f.turbulence {
        program.push(FragmentTag::NoiseHelpers, NOISE_HELPERS);
    }
    program.push(FragmentTag::RandomHelpers, RANDOM_HELPERS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hash_constant() {
        assert_eq!(73_244_475, 0x45D_9F3B);
        assert!(RANDOM_HELPERS.contains("uint(73244475)"));
    }

    #[test]
    fn test_noise_helpers_reference_turbulence_uniforms() {
        for name in ["turbulence_noise_strength", "turbulence_noise_speed", "turbulence_noise_scale"] {
            assert!(NOISE_HELPERS.contains(name));
        }
    }
}
