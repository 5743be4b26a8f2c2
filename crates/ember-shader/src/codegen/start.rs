//! `start()`: runs once when a particle is (re)spawned.

use super::{curve_sample, FragmentTag, ShaderProgram};
use crate::features::ShaderFeatures;
use crate::params::{EmissionShape, Parameter};

/// Per-particle seed and the draws shared by `start()` and `process()`.
///
/// Both stages consume the same leading draws so `angle_rand`, `scale_rand` and friends
/// agree between them.
pub(super) fn seed_block(f: &ShaderFeatures) -> String {
    let mut text = String::from(
        "    uint base_number = NUMBER;
    uint alt_seed = hash(base_number + uint(1) + RANDOM_SEED);
    float angle_rand = rand_from_seed(alt_seed);
    float scale_rand = rand_from_seed(alt_seed);
    float hue_rot_rand = rand_from_seed(alt_seed);
    float anim_offset_rand = rand_from_seed(alt_seed);
",
    );
    if f.color_initial_ramp {
        text.push_str("    float color_initial_rand = rand_from_seed(alt_seed);\n");
    }
    text.push_str("    float pi = 3.14159;\n    float degree_to_rad = pi / 180.0;\n");
    if f.emission_shape.uses_point_texture() {
        text.push_str(
            "    int point = min(emission_texture_point_count - 1, int(rand_from_seed(alt_seed) * float(emission_texture_point_count)));
    ivec2 emission_tex_size = textureSize(emission_texture_points, 0);
    ivec2 emission_tex_ofs = ivec2(point % emission_tex_size.x, point / emission_tex_size.x);
",
        );
    }
    text.push('\n');
    text
}

const VELOCITY_PLANAR: &str = "        {
            float angle1_rad = rand_from_seed_m1_p1(alt_seed) * spread_rad;
            angle1_rad += direction.x != 0.0 ? atan(direction.y, direction.x) : sign(direction.y) * (pi / 2.0);
            vec3 rot = vec3(cos(angle1_rad), sin(angle1_rad), 0.0);
            VELOCITY = rot * tex_linear_velocity * mix(initial_linear_velocity_min, initial_linear_velocity_max, rand_from_seed(alt_seed));
        }
";

const VELOCITY_SPATIAL: &str = "        {
            float angle1_rad = rand_from_seed_m1_p1(alt_seed) * spread_rad;
            float angle2_rad = rand_from_seed_m1_p1(alt_seed) * spread_rad * (1.0 - flatness);
            vec3 direction_xz = vec3(sin(angle1_rad), 0.0, cos(angle1_rad));
            vec3 direction_yz = vec3(0.0, sin(angle2_rad), cos(angle2_rad));
            direction_yz.z = direction_yz.z / max(0.0001, sqrt(abs(direction_yz.z)));
            vec3 spread_direction = vec3(direction_xz.x * direction_yz.z, direction_yz.y, direction_xz.z * direction_yz.z);
            vec3 direction_nrm = length(direction) > 0.0 ? normalize(direction) : vec3(0.0, 0.0, 1.0);
            // Rotate the cone onto the emission direction.
            vec3 binormal = cross(vec3(0.0, 1.0, 0.0), direction_nrm);
            if (length(binormal) < 0.0001) {
                binormal = vec3(0.0, 0.0, 1.0);
            }
            binormal = normalize(binormal);
            vec3 normal = cross(binormal, direction_nrm);
            spread_direction = binormal * spread_direction.x + normal * spread_direction.y + direction_nrm * spread_direction.z;
            VELOCITY = spread_direction * tex_linear_velocity * mix(initial_linear_velocity_min, initial_linear_velocity_max, rand_from_seed(alt_seed));
        }
";

const CUSTOM_INIT: &str = "    float base_angle = tex_angle * mix(initial_angle_min, initial_angle_max, angle_rand);
    CUSTOM.x = base_angle * degree_to_rad;
    CUSTOM.y = 0.0;
    CUSTOM.w = 1.0 - lifetime_randomness * rand_from_seed(alt_seed);
    CUSTOM.z = tex_anim_offset * mix(anim_offset_min, anim_offset_max, anim_offset_rand);
";

const PLACE_POINT: &str =
    "        TRANSFORM = mat4(vec4(1, 0, 0, 0), vec4(0, 1, 0, 0), vec4(0, 0, 1, 0), vec4(0, 0, 0, 1));\n";

const PLACE_SPHERE: &str = "        float s = rand_from_seed(alt_seed) * 2.0 - 1.0;
        float t = rand_from_seed(alt_seed) * 2.0 * pi;
        float p = rand_from_seed(alt_seed);
        float radius = emission_sphere_radius * sqrt(1.0 - s * s);
        TRANSFORM[3].xyz = mix(vec3(0.0, 0.0, 0.0), vec3(radius * cos(t), radius * sin(t), emission_sphere_radius * s), p);
";

const PLACE_SPHERE_SURFACE: &str = "        float s = rand_from_seed(alt_seed) * 2.0 - 1.0;
        float t = rand_from_seed(alt_seed) * 2.0 * pi;
        float radius = emission_sphere_radius * sqrt(1.0 - s * s);
        TRANSFORM[3].xyz = vec3(radius * cos(t), radius * sin(t), emission_sphere_radius * s);
";

const PLACE_BOX: &str = "        TRANSFORM[3].xyz = vec3(rand_from_seed(alt_seed) * 2.0 - 1.0, rand_from_seed(alt_seed) * 2.0 - 1.0, rand_from_seed(alt_seed) * 2.0 - 1.0) * emission_box_extents;\n";

const PLACE_POINTS: &str =
    "        TRANSFORM[3].xyz = texelFetch(emission_texture_points, emission_tex_ofs, 0).xyz;\n";

const ORIENT_PLANAR: &str = "        {
            mat2 rotm;
            rotm[0] = texelFetch(emission_texture_normal, emission_tex_ofs, 0).xy;
            rotm[1] = rotm[0].yx * vec2(1.0, -1.0);
            if (RESTART_VELOCITY) VELOCITY.xy = rotm * VELOCITY.xy;
        }
";

const ORIENT_SPATIAL: &str = "        {
            vec3 normal = texelFetch(emission_texture_normal, emission_tex_ofs, 0).xyz;
            vec3 v0 = abs(normal.z) < 0.999 ? vec3(0.0, 0.0, 1.0) : vec3(0.0, 1.0, 0.0);
            vec3 tangent = normalize(cross(v0, normal));
            vec3 bitangent = normalize(cross(tangent, normal));
            if (RESTART_VELOCITY) VELOCITY = mat3(tangent, bitangent, normal) * VELOCITY;
        }
";

const PLACE_RING: &str = "        float ring_spawn_angle = rand_from_seed(alt_seed) * 2.0 * pi;
        float ring_random_radius = rand_from_seed(alt_seed) * (emission_ring_radius - emission_ring_inner_radius) + emission_ring_inner_radius;
        vec3 axis = normalize(emission_ring_axis);
        vec3 ortho_axis = vec3(0.0);
        if (axis == vec3(1.0, 0.0, 0.0)) {
            ortho_axis = cross(axis, vec3(0.0, 1.0, 0.0));
        } else {
            ortho_axis = cross(axis, vec3(1.0, 0.0, 0.0));
        }
        ortho_axis = normalize(ortho_axis);
        float s = sin(ring_spawn_angle);
        float c = cos(ring_spawn_angle);
        float oc = 1.0 - c;
        ortho_axis = mat3(
            vec3(c + axis.x * axis.x * oc, axis.x * axis.y * oc - axis.z * s, axis.x * axis.z * oc + axis.y * s),
            vec3(axis.x * axis.y * oc + s * axis.z, c + axis.y * axis.y * oc, axis.y * axis.z * oc - axis.x * s),
            vec3(axis.z * axis.x * oc - axis.y * s, axis.z * axis.y * oc + axis.x * s, c + axis.z * axis.z * oc)
        ) * ortho_axis;
        ortho_axis = normalize(ortho_axis);
        TRANSFORM[3].xyz = ortho_axis * ring_random_radius + (rand_from_seed(alt_seed) * emission_ring_height - emission_ring_height / 2.0) * axis;
";

/// Time-varying offset of the turbulence field; shared with `process()`.
pub(super) const TIME_NOISE: &str =
    "vec3 time_noise = noise_3d(vec3(TIME) * turbulence_noise_speed_random) * -turbulence_noise_speed;\n";

pub(super) fn emit(program: &mut ShaderProgram, f: &ShaderFeatures) {
    program.push(FragmentTag::StartSeed, format!("void start() {{\n{}", seed_block(f)));

    let mut curves = curve_sample(f, Parameter::Angle, "tex_angle", "0.0", "1.0", "    ");
    curves += &curve_sample(f, Parameter::AnimOffset, "tex_anim_offset", "0.0", "1.0", "    ");
    curves += "    float spread_rad = spread * degree_to_rad;\n";
    program.push(FragmentTag::StartCurves, curves);

    let mut velocity = String::from("    if (RESTART_VELOCITY) {\n");
    velocity += &curve_sample(
        f,
        Parameter::InitialLinearVelocity,
        "tex_linear_velocity",
        "0.0",
        "1.0",
        "        ",
    );
    velocity += if f.disable_z { VELOCITY_PLANAR } else { VELOCITY_SPATIAL };
    velocity += "    }\n";
    program.push(FragmentTag::StartVelocity, velocity);

    program.push(FragmentTag::StartCustom, CUSTOM_INIT);

    let mut position = String::from("    if (RESTART_POSITION) {\n");
    position += match f.emission_shape {
        EmissionShape::Point => PLACE_POINT,
        EmissionShape::Sphere => PLACE_SPHERE,
        EmissionShape::SphereSurface => PLACE_SPHERE_SURFACE,
        EmissionShape::Box => PLACE_BOX,
        EmissionShape::Points | EmissionShape::DirectedPoints => PLACE_POINTS,
        EmissionShape::Ring => PLACE_RING,
    };
    if f.emission_shape == EmissionShape::DirectedPoints {
        position += if f.disable_z { ORIENT_PLANAR } else { ORIENT_SPATIAL };
    }
    position += "        if (RESTART_VELOCITY) VELOCITY = (EMISSION_TRANSFORM * vec4(VELOCITY, 0.0)).xyz;\n";
    program.push(FragmentTag::StartPosition, position);

    if f.turbulence {
        program.push(
            FragmentTag::StartTurbulence,
            format!(
                "        {TIME_NOISE}        vec3 noise_direction = get_noise_direction(TRANSFORM[3].xyz, EMISSION_TRANSFORM[3].xyz, time_noise);
        float turb_init_displacement = mix(turbulence_initial_displacement_min, turbulence_initial_displacement_max, rand_from_seed(alt_seed));
        TRANSFORM[3].xyz += noise_direction * turb_init_displacement;
"
            ),
        );
    }

    let mut finish = String::from("        TRANSFORM = EMISSION_TRANSFORM * TRANSFORM;\n");
    if f.disable_z {
        finish += "        VELOCITY.z = 0.0;\n        TRANSFORM[3].z = 0.0;\n";
    }
    finish += "    }\n}\n\n";
    program.push(FragmentTag::StartFinish, finish);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_text(f: &ShaderFeatures) -> String {
        let mut program = ShaderProgram::default();
        emit(&mut program, f);
        program.into_text()
    }

    #[test]
    fn test_each_shape_places_differently() {
        let texts: Vec<_> = EmissionShape::ALL
            .into_iter()
            .map(|emission_shape| {
                start_text(&ShaderFeatures {
                    emission_shape,
                    ..ShaderFeatures::default()
                })
            })
            .collect();
        for (i, a) in texts.iter().enumerate() {
            for b in &texts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_point_shapes_pick_a_point() {
        let features = ShaderFeatures {
            emission_shape: EmissionShape::Points,
            ..ShaderFeatures::default()
        };
        assert!(seed_block(&features).contains("emission_tex_ofs"));
        assert!(!seed_block(&ShaderFeatures::default()).contains("emission_tex_ofs"));
    }

    #[test]
    fn test_ring_samples_angle_and_radius() {
        let text = start_text(&ShaderFeatures {
            emission_shape: EmissionShape::Ring,
            ..ShaderFeatures::default()
        });
        assert!(text.contains("float ring_spawn_angle = rand_from_seed(alt_seed) * 2.0 * pi;"));
        assert!(text.contains("vec3 axis = normalize(emission_ring_axis);"));
    }

    #[test]
    fn test_initial_turbulence_displacement() {
        let text = start_text(&ShaderFeatures {
            turbulence: true,
            ..ShaderFeatures::default()
        });
        assert!(text.contains("TRANSFORM[3].xyz += noise_direction * turb_init_displacement;"));
    }
}
