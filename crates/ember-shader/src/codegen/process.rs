//! `process()`: runs every simulation step.

use super::start::{seed_block, TIME_NOISE};
use super::{curve_sample, FragmentTag, ShaderProgram};
use crate::features::ShaderFeatures;
use crate::params::{CollisionMode, Parameter, SubEmitterMode};

const FORCES_PLANAR_TANGENT: &str =
    "    force += length(diff.yx) > 0.0 ? vec3(normalize(diff.yx * vec2(-1.0, 1.0)), 0.0) * tangent_accel_val : vec3(0.0);\n";

const FORCES_SPATIAL_TANGENT: &str = "    vec3 crossDiff = cross(normalize(diff), normalize(gravity));
    force += length(crossDiff) > 0.0 ? normalize(crossDiff) * tangent_accel_val : vec3(0.0);
";

const ORBIT: &str = "    float orbit_amount = tex_orbit_velocity * mix(orbit_velocity_min, orbit_velocity_max, rand_from_seed(alt_seed));
    if (orbit_amount != 0.0) {
        float ang = orbit_amount * DELTA * pi * 2.0;
        mat2 rot = mat2(vec2(cos(ang), -sin(ang)), vec2(sin(ang), cos(ang)));
        TRANSFORM[3].xy -= diff.xy;
        TRANSFORM[3].xy += rot * diff.xy;
    }
";

const DAMPING: &str = "    float dmp = mix(damping_min, damping_max, rand_from_seed(alt_seed));
    if (dmp * tex_damping > 0.0) {
        float v = length(VELOCITY);
        float damp = tex_damping * dmp;
        v -= damp * DELTA;
        if (v < 0.0) {
            VELOCITY = vec3(0.0);
        } else {
            VELOCITY = normalize(VELOCITY) * v;
        }
    }
";

const ANIMATION: &str = "    float base_angle = tex_angle * mix(initial_angle_min, initial_angle_max, rand_from_seed(alt_seed));
    base_angle += CUSTOM.y * LIFETIME * tex_angular_velocity * mix(angular_velocity_min, angular_velocity_max, rand_from_seed(alt_seed));
    CUSTOM.x = base_angle * degree_to_rad;
    CUSTOM.z = tex_anim_offset * mix(anim_offset_min, anim_offset_max, rand_from_seed(alt_seed)) + tv * tex_anim_speed * mix(anim_speed_min, anim_speed_max, rand_from_seed(alt_seed));
";

/// Luma basis plus cosine- and sine-weighted rotation bases.
const HUE_ROTATION: &str = "    float hue_rot_angle = tex_hue_variation * pi * 2.0 * mix(hue_variation_min, hue_variation_max, rand_from_seed(alt_seed));
    float hue_rot_c = cos(hue_rot_angle);
    float hue_rot_s = sin(hue_rot_angle);
    mat4 hue_rot_mat = mat4(vec4(0.299, 0.587, 0.114, 0.0),
            vec4(0.299, 0.587, 0.114, 0.0),
            vec4(0.299, 0.587, 0.114, 0.0),
            vec4(0.000, 0.000, 0.000, 1.0)) +
        mat4(vec4(0.701, -0.587, -0.114, 0.0),
            vec4(-0.299, 0.413, -0.114, 0.0),
            vec4(-0.300, -0.588, 0.886, 0.0),
            vec4(0.000, 0.000, 0.000, 0.0)) * hue_rot_c +
        mat4(vec4(0.168, 0.330, -0.497, 0.0),
            vec4(-0.328, 0.035, 0.292, 0.0),
            vec4(1.250, -1.050, -0.203, 0.0),
            vec4(0.000, 0.000, 0.000, 0.0)) * hue_rot_s;
";

const ALIGN_PLANAR_VELOCITY: &str = "    if (length(VELOCITY) > 0.0) {
        TRANSFORM[1].xyz = normalize(VELOCITY);
    } else {
        TRANSFORM[1].xyz = normalize(TRANSFORM[1].xyz);
    }
    TRANSFORM[0].xyz = normalize(cross(TRANSFORM[1].xyz, TRANSFORM[2].xyz));
    TRANSFORM[2] = vec4(0.0, 0.0, 1.0, 0.0);
";

const ALIGN_PLANAR_ANGLE: &str = "    TRANSFORM[0] = vec4(cos(CUSTOM.x), -sin(CUSTOM.x), 0.0, 0.0);
    TRANSFORM[1] = vec4(sin(CUSTOM.x), cos(CUSTOM.x), 0.0, 0.0);
    TRANSFORM[2] = vec4(0.0, 0.0, 1.0, 0.0);
";

const ALIGN_SPATIAL_VELOCITY: &str = "    if (length(VELOCITY) > 0.0) {
        TRANSFORM[1].xyz = normalize(VELOCITY);
    } else {
        TRANSFORM[1].xyz = normalize(TRANSFORM[1].xyz);
    }
    if (TRANSFORM[1].xyz == normalize(TRANSFORM[0].xyz)) {
        TRANSFORM[0].xyz = normalize(cross(normalize(TRANSFORM[1].xyz), normalize(TRANSFORM[2].xyz)));
        TRANSFORM[2].xyz = normalize(cross(normalize(TRANSFORM[0].xyz), normalize(TRANSFORM[1].xyz)));
    } else {
        TRANSFORM[2].xyz = normalize(cross(normalize(TRANSFORM[0].xyz), normalize(TRANSFORM[1].xyz)));
        TRANSFORM[0].xyz = normalize(cross(normalize(TRANSFORM[1].xyz), normalize(TRANSFORM[2].xyz)));
    }
";

const ALIGN_SPATIAL_NORMALIZE: &str = "    TRANSFORM[0].xyz = normalize(TRANSFORM[0].xyz);
    TRANSFORM[1].xyz = normalize(TRANSFORM[1].xyz);
    TRANSFORM[2].xyz = normalize(TRANSFORM[2].xyz);
";

const ROTATE_Y: &str = "    vec4 origin = TRANSFORM[3];
    TRANSFORM = mat4(vec4(cos(CUSTOM.x), 0.0, -sin(CUSTOM.x), 0.0), vec4(0.0, 1.0, 0.0, 0.0), vec4(sin(CUSTOM.x), 0.0, cos(CUSTOM.x), 0.0), vec4(0.0, 0.0, 0.0, 1.0));
    TRANSFORM[3] = origin;
";

const SCALE: &str = "    float base_scale = mix(scale_min, scale_max, scale_rand);
    base_scale = sign(base_scale) * max(abs(base_scale), 0.001);
    TRANSFORM[0].xyz *= base_scale * sign(tex_scale.r) * max(abs(tex_scale.r), 0.001);
    TRANSFORM[1].xyz *= base_scale * sign(tex_scale.g) * max(abs(tex_scale.g), 0.001);
    TRANSFORM[2].xyz *= base_scale * sign(tex_scale.b) * max(abs(tex_scale.b), 0.001);
";

const RIGID_SETTLE: &str = "    if (COLLIDED) {
        TRANSFORM[3].xyz += COLLISION_NORMAL * COLLISION_DEPTH;
        VELOCITY -= COLLISION_NORMAL * dot(COLLISION_NORMAL, VELOCITY) * (1.0 + collision_bounce);
        VELOCITY = mix(VELOCITY, vec3(0.0), collision_friction * DELTA * 100.0);
    }
";

const HIDE_ON_CONTACT: &str = "    if (COLLIDED) {
        ACTIVE = false;
    }
";

const SUB_EMIT_LOOP: &str = "    for (int i = 0; i < emit_count; i++) {
        uint flags = FLAG_EMIT_POSITION | FLAG_EMIT_ROT_SCALE;
        if (sub_emitter_keep_velocity) flags |= FLAG_EMIT_VELOCITY;
        emit_subparticle(TRANSFORM, VELOCITY, vec4(0.0), vec4(0.0), flags);
    }
";

pub(super) fn emit(program: &mut ShaderProgram, f: &ShaderFeatures) {
    program.push(
        FragmentTag::ProcessSeed,
        format!(
            "void process() {{\n{}    CUSTOM.y += DELTA / LIFETIME;\n    float tv = CUSTOM.y / CUSTOM.w;\n",
            seed_block(f)
        ),
    );
    program.push(FragmentTag::ProcessCurves, curves(f));
    program.push(FragmentTag::ProcessForces, forces(f));

    if f.attractor {
        program.push(FragmentTag::ProcessAttractor, "    force += ATTRACTOR_FORCE;\n");
    }

    program.push(FragmentTag::ProcessIntegrate, "    VELOCITY += force * DELTA;\n");

    if f.has_curve(Parameter::InitialLinearVelocity) {
        program.push(
            FragmentTag::ProcessVelocityClamp,
            "    if (length(VELOCITY) > 0.0) {\n        VELOCITY = normalize(VELOCITY) * tex_linear_velocity;\n    }\n",
        );
    }

    if f.turbulence {
        program.push(FragmentTag::ProcessTurbulence, turbulence(f));
    }

    if f.disable_z {
        program.push(FragmentTag::ProcessOrbit, ORBIT);
    }

    program.push(FragmentTag::ProcessDamping, DAMPING);
    program.push(FragmentTag::ProcessAnimation, ANIMATION);
    program.push(FragmentTag::ProcessHueRotation, HUE_ROTATION);
    program.push(FragmentTag::ProcessColor, color(f));
    program.push(FragmentTag::ProcessAlignment, alignment(f));

    if f.collision == CollisionMode::Rigid {
        program.push(FragmentTag::ProcessCollisionResponse, rigid_response(f));
    }

    program.push(FragmentTag::ProcessScale, SCALE);

    match f.collision {
        CollisionMode::Disabled => {},
        CollisionMode::Rigid => program.push(FragmentTag::ProcessCollisionContact, RIGID_SETTLE),
        CollisionMode::HideOnContact => {
            program.push(FragmentTag::ProcessCollisionContact, HIDE_ON_CONTACT);
        },
    }

    if let Some(text) = sub_emitter(f.sub_emitter) {
        program.push(FragmentTag::ProcessSubEmitter, text);
    }

    program.push(
        FragmentTag::ProcessLifetime,
        "    if (CUSTOM.y > CUSTOM.w) {\n        ACTIVE = false;\n    }\n",
    );
    program.push(FragmentTag::ProcessEnd, "}\n");
}

fn curves(f: &ShaderFeatures) -> String {
    let sample = |param: Parameter, var: &str| curve_sample(f, param, var, "tv", "1.0", "    ");

    let mut text = sample(Parameter::InitialLinearVelocity, "tex_linear_velocity");
    if f.disable_z {
        text += &sample(Parameter::OrbitVelocity, "tex_orbit_velocity");
    }
    for (param, var) in [
        (Parameter::AngularVelocity, "tex_angular_velocity"),
        (Parameter::LinearAccel, "tex_linear_accel"),
        (Parameter::RadialAccel, "tex_radial_accel"),
        (Parameter::TangentialAccel, "tex_tangent_accel"),
        (Parameter::Damping, "tex_damping"),
        (Parameter::Angle, "tex_angle"),
        (Parameter::AnimSpeed, "tex_anim_speed"),
        (Parameter::AnimOffset, "tex_anim_offset"),
        (Parameter::HueVariation, "tex_hue_variation"),
    ] {
        text += &sample(param, var);
    }

    if f.has_curve(Parameter::Scale) {
        text += "    vec3 tex_scale = textureLod(scale_texture, vec2(tv, 0.0), 0.0).rgb;\n";
    } else {
        text += "    vec3 tex_scale = vec3(1.0);\n";
    }
    text
}

fn forces(f: &ShaderFeatures) -> String {
    let mut text = String::from("    vec3 force = gravity;\n    vec3 pos = TRANSFORM[3].xyz;\n");
    if f.disable_z {
        text += "    pos.z = 0.0;\n";
    }
    text += "    // linear acceleration
    force += length(VELOCITY) > 0.0 ? normalize(VELOCITY) * tex_linear_accel * mix(linear_accel_min, linear_accel_max, rand_from_seed(alt_seed)) : vec3(0.0);
    // radial acceleration
    vec3 org = EMISSION_TRANSFORM[3].xyz;
    vec3 diff = pos - org;
    force += length(diff) > 0.0 ? normalize(diff) * tex_radial_accel * mix(radial_accel_min, radial_accel_max, rand_from_seed(alt_seed)) : vec3(0.0);
    // tangential acceleration
    float tangent_accel_val = tex_tangent_accel * mix(tangent_accel_min, tangent_accel_max, rand_from_seed(alt_seed));
";
    text += if f.disable_z {
        FORCES_PLANAR_TANGENT
    } else {
        FORCES_SPATIAL_TANGENT
    };
    text
}

fn turbulence(f: &ShaderFeatures) -> String {
    let mut text = String::from("    // turbulence\n");
    text += &curve_sample(
        f,
        Parameter::TurbInfluenceOverLife,
        "turbulence_influence",
        "tv",
        "1.0",
        "    ",
    );
    text += "    ";
    text += TIME_NOISE;
    text += "    vec3 noise_direction = get_noise_direction(TRANSFORM[3].xyz, EMISSION_TRANSFORM[3].xyz, time_noise);\n";

    // Once a rigid collision has happened the particle rests on the collider.
    let guarded = f.collision == CollisionMode::Rigid;
    let indent = if guarded { "        " } else { "    " };
    if guarded {
        text += "    if (!COLLIDED) {\n";
    }
    for line in [
        "float vel_mag = length(VELOCITY);\n",
        "float vel_infl = clamp(mix(turbulence_influence_min, turbulence_influence_max, rand_from_seed(alt_seed)) * turbulence_influence, 0.0, 1.0);\n",
        "VELOCITY = mix(VELOCITY, normalize(noise_direction) * vel_mag * (1.0 + (1.0 - vel_infl) * 0.2), vel_infl);\n",
    ] {
        text += indent;
        text += line;
    }
    if guarded {
        text += "    }\n";
    }
    text
}

fn color(f: &ShaderFeatures) -> String {
    let mut text = if f.color_ramp {
        String::from("    COLOR = hue_rot_mat * textureLod(color_ramp, vec2(tv, 0.0), 0.0) * color_value;\n")
    } else {
        String::from("    COLOR = hue_rot_mat * color_value;\n")
    };
    if f.color_initial_ramp {
        text += "    vec4 start_color = textureLod(color_initial_ramp, vec2(color_initial_rand, 0.0), 0.0);\n    COLOR *= start_color;\n";
    }
    if f.emission_color {
        text += "    COLOR *= texelFetch(emission_texture_color, emission_tex_ofs, 0);\n";
    }
    text
}

fn alignment(f: &ShaderFeatures) -> String {
    let mut text = String::new();
    if f.disable_z {
        text += if f.align_y {
            ALIGN_PLANAR_VELOCITY
        } else {
            ALIGN_PLANAR_ANGLE
        };
        text += "    TRANSFORM[3].z = 0.0;\n";
    } else {
        text += if f.align_y {
            ALIGN_SPATIAL_VELOCITY
        } else {
            ALIGN_SPATIAL_NORMALIZE
        };
        if f.rotate_y {
            text += ROTATE_Y;
        }
    }
    text
}

fn rigid_response(f: &ShaderFeatures) -> String {
    let mut text = String::from(
        "    if (COLLIDED) {
        if (length(VELOCITY) > 3.0) {
            TRANSFORM[3].xyz += COLLISION_NORMAL * COLLISION_DEPTH;
            VELOCITY -= COLLISION_NORMAL * dot(COLLISION_NORMAL, VELOCITY) * (1.0 + collision_bounce);
            VELOCITY = mix(VELOCITY, vec3(0.0), clamp(collision_friction, 0.0, 1.0));
        } else {
            VELOCITY = vec3(0.0);
",
    );
    if f.turbulence {
        text += "            noise_direction = vec3(1.0, 0.0, 0.0);\n";
    }
    text += "        }\n    }\n";
    text
}

fn sub_emitter(mode: SubEmitterMode) -> Option<String> {
    let trigger = match mode {
        SubEmitterMode::Disabled => return None,
        SubEmitterMode::Constant => {
            "    float interval_from = CUSTOM.y * LIFETIME - DELTA;
    float interval_rem = sub_emitter_frequency - mod(interval_from, sub_emitter_frequency);
    if (DELTA >= interval_rem) emit_count = 1;
"
        },
        SubEmitterMode::AtCollision => "    if (COLLIDED) emit_count = 1;\n",
        // Trigger slightly early; the emitter may deactivate the particle on its last step.
        SubEmitterMode::AtEnd => {
            "    float unit_delta = DELTA / LIFETIME;
    float end_time = CUSTOM.w * 0.95;
    if (CUSTOM.y < end_time && (CUSTOM.y + unit_delta) >= end_time) emit_count = sub_emitter_amount_at_end;
"
        },
    };
    Some(format!("    int emit_count = 0;\n{trigger}{SUB_EMIT_LOOP}"))
}
