//! Header and uniform declarations.

use ember_common::SchemaVersion;

use super::{FragmentTag, ShaderProgram};
use crate::features::ShaderFeatures;
use crate::params::{CollisionMode, EmissionShape, Parameter, SubEmitterMode};
use crate::properties::names;

pub(super) fn emit(program: &mut ShaderProgram, f: &ShaderFeatures) {
    program.push(
        FragmentTag::Header,
        format!(
            "// Generated by Ember particle material (shader format {}).\n\nshader_type particles;\n",
            SchemaVersion::PARTICLE_SHADER
        ),
    );

    if f.collision_use_scale {
        program.push(FragmentTag::RenderMode, "render_mode collision_use_scale;\n");
    }

    program.push(FragmentTag::MotionUniforms, motion_uniforms());

    if let Some(text) = emission_uniforms(f) {
        program.push(FragmentTag::EmissionUniforms, text);
    }

    if let Some(text) = sub_emitter_uniforms(f.sub_emitter) {
        program.push(FragmentTag::SubEmitterUniforms, text);
    }

    let mut color = format!("uniform vec4 {} : source_color;\n", names::COLOR);
    if f.color_ramp {
        color.push_str(&sampler(names::COLOR_RAMP, "repeat_disable"));
    }
    if f.color_initial_ramp {
        color.push_str(&sampler(names::COLOR_INITIAL_RAMP, "repeat_disable"));
    }
    program.push(FragmentTag::ColorUniforms, color);

    if !f.curves.is_empty() {
        let curves: String = f
            .curves
            .iter()
            .filter_map(Parameter::texture_uniform)
            .map(|name| sampler(name, "repeat_disable"))
            .collect();
        program.push(FragmentTag::CurveUniforms, curves);
    }

    if f.collision == CollisionMode::Rigid {
        program.push(
            FragmentTag::CollisionUniforms,
            [
                float(names::COLLISION_FRICTION),
                float(names::COLLISION_BOUNCE),
            ]
            .concat(),
        );
    }

    if f.turbulence {
        program.push(FragmentTag::TurbulenceUniforms, turbulence_uniforms());
    }
}

fn float(name: &str) -> String {
    format!("uniform float {name};\n")
}

fn sampler(name: &str, hint: &str) -> String {
    format!("uniform sampler2D {name} : {hint};\n")
}

fn motion_uniforms() -> String {
    let mut text = String::new();
    text.push_str(&format!("uniform vec3 {};\n", names::DIRECTION));
    text.push_str(&float(names::SPREAD));
    text.push_str(&float(names::FLATNESS));

    let ranges: Vec<_> = Parameter::ALL
        .into_iter()
        .filter(|p| !p.is_turbulence())
        .filter_map(Parameter::range_uniforms)
        .collect();
    for (min, _) in &ranges {
        text.push_str(&float(min));
    }
    for (_, max) in &ranges {
        text.push_str(&float(max));
    }

    text.push_str(&float(names::LIFETIME_RANDOMNESS));
    text.push_str(&format!("uniform vec3 {};\n", names::GRAVITY));
    text
}

fn emission_uniforms(f: &ShaderFeatures) -> Option<String> {
    let text = match f.emission_shape {
        EmissionShape::Point => return None,
        EmissionShape::Sphere | EmissionShape::SphereSurface => {
            float(names::EMISSION_SPHERE_RADIUS)
        },
        EmissionShape::Box => format!("uniform vec3 {};\n", names::EMISSION_BOX_EXTENTS),
        EmissionShape::Points | EmissionShape::DirectedPoints => {
            let mut text = String::new();
            if f.emission_shape == EmissionShape::DirectedPoints {
                text.push_str(&sampler(names::EMISSION_TEXTURE_NORMAL, "hint_default_black"));
            }
            text.push_str(&sampler(names::EMISSION_TEXTURE_POINTS, "hint_default_black"));
            text.push_str(&format!("uniform int {};\n", names::EMISSION_TEXTURE_POINT_COUNT));
            if f.emission_color {
                text.push_str(&sampler(names::EMISSION_TEXTURE_COLOR, "hint_default_white"));
            }
            text
        },
        EmissionShape::Ring => [
            format!("uniform vec3 {};\n", names::EMISSION_RING_AXIS),
            float(names::EMISSION_RING_HEIGHT),
            float(names::EMISSION_RING_RADIUS),
            float(names::EMISSION_RING_INNER_RADIUS),
        ]
        .concat(),
    };
    Some(text)
}

fn sub_emitter_uniforms(mode: SubEmitterMode) -> Option<String> {
    let trigger = match mode {
        SubEmitterMode::Disabled => return None,
        SubEmitterMode::Constant => float(names::SUB_EMITTER_FREQUENCY),
        SubEmitterMode::AtEnd => format!("uniform int {};\n", names::SUB_EMITTER_AMOUNT_AT_END),
        SubEmitterMode::AtCollision => String::new(),
    };
    Some(trigger + &format!("uniform bool {};\n", names::SUB_EMITTER_KEEP_VELOCITY))
}

fn turbulence_uniforms() -> String {
    let mut text = String::new();
    text.push_str(&float(names::TURBULENCE_NOISE_STRENGTH));
    text.push_str(&float(names::TURBULENCE_NOISE_SCALE));
    for param in [Parameter::TurbVelInfluence, Parameter::TurbInitDisplacement] {
        if let Some((min, max)) = param.range_uniforms() {
            text.push_str(&float(min));
            text.push_str(&float(max));
        }
    }
    text.push_str(&float(names::TURBULENCE_NOISE_SPEED_RANDOM));
    text.push_str(&format!("uniform vec3 {};\n", names::TURBULENCE_NOISE_SPEED));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_uniforms_list_mins_then_maxes() {
        let text = motion_uniforms();
        let first_max = text.find("_max;").expect("max declared");
        let last_min = text.rfind("_min;").expect("min declared");
        assert!(last_min < first_max);
        assert!(!text.contains("turbulence"));
        assert_eq!(text.matches("_min;").count(), 12);
    }

    #[test]
    fn test_sub_emitter_uniforms_per_mode() {
        assert!(sub_emitter_uniforms(SubEmitterMode::Disabled).is_none());
        let at_end = sub_emitter_uniforms(SubEmitterMode::AtEnd).unwrap_or_default();
        assert!(at_end.contains("uniform int sub_emitter_amount_at_end;"));
        assert!(!at_end.contains("sub_emitter_frequency"));
        let at_collision = sub_emitter_uniforms(SubEmitterMode::AtCollision).unwrap_or_default();
        assert_eq!(at_collision, "uniform bool sub_emitter_keep_velocity;\n");
    }
}
