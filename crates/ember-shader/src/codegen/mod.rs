//! Particle shader code generation.
//!
//! A program is an ordered list of tagged fragments. Each fragment is selected purely
//! from a [`ShaderFeatures`] record, and [`FragmentTag`]'s declaration order is the
//! order fragments appear in the text. Disabled features contribute no fragment.

mod declarations;
mod helpers;
mod process;
mod start;

use tracing::trace;

use crate::config::ParticleConfig;
use crate::features::ShaderFeatures;
use crate::params::Parameter;

/// Position of a fragment in the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentTag {
    /// Version comment and `shader_type`
    Header,
    /// `render_mode` line
    RenderMode,
    /// Spawn direction, min/max pairs, lifetime randomness, gravity
    MotionUniforms,
    /// Per-shape emission inputs
    EmissionUniforms,
    /// Sub-emitter inputs
    SubEmitterUniforms,
    /// Base color and ramps
    ColorUniforms,
    /// Lifetime curve samplers
    CurveUniforms,
    /// Rigid collision inputs
    CollisionUniforms,
    /// Turbulence inputs
    TurbulenceUniforms,
    /// Curl noise helpers
    NoiseHelpers,
    /// Pseudo-random helpers
    RandomHelpers,
    /// `start()` prologue and per-particle seed
    StartSeed,
    /// Curve samples at birth
    StartCurves,
    /// Spread cone velocity
    StartVelocity,
    /// Angle, phase, lifetime and animation offset
    StartCustom,
    /// Placement by emission shape
    StartPosition,
    /// Initial turbulence displacement
    StartTurbulence,
    /// Emission transform and `start()` epilogue
    StartFinish,
    /// `process()` prologue and per-particle seed
    ProcessSeed,
    /// Curve samples at the current lifetime
    ProcessCurves,
    /// Gravity plus linear, radial and tangential acceleration
    ProcessForces,
    /// Attractor force injection
    ProcessAttractor,
    /// Velocity integration
    ProcessIntegrate,
    /// Velocity magnitude driven by a curve
    ProcessVelocityClamp,
    /// Turbulence blend
    ProcessTurbulence,
    /// Planar orbit rotation
    ProcessOrbit,
    /// Damping
    ProcessDamping,
    /// Angle and animation offset advance
    ProcessAnimation,
    /// Hue rotation matrix
    ProcessHueRotation,
    /// Color lookups
    ProcessColor,
    /// Orientation
    ProcessAlignment,
    /// Rigid bounce before scaling
    ProcessCollisionResponse,
    /// Scale with magnitude floor
    ProcessScale,
    /// Rigid settle or hide on contact
    ProcessCollisionContact,
    /// Sub-emission trigger
    ProcessSubEmitter,
    /// Lifetime expiry
    ProcessLifetime,
    /// `process()` epilogue
    ProcessEnd,
}

/// One block of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Position in the program
    pub tag: FragmentTag,
    /// Shader source
    pub text: String,
}

/// Ordered fragments making up one particle shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderProgram {
    fragments: Vec<Fragment>,
}

impl ShaderProgram {
    /// Appends a fragment. Fragments must be pushed in tag order.
    pub fn push(&mut self, tag: FragmentTag, text: impl Into<String>) {
        debug_assert!(
            self.fragments.last().map_or(true, |last| last.tag <= tag),
            "fragment {tag:?} pushed out of order"
        );
        self.fragments.push(Fragment {
            tag,
            text: text.into(),
        });
    }

    /// Fragments in program order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Tags in program order.
    pub fn tags(&self) -> impl Iterator<Item = FragmentTag> + '_ {
        self.fragments.iter().map(|f| f.tag)
    }

    /// Whether a fragment with `tag` was emitted.
    #[must_use]
    pub fn contains(&self, tag: FragmentTag) -> bool {
        self.fragments.iter().any(|f| f.tag == tag)
    }

    /// Concatenated source text.
    #[must_use]
    pub fn text(&self) -> String {
        let len = self.fragments.iter().map(|f| f.text.len()).sum();
        let mut text = String::with_capacity(len);
        for fragment in &self.fragments {
            text.push_str(&fragment.text);
        }
        text
    }

    /// Consumes the program into its source text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text()
    }
}

/// Builds the fragment list for a structural record.
#[must_use]
pub fn generate_program(features: &ShaderFeatures) -> ShaderProgram {
    let features = features.canonical();
    let mut program = ShaderProgram::default();

    declarations::emit(&mut program, &features);
    helpers::emit(&mut program, &features);
    start::emit(&mut program, &features);
    process::emit(&mut program, &features);

    trace!(
        fragments = program.fragments.len(),
        "generated particle shader program"
    );
    program
}

/// Generates the shader source for a configuration.
#[must_use]
pub fn generate_code(config: &ParticleConfig) -> String {
    generate_program(&ShaderFeatures::from_config(config)).into_text()
}

/// Samples a lifetime curve into `var`, or assigns `fallback` when the curve is absent.
fn curve_sample(
    features: &ShaderFeatures,
    param: Parameter,
    var: &str,
    coord: &str,
    fallback: &str,
    indent: &str,
) -> String {
    match param.texture_uniform().filter(|_| features.has_curve(param)) {
        Some(sampler) => format!(
            "{indent}float {var} = textureLod({sampler}, vec2({coord}, 0.0), 0.0).r;\n"
        ),
        None => format!("{indent}float {var} = {fallback};\n"),
    }
}
