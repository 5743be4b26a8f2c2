//! Edit vocabulary for particle configurations.
//!
//! Edits are split by their effect on the generated program:
//! - [`StructuralProperty`] edits may change the shader text and are batched into a flush.
//! - [`UniformProperty`] edits only change shader inputs and go straight to the backend.

use ember_common::TextureId;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::params::{CollisionMode, EmissionShape, Parameter, ParticleFlag, SubEmitterMode};

/// Uniform names shared by the configuration and the code generator.
pub mod names {
    /// Emission direction.
    pub const DIRECTION: &str = "direction";
    /// Spread cone half-angle in degrees.
    pub const SPREAD: &str = "spread";
    /// Flattening of the spread cone.
    pub const FLATNESS: &str = "flatness";
    /// Base color.
    pub const COLOR: &str = "color_value";
    /// Color over lifetime.
    pub const COLOR_RAMP: &str = "color_ramp";
    /// Random start color.
    pub const COLOR_INITIAL_RAMP: &str = "color_initial_ramp";
    /// Sphere radius.
    pub const EMISSION_SPHERE_RADIUS: &str = "emission_sphere_radius";
    /// Box half extents.
    pub const EMISSION_BOX_EXTENTS: &str = "emission_box_extents";
    /// Point positions texture.
    pub const EMISSION_TEXTURE_POINTS: &str = "emission_texture_points";
    /// Point normals texture.
    pub const EMISSION_TEXTURE_NORMAL: &str = "emission_texture_normal";
    /// Point colors texture.
    pub const EMISSION_TEXTURE_COLOR: &str = "emission_texture_color";
    /// Number of valid points.
    pub const EMISSION_TEXTURE_POINT_COUNT: &str = "emission_texture_point_count";
    /// Ring axis.
    pub const EMISSION_RING_AXIS: &str = "emission_ring_axis";
    /// Ring extrusion height.
    pub const EMISSION_RING_HEIGHT: &str = "emission_ring_height";
    /// Ring outer radius.
    pub const EMISSION_RING_RADIUS: &str = "emission_ring_radius";
    /// Ring inner radius.
    pub const EMISSION_RING_INNER_RADIUS: &str = "emission_ring_inner_radius";
    /// Turbulence strength.
    pub const TURBULENCE_NOISE_STRENGTH: &str = "turbulence_noise_strength";
    /// Turbulence noise scale (remapped).
    pub const TURBULENCE_NOISE_SCALE: &str = "turbulence_noise_scale";
    /// Turbulence pan speed.
    pub const TURBULENCE_NOISE_SPEED: &str = "turbulence_noise_speed";
    /// Turbulence speed randomness.
    pub const TURBULENCE_NOISE_SPEED_RANDOM: &str = "turbulence_noise_speed_random";
    /// Constant acceleration.
    pub const GRAVITY: &str = "gravity";
    /// Lifetime randomness ratio.
    pub const LIFETIME_RANDOMNESS: &str = "lifetime_randomness";
    /// Seconds between constant sub-emissions.
    pub const SUB_EMITTER_FREQUENCY: &str = "sub_emitter_frequency";
    /// Particles emitted at end of life.
    pub const SUB_EMITTER_AMOUNT_AT_END: &str = "sub_emitter_amount_at_end";
    /// Inherit velocity into sub-particles.
    pub const SUB_EMITTER_KEEP_VELOCITY: &str = "sub_emitter_keep_velocity";
    /// Collision friction.
    pub const COLLISION_FRICTION: &str = "collision_friction";
    /// Collision bounce.
    pub const COLLISION_BOUNCE: &str = "collision_bounce";
}

/// Value written to a backend material parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `int`
    Int(i32),
    /// `bool`
    Bool(bool),
    /// `vec3`
    Vec3(Vec3),
    /// `vec4` color
    Color(Vec4),
    /// `sampler2D`; `None` unbinds
    Texture(Option<TextureId>),
}

/// One backend parameter write implied by an edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformUpdate {
    /// Uniform name in the generated program
    pub name: &'static str,
    /// Value to send
    pub value: UniformValue,
}

impl UniformUpdate {
    /// Creates a parameter write.
    #[must_use]
    pub const fn new(name: &'static str, value: UniformValue) -> Self {
        Self { name, value }
    }
}

/// Edit that can change the generated shader text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StructuralProperty {
    /// Emission shape
    EmissionShape(EmissionShape),
    /// Particle flag on/off
    ParticleFlag(ParticleFlag, bool),
    /// Sub-emitter trigger
    SubEmitterMode(SubEmitterMode),
    /// Collision response
    CollisionMode(CollisionMode),
    /// Scale collision shapes with the particle
    CollisionUseScale(bool),
    /// Turbulence on/off
    TurbulenceEnabled(bool),
    /// Receive attractor forces
    AttractorInteraction(bool),
    /// Lifetime curve for a parameter
    ParamTexture(Parameter, Option<TextureId>),
    /// Color over lifetime
    ColorRamp(Option<TextureId>),
    /// Random start color
    ColorInitialRamp(Option<TextureId>),
    /// Per-point colors for point emission
    EmissionColorTexture(Option<TextureId>),
}

/// Edit that only changes shader inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UniformProperty {
    /// Emission direction
    Direction(Vec3),
    /// Spread in degrees, `[0, 180]`
    Spread(f32),
    /// Spread flatness, `[0, 1]`
    Flatness(f32),
    /// Lower bound of a randomised parameter
    ParamMin(Parameter, f32),
    /// Upper bound of a randomised parameter
    ParamMax(Parameter, f32),
    /// Both bounds of a randomised parameter, applied together
    ParamRange(Parameter, f32, f32),
    /// Base color
    Color(Vec4),
    /// Sphere radius
    EmissionSphereRadius(f32),
    /// Box half extents
    EmissionBoxExtents(Vec3),
    /// Point positions texture
    EmissionPointTexture(Option<TextureId>),
    /// Point normals texture
    EmissionNormalTexture(Option<TextureId>),
    /// Number of valid points in the point texture
    EmissionPointCount(u32),
    /// Ring axis (non-zero)
    EmissionRingAxis(Vec3),
    /// Ring height
    EmissionRingHeight(f32),
    /// Ring outer radius
    EmissionRingRadius(f32),
    /// Ring inner radius
    EmissionRingInnerRadius(f32),
    /// Turbulence strength, `[0, 20]`
    TurbulenceNoiseStrength(f32),
    /// Turbulence noise scale, `[0, 10]`
    TurbulenceNoiseScale(f32),
    /// Turbulence pan speed
    TurbulenceNoiseSpeed(Vec3),
    /// Turbulence speed randomness, `[0, 4]`
    TurbulenceNoiseSpeedRandom(f32),
    /// Constant acceleration
    Gravity(Vec3),
    /// Lifetime randomness, `[0, 1]`
    LifetimeRandomness(f32),
    /// Constant sub-emission frequency in Hz, `[0.01, 100]`
    SubEmitterFrequency(f32),
    /// Burst size at end of life, `[1, 32]`
    SubEmitterAmountAtEnd(u32),
    /// Inherit velocity into sub-particles
    SubEmitterKeepVelocity(bool),
    /// Collision friction, `[0, 1]`
    CollisionFriction(f32),
    /// Collision bounce, `[0, 1]`
    CollisionBounce(f32),
}
