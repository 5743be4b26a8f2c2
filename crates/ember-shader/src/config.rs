//! Particle behavior configuration.
//!
//! [`ParticleConfig`] holds both structural fields (which select shader fragments) and
//! uniform fields (which are only shader inputs). Edits go through
//! [`ParticleConfig::apply_structural`] and [`ParticleConfig::apply_uniform`], which
//! validate before mutating so a rejected edit leaves the configuration untouched.

use std::ops::{Index, IndexMut};

use ember_common::{ConfigurationError, TextureId};
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::params::{CollisionMode, EmissionShape, Parameter, ParticleFlag, SubEmitterMode};
use crate::properties::{names, StructuralProperty, UniformProperty, UniformUpdate, UniformValue};

/// Gravity sent instead of an exact zero; the shader derives an up vector from it.
const ZERO_GRAVITY_SUBSTITUTE: Vec3 = Vec3::new(0.0, -0.000_001, 0.0);

/// Fixed-size table indexed by [`Parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamTable<T>([T; Parameter::COUNT]);

impl<T: Copy> ParamTable<T> {
    /// Creates a table with every entry set to `value`.
    #[must_use]
    pub const fn filled(value: T) -> Self {
        Self([value; Parameter::COUNT])
    }

    /// Iterates entries in parameter order.
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, T)> + '_ {
        Parameter::ALL.iter().map(move |p| (*p, self.0[p.index()]))
    }
}

impl<T> Index<Parameter> for ParamTable<T> {
    type Output = T;

    fn index(&self, param: Parameter) -> &T {
        &self.0[param.index()]
    }
}

impl<T> IndexMut<Parameter> for ParamTable<T> {
    fn index_mut(&mut self, param: Parameter) -> &mut T {
        &mut self.0[param.index()]
    }
}

/// Complete particle behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    // === Spawn direction ===
    /// Emission direction
    pub direction: Vec3,
    /// Spread cone half-angle in degrees
    pub spread: f32,
    /// Flattening of the spread cone towards the XY plane
    pub flatness: f32,

    // === Randomised parameters ===
    /// Lower bounds
    pub param_min: ParamTable<f32>,
    /// Upper bounds
    pub param_max: ParamTable<f32>,
    /// Lifetime curves
    pub param_texture: ParamTable<Option<TextureId>>,

    // === Color ===
    /// Base color
    pub color: Vec4,
    /// Color over lifetime
    pub color_ramp: Option<TextureId>,
    /// Random start color
    pub color_initial_ramp: Option<TextureId>,

    // === Emission ===
    /// Emission shape
    pub emission_shape: EmissionShape,
    /// Sphere radius
    pub emission_sphere_radius: f32,
    /// Box half extents
    pub emission_box_extents: Vec3,
    /// Point positions
    pub emission_point_texture: Option<TextureId>,
    /// Point normals
    pub emission_normal_texture: Option<TextureId>,
    /// Point colors
    pub emission_color_texture: Option<TextureId>,
    /// Number of valid points
    pub emission_point_count: u32,
    /// Ring axis
    pub emission_ring_axis: Vec3,
    /// Ring height
    pub emission_ring_height: f32,
    /// Ring outer radius
    pub emission_ring_radius: f32,
    /// Ring inner radius
    pub emission_ring_inner_radius: f32,

    // === Orientation ===
    /// Particle flags indexed by [`ParticleFlag`]
    pub particle_flags: [bool; ParticleFlag::COUNT],

    // === Turbulence ===
    /// Turbulence on/off
    pub turbulence_enabled: bool,
    /// Noise strength
    pub turbulence_noise_strength: f32,
    /// Noise scale before remapping
    pub turbulence_noise_scale: f32,
    /// Noise pan speed
    pub turbulence_noise_speed: Vec3,
    /// Noise speed randomness
    pub turbulence_noise_speed_random: f32,

    // === Forces and lifetime ===
    /// Constant acceleration
    pub gravity: Vec3,
    /// Lifetime randomness ratio
    pub lifetime_randomness: f32,
    /// Receive attractor forces
    pub attractor_interaction_enabled: bool,

    // === Sub-emitter ===
    /// Trigger mode
    pub sub_emitter_mode: SubEmitterMode,
    /// Emissions per second in constant mode
    pub sub_emitter_frequency: f32,
    /// Burst size in at-end mode
    pub sub_emitter_amount_at_end: u32,
    /// Inherit velocity
    pub sub_emitter_keep_velocity: bool,

    // === Collision ===
    /// Response mode
    pub collision_mode: CollisionMode,
    /// Friction in rigid mode
    pub collision_friction: f32,
    /// Bounce in rigid mode
    pub collision_bounce: f32,
    /// Scale collision with particle scale
    pub collision_use_scale: bool,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        let mut param_min = ParamTable::filled(0.0);
        let mut param_max = ParamTable::filled(0.0);
        param_min[Parameter::Scale] = 1.0;
        param_max[Parameter::Scale] = 1.0;
        param_min[Parameter::TurbVelInfluence] = 0.1;
        param_max[Parameter::TurbVelInfluence] = 0.1;

        Self {
            direction: Vec3::X,
            spread: 45.0,
            flatness: 0.0,

            param_min,
            param_max,
            param_texture: ParamTable::filled(None),

            color: Vec4::ONE,
            color_ramp: None,
            color_initial_ramp: None,

            emission_shape: EmissionShape::Point,
            emission_sphere_radius: 1.0,
            emission_box_extents: Vec3::ONE,
            emission_point_texture: None,
            emission_normal_texture: None,
            emission_color_texture: None,
            emission_point_count: 0,
            emission_ring_axis: Vec3::Z,
            emission_ring_height: 1.0,
            emission_ring_radius: 1.0,
            emission_ring_inner_radius: 0.0,

            particle_flags: [false; ParticleFlag::COUNT],

            turbulence_enabled: false,
            turbulence_noise_strength: 1.0,
            turbulence_noise_scale: 9.0,
            turbulence_noise_speed: Vec3::splat(0.5),
            turbulence_noise_speed_random: 0.0,

            gravity: Vec3::new(0.0, -9.8, 0.0),
            lifetime_randomness: 0.0,
            attractor_interaction_enabled: true,

            sub_emitter_mode: SubEmitterMode::Disabled,
            sub_emitter_frequency: 4.0,
            sub_emitter_amount_at_end: 1,
            sub_emitter_keep_velocity: false,

            collision_mode: CollisionMode::Disabled,
            collision_friction: 0.0,
            collision_bounce: 0.0,
            collision_use_scale: false,
        }
    }
}

impl ParticleConfig {
    /// Returns a particle flag.
    #[must_use]
    pub const fn flag(&self, flag: ParticleFlag) -> bool {
        self.particle_flags[flag.index()]
    }

    /// Applies a structural edit.
    ///
    /// Returns the texture bindings the edit implies; the caller is responsible for
    /// scheduling a rebuild.
    pub fn apply_structural(
        &mut self,
        property: StructuralProperty,
    ) -> Result<Vec<UniformUpdate>, ConfigurationError> {
        let updates = match property {
            StructuralProperty::EmissionShape(shape) => {
                self.emission_shape = shape;
                Vec::new()
            },
            StructuralProperty::ParticleFlag(flag, enabled) => {
                self.particle_flags[flag.index()] = enabled;
                Vec::new()
            },
            StructuralProperty::SubEmitterMode(mode) => {
                self.sub_emitter_mode = mode;
                Vec::new()
            },
            StructuralProperty::CollisionMode(mode) => {
                self.collision_mode = mode;
                Vec::new()
            },
            StructuralProperty::CollisionUseScale(enabled) => {
                self.collision_use_scale = enabled;
                Vec::new()
            },
            StructuralProperty::TurbulenceEnabled(enabled) => {
                self.turbulence_enabled = enabled;
                Vec::new()
            },
            StructuralProperty::AttractorInteraction(enabled) => {
                self.attractor_interaction_enabled = enabled;
                Vec::new()
            },
            StructuralProperty::ParamTexture(param, texture) => {
                let name = param.texture_uniform().ok_or(
                    ConfigurationError::UnsupportedParameter {
                        parameter: param.name(),
                        operation: "curve",
                    },
                )?;
                self.param_texture[param] = texture;
                vec![UniformUpdate::new(name, UniformValue::Texture(texture))]
            },
            StructuralProperty::ColorRamp(texture) => {
                self.color_ramp = texture;
                vec![UniformUpdate::new(names::COLOR_RAMP, UniformValue::Texture(texture))]
            },
            StructuralProperty::ColorInitialRamp(texture) => {
                self.color_initial_ramp = texture;
                vec![UniformUpdate::new(
                    names::COLOR_INITIAL_RAMP,
                    UniformValue::Texture(texture),
                )]
            },
            StructuralProperty::EmissionColorTexture(texture) => {
                self.emission_color_texture = texture;
                vec![UniformUpdate::new(
                    names::EMISSION_TEXTURE_COLOR,
                    UniformValue::Texture(texture),
                )]
            },
        };
        Ok(updates)
    }

    /// Applies a uniform edit and returns the backend parameter writes it implies.
    pub fn apply_uniform(
        &mut self,
        property: UniformProperty,
    ) -> Result<Vec<UniformUpdate>, ConfigurationError> {
        use UniformValue::{Bool, Float, Int, Texture};

        let update = match property {
            UniformProperty::Direction(direction) => {
                self.direction = finite_vec3(names::DIRECTION, direction)?;
                UniformUpdate::new(names::DIRECTION, UniformValue::Vec3(direction))
            },
            UniformProperty::Spread(spread) => {
                self.spread = in_range(names::SPREAD, spread, 0.0, 180.0)?;
                UniformUpdate::new(names::SPREAD, Float(spread))
            },
            UniformProperty::Flatness(flatness) => {
                self.flatness = in_range(names::FLATNESS, flatness, 0.0, 1.0)?;
                UniformUpdate::new(names::FLATNESS, Float(flatness))
            },
            UniformProperty::ParamMin(param, value) => return self.set_param_bound(param, value, true),
            UniformProperty::ParamMax(param, value) => return self.set_param_bound(param, value, false),
            UniformProperty::ParamRange(param, min, max) => {
                let (min_name, max_name) = checked_range(param, min, max)?;
                self.param_min[param] = min;
                self.param_max[param] = max;
                return Ok(vec![
                    UniformUpdate::new(min_name, Float(min)),
                    UniformUpdate::new(max_name, Float(max)),
                ]);
            },
            UniformProperty::Color(color) => {
                if !color.is_finite() {
                    return Err(ConfigurationError::NonFinite {
                        property: names::COLOR,
                    });
                }
                self.color = color;
                UniformUpdate::new(names::COLOR, UniformValue::Color(color))
            },
            UniformProperty::EmissionSphereRadius(radius) => {
                self.emission_sphere_radius =
                    non_negative(names::EMISSION_SPHERE_RADIUS, radius)?;
                UniformUpdate::new(names::EMISSION_SPHERE_RADIUS, Float(radius))
            },
            UniformProperty::EmissionBoxExtents(extents) => {
                self.emission_box_extents = finite_vec3(names::EMISSION_BOX_EXTENTS, extents)?;
                UniformUpdate::new(names::EMISSION_BOX_EXTENTS, UniformValue::Vec3(extents))
            },
            UniformProperty::EmissionPointTexture(texture) => {
                self.emission_point_texture = texture;
                UniformUpdate::new(names::EMISSION_TEXTURE_POINTS, Texture(texture))
            },
            UniformProperty::EmissionNormalTexture(texture) => {
                self.emission_normal_texture = texture;
                UniformUpdate::new(names::EMISSION_TEXTURE_NORMAL, Texture(texture))
            },
            UniformProperty::EmissionPointCount(count) => {
                let sent = point_count_uniform(count)?;
                self.emission_point_count = count;
                UniformUpdate::new(names::EMISSION_TEXTURE_POINT_COUNT, Int(sent))
            },
            UniformProperty::EmissionRingAxis(axis) => {
                self.emission_ring_axis = ring_axis(axis)?;
                UniformUpdate::new(names::EMISSION_RING_AXIS, UniformValue::Vec3(axis))
            },
            UniformProperty::EmissionRingHeight(height) => {
                self.emission_ring_height = non_negative(names::EMISSION_RING_HEIGHT, height)?;
                UniformUpdate::new(names::EMISSION_RING_HEIGHT, Float(height))
            },
            UniformProperty::EmissionRingRadius(radius) => {
                self.emission_ring_radius = non_negative(names::EMISSION_RING_RADIUS, radius)?;
                UniformUpdate::new(names::EMISSION_RING_RADIUS, Float(radius))
            },
            UniformProperty::EmissionRingInnerRadius(radius) => {
                self.emission_ring_inner_radius =
                    non_negative(names::EMISSION_RING_INNER_RADIUS, radius)?;
                UniformUpdate::new(names::EMISSION_RING_INNER_RADIUS, Float(radius))
            },
            UniformProperty::TurbulenceNoiseStrength(strength) => {
                self.turbulence_noise_strength =
                    in_range(names::TURBULENCE_NOISE_STRENGTH, strength, 0.0, 20.0)?;
                UniformUpdate::new(names::TURBULENCE_NOISE_STRENGTH, Float(strength))
            },
            UniformProperty::TurbulenceNoiseScale(scale) => {
                self.turbulence_noise_scale =
                    in_range(names::TURBULENCE_NOISE_SCALE, scale, 0.0, 10.0)?;
                UniformUpdate::new(
                    names::TURBULENCE_NOISE_SCALE,
                    Float(remap_noise_scale(scale)),
                )
            },
            UniformProperty::TurbulenceNoiseSpeed(speed) => {
                self.turbulence_noise_speed = finite_vec3(names::TURBULENCE_NOISE_SPEED, speed)?;
                UniformUpdate::new(names::TURBULENCE_NOISE_SPEED, UniformValue::Vec3(speed))
            },
            UniformProperty::TurbulenceNoiseSpeedRandom(random) => {
                self.turbulence_noise_speed_random =
                    in_range(names::TURBULENCE_NOISE_SPEED_RANDOM, random, 0.0, 4.0)?;
                UniformUpdate::new(names::TURBULENCE_NOISE_SPEED_RANDOM, Float(random))
            },
            UniformProperty::Gravity(gravity) => {
                self.gravity = finite_vec3(names::GRAVITY, gravity)?;
                UniformUpdate::new(names::GRAVITY, UniformValue::Vec3(gravity_uniform(gravity)))
            },
            UniformProperty::LifetimeRandomness(randomness) => {
                self.lifetime_randomness =
                    in_range(names::LIFETIME_RANDOMNESS, randomness, 0.0, 1.0)?;
                UniformUpdate::new(names::LIFETIME_RANDOMNESS, Float(randomness))
            },
            UniformProperty::SubEmitterFrequency(frequency) => {
                self.sub_emitter_frequency =
                    in_range(names::SUB_EMITTER_FREQUENCY, frequency, 0.01, 100.0)?;
                UniformUpdate::new(names::SUB_EMITTER_FREQUENCY, Float(1.0 / frequency))
            },
            UniformProperty::SubEmitterAmountAtEnd(amount) => {
                let sent = amount_at_end_uniform(amount)?;
                self.sub_emitter_amount_at_end = amount;
                UniformUpdate::new(names::SUB_EMITTER_AMOUNT_AT_END, Int(sent))
            },
            UniformProperty::SubEmitterKeepVelocity(keep) => {
                self.sub_emitter_keep_velocity = keep;
                UniformUpdate::new(names::SUB_EMITTER_KEEP_VELOCITY, Bool(keep))
            },
            UniformProperty::CollisionFriction(friction) => {
                self.collision_friction =
                    in_range(names::COLLISION_FRICTION, friction, 0.0, 1.0)?;
                UniformUpdate::new(names::COLLISION_FRICTION, Float(friction))
            },
            UniformProperty::CollisionBounce(bounce) => {
                self.collision_bounce = in_range(names::COLLISION_BOUNCE, bounce, 0.0, 1.0)?;
                UniformUpdate::new(names::COLLISION_BOUNCE, Float(bounce))
            },
        };
        Ok(vec![update])
    }

    /// Sets one bound of a randomised parameter, dragging the other bound along when
    /// the range would invert.
    fn set_param_bound(
        &mut self,
        param: Parameter,
        value: f32,
        is_min: bool,
    ) -> Result<Vec<UniformUpdate>, ConfigurationError> {
        let (min_name, max_name) = range_uniforms(param)?;
        if !value.is_finite() {
            return Err(ConfigurationError::NonFinite {
                property: if is_min { min_name } else { max_name },
            });
        }

        let mut updates = Vec::with_capacity(2);
        if is_min {
            self.param_min[param] = value;
            updates.push(UniformUpdate::new(min_name, UniformValue::Float(value)));
            if value > self.param_max[param] {
                self.param_max[param] = value;
                updates.push(UniformUpdate::new(max_name, UniformValue::Float(value)));
            }
        } else {
            self.param_max[param] = value;
            updates.push(UniformUpdate::new(max_name, UniformValue::Float(value)));
            if self.param_min[param] > value {
                self.param_min[param] = value;
                updates.push(UniformUpdate::new(min_name, UniformValue::Float(value)));
            }
        }
        Ok(updates)
    }

    /// Checks every field against the rules the setters enforce.
    ///
    /// Range bounds are not dragged here: an inverted range is rejected.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        finite_vec3(names::DIRECTION, self.direction)?;
        in_range(names::SPREAD, self.spread, 0.0, 180.0)?;
        in_range(names::FLATNESS, self.flatness, 0.0, 1.0)?;

        for param in Parameter::ALL {
            if param.range_uniforms().is_some() {
                checked_range(param, self.param_min[param], self.param_max[param])?;
            }
            if self.param_texture[param].is_some() && param.texture_uniform().is_none() {
                return Err(ConfigurationError::UnsupportedParameter {
                    parameter: param.name(),
                    operation: "curve",
                });
            }
        }

        if !self.color.is_finite() {
            return Err(ConfigurationError::NonFinite {
                property: names::COLOR,
            });
        }
        non_negative(names::EMISSION_SPHERE_RADIUS, self.emission_sphere_radius)?;
        finite_vec3(names::EMISSION_BOX_EXTENTS, self.emission_box_extents)?;
        point_count_uniform(self.emission_point_count)?;
        ring_axis(self.emission_ring_axis)?;
        non_negative(names::EMISSION_RING_HEIGHT, self.emission_ring_height)?;
        non_negative(names::EMISSION_RING_RADIUS, self.emission_ring_radius)?;
        non_negative(names::EMISSION_RING_INNER_RADIUS, self.emission_ring_inner_radius)?;

        in_range(names::TURBULENCE_NOISE_STRENGTH, self.turbulence_noise_strength, 0.0, 20.0)?;
        in_range(names::TURBULENCE_NOISE_SCALE, self.turbulence_noise_scale, 0.0, 10.0)?;
        finite_vec3(names::TURBULENCE_NOISE_SPEED, self.turbulence_noise_speed)?;
        in_range(
            names::TURBULENCE_NOISE_SPEED_RANDOM,
            self.turbulence_noise_speed_random,
            0.0,
            4.0,
        )?;

        finite_vec3(names::GRAVITY, self.gravity)?;
        in_range(names::LIFETIME_RANDOMNESS, self.lifetime_randomness, 0.0, 1.0)?;
        in_range(names::SUB_EMITTER_FREQUENCY, self.sub_emitter_frequency, 0.01, 100.0)?;
        amount_at_end_uniform(self.sub_emitter_amount_at_end)?;
        in_range(names::COLLISION_FRICTION, self.collision_friction, 0.0, 1.0)?;
        in_range(names::COLLISION_BOUNCE, self.collision_bounce, 0.0, 1.0)?;
        Ok(())
    }

    /// Every parameter write needed to initialise a fresh backend material slot.
    ///
    /// Expects a configuration that passed [`ParticleConfig::validate`].
    #[must_use]
    pub fn uniform_snapshot(&self) -> Vec<UniformUpdate> {
        use UniformValue::{Bool, Color, Float, Int, Texture, Vec3 as V3};

        let mut updates = vec![
            UniformUpdate::new(names::DIRECTION, V3(self.direction)),
            UniformUpdate::new(names::SPREAD, Float(self.spread)),
            UniformUpdate::new(names::FLATNESS, Float(self.flatness)),
        ];

        for param in Parameter::ALL {
            if let Some((min_name, max_name)) = param.range_uniforms() {
                updates.push(UniformUpdate::new(min_name, Float(self.param_min[param])));
                updates.push(UniformUpdate::new(max_name, Float(self.param_max[param])));
            }
            if let Some(texture_name) = param.texture_uniform() {
                updates.push(UniformUpdate::new(
                    texture_name,
                    Texture(self.param_texture[param]),
                ));
            }
        }

        updates.extend([
            UniformUpdate::new(names::COLOR, Color(self.color)),
            UniformUpdate::new(names::COLOR_RAMP, Texture(self.color_ramp)),
            UniformUpdate::new(names::COLOR_INITIAL_RAMP, Texture(self.color_initial_ramp)),
            UniformUpdate::new(names::EMISSION_SPHERE_RADIUS, Float(self.emission_sphere_radius)),
            UniformUpdate::new(names::EMISSION_BOX_EXTENTS, V3(self.emission_box_extents)),
            UniformUpdate::new(names::EMISSION_TEXTURE_POINTS, Texture(self.emission_point_texture)),
            UniformUpdate::new(names::EMISSION_TEXTURE_NORMAL, Texture(self.emission_normal_texture)),
            UniformUpdate::new(names::EMISSION_TEXTURE_COLOR, Texture(self.emission_color_texture)),
            UniformUpdate::new(
                names::EMISSION_TEXTURE_POINT_COUNT,
                Int(i32::try_from(self.emission_point_count).unwrap_or(i32::MAX)),
            ),
            UniformUpdate::new(names::EMISSION_RING_AXIS, V3(self.emission_ring_axis)),
            UniformUpdate::new(names::EMISSION_RING_HEIGHT, Float(self.emission_ring_height)),
            UniformUpdate::new(names::EMISSION_RING_RADIUS, Float(self.emission_ring_radius)),
            UniformUpdate::new(
                names::EMISSION_RING_INNER_RADIUS,
                Float(self.emission_ring_inner_radius),
            ),
            UniformUpdate::new(
                names::TURBULENCE_NOISE_STRENGTH,
                Float(self.turbulence_noise_strength),
            ),
            UniformUpdate::new(
                names::TURBULENCE_NOISE_SCALE,
                Float(remap_noise_scale(self.turbulence_noise_scale)),
            ),
            UniformUpdate::new(names::TURBULENCE_NOISE_SPEED, V3(self.turbulence_noise_speed)),
            UniformUpdate::new(
                names::TURBULENCE_NOISE_SPEED_RANDOM,
                Float(self.turbulence_noise_speed_random),
            ),
            UniformUpdate::new(names::GRAVITY, V3(gravity_uniform(self.gravity))),
            UniformUpdate::new(names::LIFETIME_RANDOMNESS, Float(self.lifetime_randomness)),
            UniformUpdate::new(
                names::SUB_EMITTER_FREQUENCY,
                Float(1.0 / self.sub_emitter_frequency),
            ),
            UniformUpdate::new(
                names::SUB_EMITTER_AMOUNT_AT_END,
                Int(i32::try_from(self.sub_emitter_amount_at_end).unwrap_or(i32::MAX)),
            ),
            UniformUpdate::new(
                names::SUB_EMITTER_KEEP_VELOCITY,
                Bool(self.sub_emitter_keep_velocity),
            ),
            UniformUpdate::new(names::COLLISION_FRICTION, Float(self.collision_friction)),
            UniformUpdate::new(names::COLLISION_BOUNCE, Float(self.collision_bounce)),
        ]);

        updates
    }
}

/// Maps the user-facing noise scale onto the frequency the noise helpers expect.
#[must_use]
pub fn remap_noise_scale(scale: f32) -> f32 {
    (scale.powf(0.25) * 5.6234 / 10.0) * 4.0 - 3.0
}

/// Gravity as sent to the shader.
#[must_use]
pub fn gravity_uniform(gravity: Vec3) -> Vec3 {
    if gravity == Vec3::ZERO {
        ZERO_GRAVITY_SUBSTITUTE
    } else {
        gravity
    }
}

fn in_range(
    property: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<f32, ConfigurationError> {
    if !value.is_finite() {
        return Err(ConfigurationError::NonFinite { property });
    }
    if value < min || value > max {
        return Err(ConfigurationError::OutOfRange {
            property,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn range_uniforms(param: Parameter) -> Result<(&'static str, &'static str), ConfigurationError> {
    param
        .range_uniforms()
        .ok_or(ConfigurationError::UnsupportedParameter {
            parameter: param.name(),
            operation: "range",
        })
}

/// Both bounds finite and ordered.
fn checked_range(
    param: Parameter,
    min: f32,
    max: f32,
) -> Result<(&'static str, &'static str), ConfigurationError> {
    let (min_name, max_name) = range_uniforms(param)?;
    if !min.is_finite() {
        return Err(ConfigurationError::NonFinite { property: min_name });
    }
    if !max.is_finite() {
        return Err(ConfigurationError::NonFinite { property: max_name });
    }
    if min > max {
        return Err(ConfigurationError::InvalidRange {
            parameter: param.name(),
            min,
            max,
        });
    }
    Ok((min_name, max_name))
}

fn point_count_uniform(count: u32) -> Result<i32, ConfigurationError> {
    i32::try_from(count).map_err(|_| ConfigurationError::OutOfRange {
        property: names::EMISSION_TEXTURE_POINT_COUNT,
        value: count as f32,
        min: 0.0,
        max: i32::MAX as f32,
    })
}

fn amount_at_end_uniform(amount: u32) -> Result<i32, ConfigurationError> {
    let out_of_range = || ConfigurationError::OutOfRange {
        property: names::SUB_EMITTER_AMOUNT_AT_END,
        value: amount as f32,
        min: 1.0,
        max: 32.0,
    };
    if !(1..=32).contains(&amount) {
        return Err(out_of_range());
    }
    i32::try_from(amount).map_err(|_| out_of_range())
}

fn ring_axis(axis: Vec3) -> Result<Vec3, ConfigurationError> {
    finite_vec3(names::EMISSION_RING_AXIS, axis)?;
    if axis.length_squared() <= f32::EPSILON {
        return Err(ConfigurationError::OutOfRange {
            property: names::EMISSION_RING_AXIS,
            value: axis.length(),
            min: f32::EPSILON,
            max: f32::MAX,
        });
    }
    Ok(axis)
}

fn non_negative(property: &'static str, value: f32) -> Result<f32, ConfigurationError> {
    in_range(property, value, 0.0, f32::MAX)
}

fn finite_vec3(property: &'static str, value: Vec3) -> Result<Vec3, ConfigurationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigurationError::NonFinite { property })
    }
}
