//! Enumerations that index the particle configuration.
//!
//! Every enum converts from a raw `u32` index through `TryFrom`, which is the
//! boundary where an outer binding layer hands us untrusted indices.

use ember_common::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Randomised min/max parameter, optionally modulated by a curve over lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Parameter {
    /// Initial speed along the spread cone.
    InitialLinearVelocity = 0,
    /// Degrees per second of spin.
    AngularVelocity = 1,
    /// Revolutions per second around the emitter (2D only).
    OrbitVelocity = 2,
    /// Acceleration along the velocity direction.
    LinearAccel = 3,
    /// Acceleration away from the emitter origin.
    RadialAccel = 4,
    /// Acceleration perpendicular to the radial direction.
    TangentialAccel = 5,
    /// Speed lost per second.
    Damping = 6,
    /// Initial rotation in degrees.
    Angle = 7,
    /// Uniform scale.
    Scale = 8,
    /// Hue rotation in turns.
    HueVariation = 9,
    /// Animation frames advanced over lifetime.
    AnimSpeed = 10,
    /// Initial animation frame offset.
    AnimOffset = 11,
    /// Turbulence strength over lifetime (curve only).
    TurbInfluenceOverLife = 12,
    /// Turbulence velocity influence (range only).
    TurbVelInfluence = 13,
    /// Initial turbulence displacement (range only).
    TurbInitDisplacement = 14,
}

impl Parameter {
    /// Number of parameters.
    pub const COUNT: usize = 15;

    /// All parameters in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::InitialLinearVelocity,
        Self::AngularVelocity,
        Self::OrbitVelocity,
        Self::LinearAccel,
        Self::RadialAccel,
        Self::TangentialAccel,
        Self::Damping,
        Self::Angle,
        Self::Scale,
        Self::HueVariation,
        Self::AnimSpeed,
        Self::AnimOffset,
        Self::TurbInfluenceOverLife,
        Self::TurbVelInfluence,
        Self::TurbInitDisplacement,
    ];

    /// Table index of this parameter.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human readable name used in errors and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitialLinearVelocity => "initial_linear_velocity",
            Self::AngularVelocity => "angular_velocity",
            Self::OrbitVelocity => "orbit_velocity",
            Self::LinearAccel => "linear_accel",
            Self::RadialAccel => "radial_accel",
            Self::TangentialAccel => "tangential_accel",
            Self::Damping => "damping",
            Self::Angle => "angle",
            Self::Scale => "scale",
            Self::HueVariation => "hue_variation",
            Self::AnimSpeed => "anim_speed",
            Self::AnimOffset => "anim_offset",
            Self::TurbInfluenceOverLife => "turbulence_influence_over_life",
            Self::TurbVelInfluence => "turbulence_influence",
            Self::TurbInitDisplacement => "turbulence_initial_displacement",
        }
    }

    /// Uniform names of the min/max pair, if this parameter is randomised.
    #[must_use]
    pub const fn range_uniforms(self) -> Option<(&'static str, &'static str)> {
        let names = match self {
            Self::InitialLinearVelocity => {
                ("initial_linear_velocity_min", "initial_linear_velocity_max")
            },
            Self::AngularVelocity => ("angular_velocity_min", "angular_velocity_max"),
            Self::OrbitVelocity => ("orbit_velocity_min", "orbit_velocity_max"),
            Self::LinearAccel => ("linear_accel_min", "linear_accel_max"),
            Self::RadialAccel => ("radial_accel_min", "radial_accel_max"),
            Self::TangentialAccel => ("tangent_accel_min", "tangent_accel_max"),
            Self::Damping => ("damping_min", "damping_max"),
            Self::Angle => ("initial_angle_min", "initial_angle_max"),
            Self::Scale => ("scale_min", "scale_max"),
            Self::HueVariation => ("hue_variation_min", "hue_variation_max"),
            Self::AnimSpeed => ("anim_speed_min", "anim_speed_max"),
            Self::AnimOffset => ("anim_offset_min", "anim_offset_max"),
            Self::TurbInfluenceOverLife => return None,
            Self::TurbVelInfluence => ("turbulence_influence_min", "turbulence_influence_max"),
            Self::TurbInitDisplacement => (
                "turbulence_initial_displacement_min",
                "turbulence_initial_displacement_max",
            ),
        };
        Some(names)
    }

    /// Sampler uniform name of the lifetime curve, if this parameter accepts one.
    #[must_use]
    pub const fn texture_uniform(self) -> Option<&'static str> {
        match self {
            Self::InitialLinearVelocity => Some("linear_velocity_texture"),
            Self::AngularVelocity => Some("angular_velocity_texture"),
            Self::OrbitVelocity => Some("orbit_velocity_texture"),
            Self::LinearAccel => Some("linear_accel_texture"),
            Self::RadialAccel => Some("radial_accel_texture"),
            Self::TangentialAccel => Some("tangent_accel_texture"),
            Self::Damping => Some("damping_texture"),
            Self::Angle => Some("angle_texture"),
            Self::Scale => Some("scale_texture"),
            Self::HueVariation => Some("hue_variation_texture"),
            Self::AnimSpeed => Some("anim_speed_texture"),
            Self::AnimOffset => Some("anim_offset_texture"),
            Self::TurbInfluenceOverLife => Some("turbulence_influence_over_life"),
            Self::TurbVelInfluence | Self::TurbInitDisplacement => None,
        }
    }

    /// Whether this parameter belongs to the turbulence group.
    #[must_use]
    pub const fn is_turbulence(self) -> bool {
        matches!(
            self,
            Self::TurbInfluenceOverLife | Self::TurbVelInfluence | Self::TurbInitDisplacement
        )
    }
}

impl TryFrom<u32> for Parameter {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ConfigurationError::UnknownVariant {
                kind: "Parameter",
                value,
            })
    }
}

/// Per-particle orientation toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParticleFlag {
    /// Point the particle's Y axis along its velocity.
    AlignYToVelocity = 0,
    /// Spin around the Y axis instead of Z (3D only).
    RotateY = 1,
    /// Simulate in the XY plane.
    DisableZ = 2,
}

impl ParticleFlag {
    /// Number of flags.
    pub const COUNT: usize = 3;

    /// All flags in index order.
    pub const ALL: [Self; Self::COUNT] = [Self::AlignYToVelocity, Self::RotateY, Self::DisableZ];

    /// Table index of this flag.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AlignYToVelocity => "align_y_to_velocity",
            Self::RotateY => "rotate_y",
            Self::DisableZ => "disable_z",
        }
    }
}

impl TryFrom<u32> for ParticleFlag {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ConfigurationError::UnknownVariant {
                kind: "ParticleFlag",
                value,
            })
    }
}

/// Volume or surface that new particles are placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum EmissionShape {
    /// All particles start at the emitter origin.
    #[default]
    Point = 0,
    /// Uniformly inside a sphere.
    Sphere = 1,
    /// On the surface of a sphere.
    SphereSurface = 2,
    /// Inside an axis-aligned box.
    Box = 3,
    /// At positions read from a point texture.
    Points = 4,
    /// At positions read from a point texture, velocity reoriented by a normal texture.
    DirectedPoints = 5,
    /// Inside a ring (annulus extruded along its axis).
    Ring = 6,
}

impl EmissionShape {
    /// Number of shapes.
    pub const COUNT: usize = 7;

    /// All shapes in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Point,
        Self::Sphere,
        Self::SphereSurface,
        Self::Box,
        Self::Points,
        Self::DirectedPoints,
        Self::Ring,
    ];

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Sphere => "sphere",
            Self::SphereSurface => "sphere_surface",
            Self::Box => "box",
            Self::Points => "points",
            Self::DirectedPoints => "directed_points",
            Self::Ring => "ring",
        }
    }

    /// Whether particles are placed from the emission point texture.
    #[must_use]
    pub const fn uses_point_texture(self) -> bool {
        matches!(self, Self::Points | Self::DirectedPoints)
    }
}

impl TryFrom<u32> for EmissionShape {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ConfigurationError::UnknownVariant {
                kind: "EmissionShape",
                value,
            })
    }
}

/// When particles spawn particles on the sub-emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SubEmitterMode {
    /// No sub-emission.
    #[default]
    Disabled = 0,
    /// Emit at a fixed frequency while alive.
    Constant = 1,
    /// Emit a burst shortly before the particle expires.
    AtEnd = 2,
    /// Emit whenever the particle collides.
    AtCollision = 3,
}

impl SubEmitterMode {
    /// Number of modes.
    pub const COUNT: usize = 4;

    /// All modes in index order.
    pub const ALL: [Self; Self::COUNT] =
        [Self::Disabled, Self::Constant, Self::AtEnd, Self::AtCollision];

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Constant => "constant",
            Self::AtEnd => "at_end",
            Self::AtCollision => "at_collision",
        }
    }
}

impl TryFrom<u32> for SubEmitterMode {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ConfigurationError::UnknownVariant {
                kind: "SubEmitterMode",
                value,
            })
    }
}

/// Reaction of a particle touching a collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CollisionMode {
    /// Colliders are ignored.
    #[default]
    Disabled = 0,
    /// Bounce with friction.
    Rigid = 1,
    /// Deactivate on first contact.
    HideOnContact = 2,
}

impl CollisionMode {
    /// Number of modes.
    pub const COUNT: usize = 3;

    /// All modes in index order.
    pub const ALL: [Self; Self::COUNT] = [Self::Disabled, Self::Rigid, Self::HideOnContact];

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Rigid => "rigid",
            Self::HideOnContact => "hide_on_contact",
        }
    }
}

impl TryFrom<u32> for CollisionMode {
    type Error = ConfigurationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ConfigurationError::UnknownVariant {
                kind: "CollisionMode",
                value,
            })
    }
}
