//! Canonical structural record.
//!
//! [`ShaderFeatures`] is the subset of a [`ParticleConfig`] that selects shader
//! fragments. It is canonical: a field that cannot change the generated text in the
//! current combination is cleared, so equal records and equal text coincide.

use crate::config::ParticleConfig;
use crate::params::{CollisionMode, EmissionShape, Parameter, ParticleFlag, SubEmitterMode};

/// Number of parameters that accept a lifetime curve.
pub const CURVE_SLOTS: usize = 13;

/// Set of parameters whose lifetime curve is present.
///
/// Bit `n` corresponds to `Parameter::ALL[n]`; curve-less parameters have no bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CurveSet(u16);

impl CurveSet {
    /// No curves.
    pub const EMPTY: Self = Self(0);

    const MASK: u16 = (1 << CURVE_SLOTS) - 1;

    /// Rebuilds a set from raw bits, rejecting bits outside the curve slots.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Option<Self> {
        if bits & !Self::MASK == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    fn bit(param: Parameter) -> Option<u16> {
        param.texture_uniform().map(|_| 1 << param.index())
    }

    /// Whether the curve for `param` is present.
    #[must_use]
    pub fn contains(self, param: Parameter) -> bool {
        Self::bit(param).is_some_and(|bit| self.0 & bit != 0)
    }

    /// Marks the curve for `param` present. Curve-less parameters are ignored.
    pub fn insert(&mut self, param: Parameter) {
        if let Some(bit) = Self::bit(param) {
            self.0 |= bit;
        }
    }

    /// Marks the curve for `param` absent.
    pub fn remove(&mut self, param: Parameter) {
        if let Some(bit) = Self::bit(param) {
            self.0 &= !bit;
        }
    }

    /// Present curves in parameter order.
    pub fn iter(self) -> impl Iterator<Item = Parameter> {
        Parameter::ALL.into_iter().filter(move |p| self.contains(*p))
    }

    /// Number of present curves.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// True when no curve is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Structural fields of a particle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderFeatures {
    /// Emission shape
    pub emission_shape: EmissionShape,
    /// Sub-emitter trigger
    pub sub_emitter: SubEmitterMode,
    /// Collision response
    pub collision: CollisionMode,
    /// Simulate in the XY plane
    pub disable_z: bool,
    /// Align Y to velocity
    pub align_y: bool,
    /// Spin around Y (3D only)
    pub rotate_y: bool,
    /// `render_mode collision_use_scale`
    pub collision_use_scale: bool,
    /// Turbulence blocks
    pub turbulence: bool,
    /// Attractor force injection
    pub attractor: bool,
    /// Color ramp present
    pub color_ramp: bool,
    /// Initial color ramp present
    pub color_initial_ramp: bool,
    /// Per-point color texture present (point shapes only)
    pub emission_color: bool,
    /// Present lifetime curves
    pub curves: CurveSet,
}

impl Default for ShaderFeatures {
    fn default() -> Self {
        Self::from_config(&ParticleConfig::default())
    }
}

impl ShaderFeatures {
    /// Extracts the canonical structural record of a configuration.
    #[must_use]
    pub fn from_config(config: &ParticleConfig) -> Self {
        let mut curves = CurveSet::EMPTY;
        for (param, texture) in config.param_texture.iter() {
            if texture.is_some() {
                curves.insert(param);
            }
        }

        Self {
            emission_shape: config.emission_shape,
            sub_emitter: config.sub_emitter_mode,
            collision: config.collision_mode,
            disable_z: config.flag(ParticleFlag::DisableZ),
            align_y: config.flag(ParticleFlag::AlignYToVelocity),
            rotate_y: config.flag(ParticleFlag::RotateY),
            collision_use_scale: config.collision_use_scale,
            turbulence: config.turbulence_enabled,
            attractor: config.attractor_interaction_enabled,
            color_ramp: config.color_ramp.is_some(),
            color_initial_ramp: config.color_initial_ramp.is_some(),
            emission_color: config.emission_color_texture.is_some(),
            curves,
        }
        .canonical()
    }

    /// Clears fields that cannot influence the text in this combination.
    #[must_use]
    pub fn canonical(mut self) -> Self {
        if !self.emission_shape.uses_point_texture() {
            self.emission_color = false;
        }
        if self.disable_z {
            self.rotate_y = false;
        }
        if !self.turbulence {
            self.curves.remove(Parameter::TurbInfluenceOverLife);
        }
        self
    }

    /// Whether this record is already canonical.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.canonical() == *self
    }

    /// Whether the lifetime curve for `param` is present.
    #[must_use]
    pub fn has_curve(&self, param: Parameter) -> bool {
        self.curves.contains(param)
    }
}
