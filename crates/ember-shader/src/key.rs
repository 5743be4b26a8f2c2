//! Packed structural key.
//!
//! Layout of [`ShaderKey`] (low to high):
//!
//! | bits   | field                   |
//! |--------|-------------------------|
//! | 0..3   | emission shape          |
//! | 3..5   | sub-emitter mode        |
//! | 5..7   | collision mode          |
//! | 7      | disable Z               |
//! | 8      | align Y to velocity     |
//! | 9      | rotate Y                |
//! | 10     | collision uses scale    |
//! | 11     | turbulence              |
//! | 12     | attractor interaction   |
//! | 13     | color ramp              |
//! | 14     | initial color ramp      |
//! | 15     | emission color texture  |
//! | 16..29 | lifetime curves         |
//! | 63     | invalid sentinel        |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ParticleConfig;
use crate::features::{CurveSet, ShaderFeatures};
use crate::params::{CollisionMode, EmissionShape, SubEmitterMode};

const SHAPE_SHIFT: u32 = 0;
const SHAPE_MASK: u64 = 0b111;
const SUB_EMITTER_SHIFT: u32 = 3;
const SUB_EMITTER_MASK: u64 = 0b11;
const COLLISION_SHIFT: u32 = 5;
const COLLISION_MASK: u64 = 0b11;

const DISABLE_Z: u64 = 1 << 7;
const ALIGN_Y: u64 = 1 << 8;
const ROTATE_Y: u64 = 1 << 9;
const COLLISION_USE_SCALE: u64 = 1 << 10;
const TURBULENCE: u64 = 1 << 11;
const ATTRACTOR: u64 = 1 << 12;
const COLOR_RAMP: u64 = 1 << 13;
const COLOR_INITIAL_RAMP: u64 = 1 << 14;
const EMISSION_COLOR: u64 = 1 << 15;

const CURVE_SHIFT: u32 = 16;
const CURVE_MASK: u64 = 0x1FFF;

const USED_BITS: u64 = (1 << 29) - 1;

/// Canonical fingerprint of a structural configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShaderKey(u64);

impl ShaderKey {
    /// No variant acquired.
    pub const INVALID: Self = Self(1 << 63);

    /// Packs a structural record. Non-canonical input is canonicalised first.
    #[must_use]
    pub fn from_features(features: &ShaderFeatures) -> Self {
        let f = features.canonical();
        let mut raw = (f.emission_shape as u64) << SHAPE_SHIFT
            | (f.sub_emitter as u64) << SUB_EMITTER_SHIFT
            | (f.collision as u64) << COLLISION_SHIFT
            | u64::from(f.curves.bits()) << CURVE_SHIFT;

        for (set, bit) in [
            (f.disable_z, DISABLE_Z),
            (f.align_y, ALIGN_Y),
            (f.rotate_y, ROTATE_Y),
            (f.collision_use_scale, COLLISION_USE_SCALE),
            (f.turbulence, TURBULENCE),
            (f.attractor, ATTRACTOR),
            (f.color_ramp, COLOR_RAMP),
            (f.color_initial_ramp, COLOR_INITIAL_RAMP),
            (f.emission_color, EMISSION_COLOR),
        ] {
            if set {
                raw |= bit;
            }
        }
        Self(raw)
    }

    /// Rebuilds a key from its raw value without checking it.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is not the invalid sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Unpacks the structural record.
    ///
    /// Returns `None` for the sentinel, stray bits, out-of-range enum fields and
    /// non-canonical bit patterns, so every accepted key re-encodes to itself.
    #[must_use]
    pub fn decode(self) -> Option<ShaderFeatures> {
        if self.0 & !USED_BITS != 0 {
            return None;
        }

        let field = |shift: u32, mask: u64| ((self.0 >> shift) & mask) as u32;
        let emission_shape = EmissionShape::try_from(field(SHAPE_SHIFT, SHAPE_MASK)).ok()?;
        let sub_emitter =
            SubEmitterMode::try_from(field(SUB_EMITTER_SHIFT, SUB_EMITTER_MASK)).ok()?;
        let collision = CollisionMode::try_from(field(COLLISION_SHIFT, COLLISION_MASK)).ok()?;
        let curves = CurveSet::from_bits(field(CURVE_SHIFT, CURVE_MASK) as u16)?;
        let has = |bit: u64| self.0 & bit != 0;

        let features = ShaderFeatures {
            emission_shape,
            sub_emitter,
            collision,
            disable_z: has(DISABLE_Z),
            align_y: has(ALIGN_Y),
            rotate_y: has(ROTATE_Y),
            collision_use_scale: has(COLLISION_USE_SCALE),
            turbulence: has(TURBULENCE),
            attractor: has(ATTRACTOR),
            color_ramp: has(COLOR_RAMP),
            color_initial_ramp: has(COLOR_INITIAL_RAMP),
            emission_color: has(EMISSION_COLOR),
            curves,
        };

        features.is_canonical().then_some(features)
    }
}

impl Default for ShaderKey {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "key:{:#09x}", self.0)
        } else {
            write!(f, "key:invalid")
        }
    }
}

/// Computes the structural key of a configuration.
#[must_use]
pub fn compute_key(config: &ParticleConfig) -> ShaderKey {
    ShaderKey::from_features(&ShaderFeatures::from_config(config))
}
