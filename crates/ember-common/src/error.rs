//! Error types for Ember.
//!
//! Three failure classes exist:
//! - [`ConfigurationError`]: a caller handed a setter an out-of-range enum index or value.
//!   Rejected before any mutation; recovered at the setter boundary.
//! - [`CompileError`]: the backend rejected generated text. Surfaced to whoever ran the flush.
//! - [`ConsistencyError`]: a key/refcount invariant is already broken. Never expected in
//!   correct operation; callers halt on it instead of continuing.

use thiserror::Error;

use crate::ids::MaterialId;

/// Top-level error type for Ember operations.
#[derive(Debug, Error)]
pub enum EmberError {
    /// Invalid property edit
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Backend rejected a generated shader
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Internal invariant violated
    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// One or more instances failed to build during a flush
    #[error("Flush failed for {} material(s)", failures.len())]
    FlushFailed {
        /// Every instance whose variant could not be compiled
        failures: Vec<MaterialCompileFailure>,
    },

    /// Subsystem initialization failed (logging, settings)
    #[error("Initialization failed: {0}")]
    Init(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmberError {
    /// Checks if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Checks if this error came from shader compilation.
    #[must_use]
    pub const fn is_compile(&self) -> bool {
        matches!(self, Self::Compile(_) | Self::FlushFailed { .. })
    }
}

/// Rejected property edit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Raw index does not name a variant of the enum
    #[error("{value} is not a valid {kind}")]
    UnknownVariant {
        /// Enum being converted
        kind: &'static str,
        /// Offending raw value
        value: u32,
    },

    /// NaN or infinite component
    #[error("{property} must be finite")]
    NonFinite {
        /// Property name
        property: &'static str,
    },

    /// Value outside the accepted range
    #[error("{property} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Property name
        property: &'static str,
        /// Offending value
        value: f32,
        /// Inclusive lower bound
        min: f32,
        /// Inclusive upper bound
        max: f32,
    },

    /// Lower bound above upper bound
    #[error("{parameter} range [{min}, {max}] is inverted")]
    InvalidRange {
        /// Parameter name
        parameter: &'static str,
        /// Requested lower bound
        min: f32,
        /// Requested upper bound
        max: f32,
    },

    /// Parameter does not support the requested kind of edit
    #[error("parameter {parameter} has no {operation}")]
    UnsupportedParameter {
        /// Parameter name
        parameter: &'static str,
        /// "range" or "curve"
        operation: &'static str,
    },
}

/// Backend failed to produce a program for a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Backend refused the generated text
    #[error("shader for key {key:#x} rejected: {reason}")]
    Rejected {
        /// Raw shader key
        key: u64,
        /// Backend diagnostic
        reason: String,
    },

    /// Key does not describe any structural configuration
    #[error("key {key:#x} does not decode to a structural configuration")]
    UndecodableKey {
        /// Raw shader key
        key: u64,
    },
}

/// Broken key/refcount invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    /// Release of a key that holds no variant
    #[error("release of key {key:#x} which has no live variant")]
    ReleaseOfAbsentKey {
        /// Raw shader key
        key: u64,
    },

    /// Acquire called with the invalid sentinel
    #[error("acquire called with the invalid key sentinel")]
    AcquireOfInvalidKey,

    /// Operation on a material that is not registered
    #[error("{id} is not registered with the material server")]
    UnknownMaterial {
        /// Material ID
        id: MaterialId,
    },
}

/// Compile failure attributed to one material instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialCompileFailure {
    /// Instance left without a bound shader
    pub material: MaterialId,
    /// Backend diagnostic
    pub error: CompileError,
}

/// Result type alias for Ember operations.
pub type EmberResult<T> = Result<T, EmberError>;
