//! # Ember Shader
//!
//! Pure layer of the Ember particle material system.
//!
//! This crate turns a declarative particle configuration into shader source:
//! - Parameter and mode enumerations with checked conversion from raw indices
//! - [`ParticleConfig`], the full configuration, and its edit vocabulary
//! - [`ShaderFeatures`], the canonical structural record
//! - [`ShaderKey`], a packed fingerprint of that record
//! - The code generator, an ordered list of tagged fragments
//!
//! ## Key/text correspondence
//!
//! Two configurations produce the same [`ShaderKey`] exactly when they produce the same
//! generated text. Uniform fields (ranges, colors, vectors, texture contents) never
//! reach the generator; structural fields that are irrelevant in a given combination
//! are cleared during canonicalisation.
//!
//! Nothing here holds state or touches a backend; see `ember-material` for caching and
//! batching.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod codegen;
pub mod config;
pub mod features;
pub mod key;
pub mod params;
pub mod properties;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codegen::{generate_code, generate_program, Fragment, FragmentTag, ShaderProgram};
    pub use crate::config::*;
    pub use crate::features::*;
    pub use crate::key::*;
    pub use crate::params::*;
    pub use crate::properties::{StructuralProperty, UniformProperty, UniformUpdate, UniformValue};
}

pub use prelude::*;
