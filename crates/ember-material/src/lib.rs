//! # Ember Material
//!
//! Stateful layer of the Ember particle material system.
//!
//! This crate owns everything that outlives a single shader generation:
//! - [`ShaderBackend`], the narrow compile/destroy/bind/set-param interface
//! - [`VariantCache`], one reference-counted compiled shader per structural key
//! - [`DirtyScheduler`], the pending set drained by a flush
//! - [`MaterialServer`] and [`ParticleMaterial`], the service object and its instances
//! - [`MaterialSettings`] and tracing setup
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use ember_material::prelude::*;
//!
//! let backend = Arc::new(HeadlessBackend::new());
//! let server = MaterialServer::new(backend.clone(), MaterialSettings::default());
//!
//! let material = server.create_material(MaterialSlot::new(0));
//! material.set_emission_shape(EmissionShape::Sphere)?;
//! material.set_spread(20.0)?;
//!
//! // once per tick
//! server.flush()?;
//! assert!(material.bound_handle().is_some());
//! # Ok::<(), EmberError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod cache;
pub mod logging;
pub mod material;
pub mod scheduler;
pub mod server;
pub mod settings;

mod scenario_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{BackendCounters, HeadlessBackend, ShaderBackend};
    pub use crate::cache::{CacheStats, ShaderVariant, VariantCache};
    pub use crate::material::ParticleMaterial;
    pub use crate::scheduler::{DirtyScheduler, FlushReport};
    pub use crate::server::MaterialServer;
    pub use crate::settings::{FlushPolicy, MaterialSettings};
    pub use ember_common::prelude::*;
    pub use ember_shader::prelude::*;
}

pub use prelude::*;
