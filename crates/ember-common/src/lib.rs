//! # Ember Common
//!
//! Common types shared by the Ember particle material crates.
//!
//! This crate provides the foundational vocabulary used across the workspace:
//! - ID types for material instances, backend slots, compiled shaders and textures
//! - The error taxonomy (configuration, compile and consistency errors)
//! - Version information stamped into generated shader text
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_id_generation() {
        let id1 = MaterialId::new();
        let id2 = MaterialId::new();
        assert_ne!(id1, id2);
        assert!(id2.raw() > id1.raw());
        assert_eq!(id1.to_string(), format!("material#{}", id1.raw()));
    }

    #[test]
    fn test_error_conversion() {
        let err: EmberError = ConfigurationError::NonFinite { property: "spread" }.into();
        assert!(err.is_configuration());
        assert!(!err.is_compile());
    }
}
