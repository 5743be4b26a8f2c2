//! ID types for material instances and backend resources.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for material IDs.
static MATERIAL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a particle material instance.
///
/// Material IDs address the instance arena owned by the material server and are
/// never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(u64);

impl MaterialId {
    /// Creates a new unique material ID.
    #[must_use]
    pub fn new() -> Self {
        Self(MATERIAL_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// Handle to a compiled shader program owned by the rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderHandle(u64);

impl ShaderHandle {
    /// Creates a shader handle from a raw backend value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Backend material resource that a shader is bound to and parameters are set on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialSlot(u64);

impl MaterialSlot {
    /// Creates a material slot from a raw backend value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw slot value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque reference to a texture or baked curve owned by an external loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(u64);

impl TextureId {
    /// Creates a texture ID from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}
