//! Reference-counted shader variant cache.
//!
//! At most one compiled shader exists per [`ShaderKey`]. A variant is created by the
//! first `acquire` of its key and destroyed by the `release` that drops its count to
//! zero. The cache is not synchronised; the material server guards it with its
//! state lock.

use ahash::AHashMap;
use ember_common::{CompileError, ConsistencyError, EmberError, EmberResult, ShaderHandle};
use ember_shader::{generate_program, ShaderKey};
use tracing::{debug, info, trace, warn};

use crate::backend::ShaderBackend;
use crate::settings::MaterialSettings;

/// One compiled shader and the number of instances pointing at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderVariant {
    /// Backend handle
    pub handle: ShaderHandle,
    /// Instances holding this key
    pub ref_count: u32,
}

/// Lifetime counters of a [`VariantCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Variants currently alive
    pub live_variants: usize,
    /// Backend compiles requested
    pub compiles: u64,
    /// Backend destroys requested
    pub destroys: u64,
    /// Successful acquires
    pub acquires: u64,
    /// Successful releases
    pub releases: u64,
}

/// Map from structural key to compiled variant.
#[derive(Debug, Default)]
pub struct VariantCache {
    variants: AHashMap<ShaderKey, ShaderVariant>,
    stats: CacheStats,
}

impl VariantCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reference on the variant for `key`, compiling it on first use.
    ///
    /// On a compile failure nothing is inserted.
    pub fn acquire(
        &mut self,
        key: ShaderKey,
        backend: &dyn ShaderBackend,
        settings: &MaterialSettings,
    ) -> EmberResult<ShaderHandle> {
        if !key.is_valid() {
            return Err(ConsistencyError::AcquireOfInvalidKey.into());
        }

        if let Some(variant) = self.variants.get_mut(&key) {
            variant.ref_count += 1;
            self.stats.acquires += 1;
            trace!("Variant {key} now has {} user(s)", variant.ref_count);
            return Ok(variant.handle);
        }

        let features = key
            .decode()
            .ok_or(CompileError::UndecodableKey { key: key.raw() })?;
        let source = generate_program(&features).into_text();
        if settings.log_generated_source {
            trace!("Generated source for {key}:\n{source}");
        }

        self.stats.compiles += 1;
        let handle = backend.compile(&source).map_err(|reason| {
            warn!("Backend rejected shader for {key}: {reason}");
            EmberError::from(CompileError::Rejected {
                key: key.raw(),
                reason,
            })
        })?;

        self.variants.insert(
            key,
            ShaderVariant {
                handle,
                ref_count: 1,
            },
        );
        self.stats.acquires += 1;
        self.stats.live_variants = self.variants.len();
        debug!("Compiled variant {key} as shader {}", handle.raw());

        let threshold = settings.variant_warning_threshold;
        if threshold > 0 && self.variants.len() > threshold {
            warn!(
                "{} live shader variants exceed the warning threshold of {threshold}",
                self.variants.len()
            );
        }
        Ok(handle)
    }

    /// Drops a reference on `key`, destroying the variant when it was the last one.
    pub fn release(
        &mut self,
        key: ShaderKey,
        backend: &dyn ShaderBackend,
    ) -> Result<(), ConsistencyError> {
        let variant = self
            .variants
            .get_mut(&key)
            .ok_or(ConsistencyError::ReleaseOfAbsentKey { key: key.raw() })?;

        variant.ref_count -= 1;
        self.stats.releases += 1;
        if variant.ref_count == 0 {
            let handle = variant.handle;
            self.variants.remove(&key);
            backend.destroy(handle);
            self.stats.destroys += 1;
            self.stats.live_variants = self.variants.len();
            debug!("Destroyed variant {key} (shader {})", handle.raw());
        } else {
            trace!("Variant {key} now has {} user(s)", variant.ref_count);
        }
        Ok(())
    }

    /// Handle of a live variant.
    #[must_use]
    pub fn handle(&self, key: ShaderKey) -> Option<ShaderHandle> {
        self.variants.get(&key).map(|v| v.handle)
    }

    /// Reference count of `key`; zero when absent.
    #[must_use]
    pub fn ref_count(&self, key: ShaderKey) -> u32 {
        self.variants.get(&key).map_or(0, |v| v.ref_count)
    }

    /// Number of live variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// True when no variant is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Lifetime counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Destroys every remaining variant regardless of its count.
    pub fn drain(&mut self, backend: &dyn ShaderBackend) {
        if self.variants.is_empty() {
            return;
        }
        info!("Destroying {} remaining shader variant(s)", self.variants.len());
        for (key, variant) in self.variants.drain() {
            trace!("Dropping variant {key} with {} user(s)", variant.ref_count);
            backend.destroy(variant.handle);
            self.stats.destroys += 1;
        }
        self.stats.live_variants = 0;
    }
}
