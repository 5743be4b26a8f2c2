//! Material server.
//!
//! The server is the explicit owner of everything shared between particle materials:
//! the backend, the variant cache, the pending set and the arena of live instances.
//!
//! Locking:
//! - `state` (cache, scheduler, bindings) is the single exclusive lock that serialises
//!   compiles and reference counting.
//! - `materials` is the arena, read during flushes and written on create/destroy.
//! - Each record's `config` lock is held only while an edit or a key computation runs.
//!
//! Locks are always taken in that order. Uniform edits only touch `config`.

use std::sync::Arc;

use ahash::AHashMap;
use ember_common::{
    ConsistencyError, EmberError, EmberResult, MaterialCompileFailure, MaterialId,
    MaterialSlot, ShaderHandle,
};
use ember_shader::{compute_key, ParticleConfig, ShaderKey};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::backend::ShaderBackend;
use crate::cache::{CacheStats, VariantCache};
use crate::material::ParticleMaterial;
use crate::scheduler::{drain_pending, DirtyScheduler, FlushOutcome, FlushReport, SchedulerState};
use crate::settings::MaterialSettings;

/// Per-instance data reachable without the state lock.
#[derive(Debug)]
pub(crate) struct MaterialRecord {
    pub(crate) slot: MaterialSlot,
    pub(crate) config: RwLock<ParticleConfig>,
}

/// Key and handle currently bound to an instance's slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Binding {
    pub(crate) key: ShaderKey,
    pub(crate) handle: Option<ShaderHandle>,
}

#[derive(Debug, Default)]
pub(crate) struct ServerState {
    pub(crate) cache: VariantCache,
    pub(crate) scheduler: DirtyScheduler,
    pub(crate) bindings: AHashMap<MaterialId, Binding>,
}

impl SchedulerState for ServerState {
    fn scheduler(&mut self) -> &mut DirtyScheduler {
        &mut self.scheduler
    }
}

pub(crate) struct ServerShared {
    pub(crate) backend: Arc<dyn ShaderBackend>,
    pub(crate) settings: MaterialSettings,
    pub(crate) materials: RwLock<AHashMap<MaterialId, Arc<MaterialRecord>>>,
    pub(crate) state: Mutex<ServerState>,
}

/// Logs and halts on a broken key/refcount invariant.
pub(crate) fn consistency_violation(err: &ConsistencyError) -> ! {
    error!("Material state is inconsistent: {err}");
    panic!("material state is inconsistent: {err}");
}

impl ServerShared {
    pub(crate) fn flush(&self) -> EmberResult<FlushReport> {
        let mut failures = Vec::new();
        let report = drain_pending(&self.state, |state, id| {
            self.rebuild(state, id, &mut failures)
        });

        if report.processed > 0 {
            info!(
                "Flushed {} material(s): {} rebuilt, {} unchanged, {} failed",
                report.processed, report.rebuilt, report.unchanged, report.failed
            );
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(EmberError::FlushFailed { failures })
        }
    }

    fn rebuild(
        &self,
        state: &mut ServerState,
        id: MaterialId,
        failures: &mut Vec<MaterialCompileFailure>,
    ) -> FlushOutcome {
        let Some(record) = self.materials.read().get(&id).cloned() else {
            debug!("{id} was destroyed before its rebuild");
            return FlushOutcome::Skipped;
        };

        let new_key = compute_key(&record.config.read());
        let old = state.bindings.get(&id).copied().unwrap_or_default();
        if new_key == old.key {
            return FlushOutcome::Unchanged;
        }

        let backend = self.backend.as_ref();
        if old.key.is_valid() {
            if let Err(err) = state.cache.release(old.key, backend) {
                consistency_violation(&err);
            }
        }

        match state.cache.acquire(new_key, backend, &self.settings) {
            Ok(handle) => {
                state.bindings.insert(
                    id,
                    Binding {
                        key: new_key,
                        handle: Some(handle),
                    },
                );
                backend.bind(record.slot, Some(handle));
                debug!("{id} moved from {} to {new_key}", old.key);
                FlushOutcome::Rebuilt
            },
            Err(EmberError::Compile(err)) => {
                state.bindings.insert(id, Binding::default());
                backend.bind(record.slot, None);
                error!("{id} has no shader after flush: {err}");
                failures.push(MaterialCompileFailure {
                    material: id,
                    error: err,
                });
                FlushOutcome::Failed
            },
            Err(EmberError::Consistency(err)) => consistency_violation(&err),
            Err(err) => unreachable!("variant acquire returned {err}"),
        }
    }
}

impl Drop for ServerShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.bindings.is_empty() {
            warn!(
                "Material server dropped with {} instance binding(s)",
                state.bindings.len()
            );
        }
        state.cache.drain(self.backend.as_ref());
    }
}

/// Service object owning the variant cache, the pending set and every instance.
///
/// Cloning yields another handle to the same server.
#[derive(Clone)]
pub struct MaterialServer {
    shared: Arc<ServerShared>,
}

impl std::fmt::Debug for MaterialServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialServer")
            .field("settings", &self.shared.settings)
            .field("materials", &self.shared.materials.read().len())
            .finish_non_exhaustive()
    }
}

impl MaterialServer {
    /// Creates a server on top of `backend`.
    pub fn new(backend: Arc<dyn ShaderBackend>, mut settings: MaterialSettings) -> Self {
        settings.validate();
        info!("Material server started ({:?} flush)", settings.flush_policy);
        Self {
            shared: Arc::new(ServerShared {
                backend,
                settings,
                materials: RwLock::new(AHashMap::new()),
                state: Mutex::new(ServerState::default()),
            }),
        }
    }

    /// Creates a material with the default configuration, bound to `slot`.
    ///
    /// Every uniform is written to the slot immediately; the shader itself is built by
    /// the next flush.
    pub fn create_material(&self, slot: MaterialSlot) -> ParticleMaterial {
        self.register(slot, ParticleConfig::default())
    }

    /// Creates a material with an initial configuration.
    ///
    /// The configuration is checked with [`ParticleConfig::validate`]; an invalid one
    /// is rejected before anything is written to the backend.
    pub fn create_material_with(
        &self,
        slot: MaterialSlot,
        config: ParticleConfig,
    ) -> EmberResult<ParticleMaterial> {
        if let Err(err) = config.validate() {
            warn!("Rejected initial configuration for slot {}: {err}", slot.raw());
            return Err(err.into());
        }
        Ok(self.register(slot, config))
    }

    fn register(&self, slot: MaterialSlot, config: ParticleConfig) -> ParticleMaterial {
        let id = MaterialId::new();
        for update in config.uniform_snapshot() {
            self.shared.backend.set_param(slot, update.name, &update.value);
        }

        let record = Arc::new(MaterialRecord {
            slot,
            config: RwLock::new(config),
        });

        let mut state = self.shared.state.lock();
        self.shared.materials.write().insert(id, Arc::clone(&record));
        state.bindings.insert(id, Binding::default());
        state.scheduler.mark_dirty(id);
        drop(state);

        debug!("Created {id} on slot {}", slot.raw());
        ParticleMaterial::new(Arc::clone(&self.shared), id, record)
    }

    /// Rebuilds every pending material.
    ///
    /// Compile failures do not stop the drain; they are collected and returned as
    /// [`EmberError::FlushFailed`] once every pending material has been processed.
    pub fn flush(&self) -> EmberResult<FlushReport> {
        self.shared.flush()
    }

    /// Number of materials awaiting a rebuild.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().scheduler.len()
    }

    /// Number of live shader variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.shared.state.lock().cache.len()
    }

    /// Number of live materials.
    #[must_use]
    pub fn material_count(&self) -> usize {
        self.shared.materials.read().len()
    }

    /// Configuration snapshot of a live material.
    pub fn material_config(&self, id: MaterialId) -> EmberResult<ParticleConfig> {
        self.shared
            .materials
            .read()
            .get(&id)
            .map(|record| record.config.read().clone())
            .ok_or_else(|| ConsistencyError::UnknownMaterial { id }.into())
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.shared.state.lock().cache.stats()
    }

    /// Reference count of a variant; zero when absent.
    #[must_use]
    pub fn ref_count(&self, key: ShaderKey) -> u32 {
        self.shared.state.lock().cache.ref_count(key)
    }

    /// Effective settings.
    #[must_use]
    pub fn settings(&self) -> &MaterialSettings {
        &self.shared.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use ember_common::ConfigurationError;
    use ember_shader::{EmissionShape, Parameter, StructuralProperty};

    fn server() -> (Arc<HeadlessBackend>, MaterialServer) {
        let backend = Arc::new(HeadlessBackend::new());
        let server = MaterialServer::new(backend.clone(), MaterialSettings::default());
        (backend, server)
    }

    #[test]
    fn test_create_pushes_uniforms_and_defers_compile() {
        let (backend, server) = server();
        let material = server.create_material(MaterialSlot::new(1));

        assert!(backend.counters().param_writes > 0);
        assert_eq!(backend.counters().compiles, 0);
        assert_eq!(server.pending_count(), 1);
        assert!(material.is_dirty());
        assert_eq!(material.current_key(), ShaderKey::INVALID);

        let report = server.flush().expect("flush");
        assert_eq!(report.rebuilt, 1);
        assert_eq!(backend.counters().compiles, 1);
        assert_eq!(backend.bound(MaterialSlot::new(1)), material.bound_handle());
    }

    #[test]
    fn test_create_with_valid_config() {
        let (backend, server) = server();
        let slot = MaterialSlot::new(3);
        let config = ParticleConfig {
            emission_shape: EmissionShape::Sphere,
            sub_emitter_frequency: 10.0,
            ..ParticleConfig::default()
        };
        let material = server.create_material_with(slot, config.clone()).expect("valid");

        assert_eq!(material.config(), config);
        assert_eq!(
            backend.param(slot, "sub_emitter_frequency"),
            Some(ember_shader::UniformValue::Float(0.1))
        );
    }

    #[test]
    fn test_create_with_invalid_config_touches_nothing() {
        let (backend, server) = server();
        let mut inverted = ParticleConfig::default();
        inverted.param_min[Parameter::OrbitVelocity] = 1.0;
        inverted.param_max[Parameter::OrbitVelocity] = -1.0;
        let mut nan_range = ParticleConfig::default();
        nan_range.param_max[Parameter::Angle] = f32::NAN;

        let cases = [
            ParticleConfig {
                sub_emitter_frequency: 0.0,
                ..ParticleConfig::default()
            },
            ParticleConfig {
                sub_emitter_amount_at_end: u32::MAX,
                ..ParticleConfig::default()
            },
            inverted,
            nan_range,
        ];
        for config in cases {
            let err = server
                .create_material_with(MaterialSlot::new(7), config)
                .expect_err("invalid config");
            assert!(err.is_configuration());
        }

        assert_eq!(backend.counters().param_writes, 0);
        assert_eq!(backend.param(MaterialSlot::new(7), "sub_emitter_frequency"), None);
        assert_eq!(server.material_count(), 0);
        assert_eq!(server.pending_count(), 0);
    }

    #[test]
    fn test_create_with_reports_inverted_range() {
        let (_, server) = server();
        let mut config = ParticleConfig::default();
        config.param_min[Parameter::Damping] = 3.0;
        config.param_max[Parameter::Damping] = 2.0;

        let err = server
            .create_material_with(MaterialSlot::new(1), config)
            .expect_err("inverted");
        assert!(matches!(
            err,
            EmberError::Configuration(ConfigurationError::InvalidRange {
                parameter: "damping",
                ..
            })
        ));
    }

    fn stray_key() -> ShaderKey {
        compute_key(&ParticleConfig {
            emission_shape: EmissionShape::Box,
            ..ParticleConfig::default()
        })
    }

    #[test]
    #[should_panic(expected = "material state is inconsistent")]
    fn test_release_of_absent_key_halts_flush() {
        let (_, server) = server();
        let material = server.create_material(MaterialSlot::new(1));
        server.flush().expect("flush");

        server.shared.state.lock().bindings.insert(
            material.id(),
            Binding {
                key: stray_key(),
                handle: None,
            },
        );
        material
            .set_structural_property(StructuralProperty::EmissionShape(EmissionShape::Ring))
            .expect("valid");

        // Dropping `material` while unwinding takes the tolerant release path.
        let _ = server.flush();
    }

    #[test]
    fn test_drop_while_unwinding_tolerates_broken_binding() {
        let (backend, server) = server();
        let slot = MaterialSlot::new(2);
        let material = server.create_material(slot);
        server.flush().expect("flush");
        server.shared.state.lock().bindings.insert(
            material.id(),
            Binding {
                key: stray_key(),
                handle: None,
            },
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _material = material;
            panic!("edit loop failed");
        }));

        assert!(result.is_err());
        assert_eq!(server.material_count(), 0);
        assert_eq!(server.pending_count(), 0);
        assert_eq!(backend.bound(slot), None);
        // The variant the material actually held was never released.
        assert_eq!(server.variant_count(), 1);
    }

    #[test]
    fn test_redundant_edits_leave_cache_alone() {
        let (backend, server) = server();
        let material = server.create_material(MaterialSlot::new(1));
        server.flush().expect("flush");
        let stats = server.cache_stats();

        material
            .set_structural_property(StructuralProperty::EmissionShape(EmissionShape::Box))
            .expect("valid");
        material
            .set_structural_property(StructuralProperty::EmissionShape(EmissionShape::Point))
            .expect("valid");
        let report = server.flush().expect("flush");

        assert_eq!(report.unchanged, 1);
        assert_eq!(server.cache_stats(), stats);
        assert_eq!(backend.counters().compiles, 1);
    }

    #[test]
    fn test_material_config_lookup() {
        let (_, server) = server();
        let material = server.create_material(MaterialSlot::new(1));
        material
            .set_structural_property(StructuralProperty::EmissionShape(EmissionShape::Ring))
            .expect("valid");

        let config = server.material_config(material.id()).expect("live");
        assert_eq!(config.emission_shape, EmissionShape::Ring);

        let id = material.id();
        drop(material);
        let err = server.material_config(id).expect_err("destroyed");
        assert!(matches!(
            err,
            EmberError::Consistency(ConsistencyError::UnknownMaterial { .. })
        ));
    }

    #[test]
    fn test_empty_flush() {
        let (_, server) = server();
        assert_eq!(server.flush().expect("flush"), FlushReport::default());
    }

    #[test]
    fn test_drop_destroys_leftover_variants() {
        let (backend, server) = server();
        let key = compute_key(&ParticleConfig::default());
        {
            let mut state = server.shared.state.lock();
            let settings = server.settings().clone();
            state
                .cache
                .acquire(key, backend.as_ref(), &settings)
                .expect("compiles");
        }
        assert_eq!(backend.live_shaders(), 1);

        drop(server);
        assert_eq!(backend.live_shaders(), 0);
        assert_eq!(backend.counters().invalid_destroys, 0);
    }
}
