//! Particle material instances.

use std::sync::Arc;

use ember_common::{EmberResult, MaterialId, MaterialSlot, ShaderHandle, TextureId};
use ember_shader::{
    CollisionMode, EmissionShape, Parameter, ParticleConfig, ParticleFlag, ShaderKey,
    StructuralProperty, SubEmitterMode, UniformProperty, UniformUpdate,
};
use glam::{Vec3, Vec4};
use tracing::{trace, warn};

use crate::server::{consistency_violation, MaterialRecord, ServerShared};
use crate::settings::FlushPolicy;

/// One particle material, bound to a backend slot.
///
/// Structural edits are deferred to the server's next flush. Uniform edits are written
/// to the backend immediately and never wait on shader builds.
///
/// Dropping the material releases its shader variant and detaches its slot.
pub struct ParticleMaterial {
    shared: Arc<ServerShared>,
    id: MaterialId,
    record: Arc<MaterialRecord>,
}

impl std::fmt::Debug for ParticleMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleMaterial")
            .field("id", &self.id)
            .field("slot", &self.record.slot)
            .finish_non_exhaustive()
    }
}

impl ParticleMaterial {
    pub(crate) fn new(shared: Arc<ServerShared>, id: MaterialId, record: Arc<MaterialRecord>) -> Self {
        Self { shared, id, record }
    }

    /// Instance id.
    #[must_use]
    pub const fn id(&self) -> MaterialId {
        self.id
    }

    /// Backend slot this material is bound to.
    #[must_use]
    pub fn slot(&self) -> MaterialSlot {
        self.record.slot
    }

    /// Snapshot of the configuration.
    #[must_use]
    pub fn config(&self) -> ParticleConfig {
        self.record.config.read().clone()
    }

    /// Applies an edit that may change the shader and marks the material pending.
    ///
    /// Texture assignments are bound to the slot right away; the new shader is built by
    /// the next flush. A rejected edit leaves the material untouched.
    pub fn set_structural_property(&self, property: StructuralProperty) -> EmberResult<()> {
        {
            let mut config = self.record.config.write();
            let updates = config.apply_structural(property)?;
            self.write_params(&updates);
        }

        if self.shared.state.lock().scheduler.mark_dirty(self.id) {
            trace!("{} marked dirty by {property:?}", self.id);
        }
        Ok(())
    }

    /// Applies an edit that only changes shader inputs and writes it to the backend.
    ///
    /// Never schedules a rebuild and never waits on the variant cache. Parameter writes
    /// happen under the record lock, so concurrent edits reach the backend in the order
    /// they were applied.
    pub fn set_uniform_property(&self, property: UniformProperty) -> EmberResult<()> {
        let mut config = self.record.config.write();
        let updates = config.apply_uniform(property)?;
        self.write_params(&updates);
        Ok(())
    }

    fn write_params(&self, updates: &[UniformUpdate]) {
        let backend = self.shared.backend.as_ref();
        for update in updates {
            backend.set_param(self.record.slot, update.name, &update.value);
        }
    }

    // === Structural setters ===

    /// Sets the emission shape.
    pub fn set_emission_shape(&self, shape: EmissionShape) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::EmissionShape(shape))
    }

    /// Sets the emission shape from a raw index.
    pub fn set_emission_shape_index(&self, index: u32) -> EmberResult<()> {
        self.set_emission_shape(EmissionShape::try_from(index)?)
    }

    /// Sets a particle flag.
    pub fn set_particle_flag(&self, flag: ParticleFlag, enabled: bool) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::ParticleFlag(flag, enabled))
    }

    /// Turns turbulence on or off.
    pub fn set_turbulence_enabled(&self, enabled: bool) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::TurbulenceEnabled(enabled))
    }

    /// Sets the collision response.
    pub fn set_collision_mode(&self, mode: CollisionMode) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::CollisionMode(mode))
    }

    /// Sets the sub-emitter trigger.
    pub fn set_sub_emitter_mode(&self, mode: SubEmitterMode) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::SubEmitterMode(mode))
    }

    /// Assigns or clears the lifetime curve of a parameter.
    pub fn set_param_texture(&self, param: Parameter, texture: Option<TextureId>) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::ParamTexture(param, texture))
    }

    /// Assigns or clears the color ramp.
    pub fn set_color_ramp(&self, texture: Option<TextureId>) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::ColorRamp(texture))
    }

    /// Assigns or clears the random start color ramp.
    pub fn set_color_initial_ramp(&self, texture: Option<TextureId>) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::ColorInitialRamp(texture))
    }

    /// Assigns or clears the per-point color texture.
    pub fn set_emission_color_texture(&self, texture: Option<TextureId>) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::EmissionColorTexture(texture))
    }

    /// Scales collision with particle scale.
    pub fn set_collision_use_scale(&self, enabled: bool) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::CollisionUseScale(enabled))
    }

    /// Turns attractor forces on or off.
    pub fn set_attractor_interaction(&self, enabled: bool) -> EmberResult<()> {
        self.set_structural_property(StructuralProperty::AttractorInteraction(enabled))
    }

    // === Uniform setters ===

    /// Sets the emission direction.
    pub fn set_direction(&self, direction: Vec3) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::Direction(direction))
    }

    /// Sets the spread angle in degrees.
    pub fn set_spread(&self, degrees: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::Spread(degrees))
    }

    /// Sets both bounds of a randomised parameter in one edit.
    ///
    /// An inverted range is rejected rather than dragged.
    pub fn set_param_range(&self, param: Parameter, min: f32, max: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::ParamRange(param, min, max))
    }

    /// Sets the lower bound of a randomised parameter, raising the upper bound if needed.
    pub fn set_param_min(&self, param: Parameter, value: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::ParamMin(param, value))
    }

    /// Sets the upper bound of a randomised parameter, lowering the lower bound if needed.
    pub fn set_param_max(&self, param: Parameter, value: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::ParamMax(param, value))
    }

    /// Sets the base color.
    pub fn set_color(&self, color: Vec4) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::Color(color))
    }

    /// Sets the constant acceleration.
    pub fn set_gravity(&self, gravity: Vec3) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::Gravity(gravity))
    }

    /// Sets the sphere emission radius.
    pub fn set_emission_sphere_radius(&self, radius: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::EmissionSphereRadius(radius))
    }

    /// Sets the box emission half extents.
    pub fn set_emission_box_extents(&self, extents: Vec3) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::EmissionBoxExtents(extents))
    }

    /// Sets the number of valid points in the emission textures.
    pub fn set_emission_point_count(&self, count: u32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::EmissionPointCount(count))
    }

    /// Sets the ring emitter axis.
    pub fn set_emission_ring_axis(&self, axis: Vec3) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::EmissionRingAxis(axis))
    }

    /// Sets the turbulence noise strength.
    pub fn set_turbulence_noise_strength(&self, strength: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::TurbulenceNoiseStrength(strength))
    }

    /// Sets the lifetime randomness ratio.
    pub fn set_lifetime_randomness(&self, randomness: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::LifetimeRandomness(randomness))
    }

    /// Sets rigid collision bounce.
    pub fn set_collision_bounce(&self, bounce: f32) -> EmberResult<()> {
        self.set_uniform_property(UniformProperty::CollisionBounce(bounce))
    }

    // === Binding state ===

    /// Key of the variant currently bound; [`ShaderKey::INVALID`] before the first
    /// successful flush or after a compile failure.
    #[must_use]
    pub fn current_key(&self) -> ShaderKey {
        self.shared
            .state
            .lock()
            .bindings
            .get(&self.id)
            .map_or(ShaderKey::INVALID, |binding| binding.key)
    }

    /// Whether a structural edit is waiting for a flush.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.state.lock().scheduler.is_pending(self.id)
    }

    /// Compiled shader bound to this material, if any.
    ///
    /// With [`FlushPolicy::OnRead`], a pending material triggers a flush first.
    #[must_use]
    pub fn bound_handle(&self) -> Option<ShaderHandle> {
        if self.shared.settings.flush_policy == FlushPolicy::OnRead && self.is_dirty() {
            if let Err(e) = self.shared.flush() {
                warn!("Flush on read of {} failed: {e}", self.id);
            }
        }

        self.shared
            .state
            .lock()
            .bindings
            .get(&self.id)
            .and_then(|binding| binding.handle)
    }
}

impl Drop for ParticleMaterial {
    fn drop(&mut self) {
        let backend = self.shared.backend.as_ref();
        let mut state = self.shared.state.lock();

        state.scheduler.cancel(self.id);
        let binding = state.bindings.remove(&self.id).unwrap_or_default();
        if binding.key.is_valid() {
            if let Err(err) = state.cache.release(binding.key, backend) {
                if std::thread::panicking() {
                    warn!("Release during unwind failed: {err}");
                } else {
                    consistency_violation(&err);
                }
            }
        }
        backend.bind(self.record.slot, None);
        self.shared.materials.write().remove(&self.id);
        drop(state);

        trace!("Destroyed {}", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::server::MaterialServer;
    use crate::settings::MaterialSettings;
    use ember_common::{ConfigurationError, EmberError};
    use ember_shader::{compute_key, properties::names, UniformValue};

    fn server_with(policy: FlushPolicy) -> (Arc<HeadlessBackend>, MaterialServer) {
        let backend = Arc::new(HeadlessBackend::new());
        let settings = MaterialSettings {
            flush_policy: policy,
            ..MaterialSettings::default()
        };
        let server = MaterialServer::new(backend.clone(), settings);
        (backend, server)
    }

    #[test]
    fn test_structural_edit_marks_dirty() {
        let (_, server) = server_with(FlushPolicy::Manual);
        let material = server.create_material(MaterialSlot::new(1));
        server.flush().expect("flush");
        assert!(!material.is_dirty());

        material.set_turbulence_enabled(true).expect("valid");
        assert!(material.is_dirty());
        assert!(material.config().turbulence_enabled);
    }

    #[test]
    fn test_uniform_edit_reaches_backend() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let slot = MaterialSlot::new(2);
        let material = server.create_material(slot);
        server.flush().expect("flush");

        material.set_spread(12.5).expect("valid");
        assert_eq!(backend.param(slot, names::SPREAD), Some(UniformValue::Float(12.5)));
        assert!(!material.is_dirty());
    }

    #[test]
    fn test_rejected_edits_leave_material_untouched() {
        let (_, server) = server_with(FlushPolicy::Manual);
        let material = server.create_material(MaterialSlot::new(1));
        server.flush().expect("flush");
        let before = material.config();

        let err = material.set_emission_shape_index(42).expect_err("unknown shape");
        assert!(err.is_configuration());
        assert!(material.set_spread(f32::INFINITY).is_err());
        let err = material
            .set_param_range(Parameter::Damping, 2.0, 1.0)
            .expect_err("inverted");
        assert!(matches!(
            err,
            EmberError::Configuration(ConfigurationError::InvalidRange {
                parameter: "damping",
                ..
            })
        ));
        assert!(material
            .set_param_range(Parameter::Damping, 0.0, f32::NAN)
            .is_err());

        assert_eq!(material.config(), before);
        assert!(!material.is_dirty());
    }

    #[test]
    fn test_param_range() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let slot = MaterialSlot::new(1);
        let material = server.create_material(slot);

        material
            .set_param_range(Parameter::InitialLinearVelocity, 2.0, 4.0)
            .expect("valid");
        let config = material.config();
        assert!((config.param_min[Parameter::InitialLinearVelocity] - 2.0).abs() < f32::EPSILON);
        assert!((config.param_max[Parameter::InitialLinearVelocity] - 4.0).abs() < f32::EPSILON);
        assert_eq!(
            backend.param(slot, "initial_linear_velocity_max"),
            Some(UniformValue::Float(4.0))
        );
    }

    #[test]
    fn test_concurrent_ranges_stay_whole() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let slot = MaterialSlot::new(1);
        let material = server.create_material(slot);
        let pairs = [(0.0, 1.0), (5.0, 6.0)];
        let read_range = |config: &ParticleConfig| {
            (
                config.param_min[Parameter::Damping],
                config.param_max[Parameter::Damping],
            )
        };

        std::thread::scope(|scope| {
            for (min, max) in pairs {
                let material = &material;
                scope.spawn(move || {
                    for _ in 0..500 {
                        material
                            .set_param_range(Parameter::Damping, min, max)
                            .expect("valid");
                        let range = read_range(&material.config());
                        assert!(pairs.contains(&range), "torn range {range:?}");
                    }
                });
            }
        });

        let (min, max) = read_range(&material.config());
        assert_eq!(backend.param(slot, "damping_min"), Some(UniformValue::Float(min)));
        assert_eq!(backend.param(slot, "damping_max"), Some(UniformValue::Float(max)));
    }

    #[test]
    fn test_typed_setters_cover_remaining_structural_properties() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let slot = MaterialSlot::new(4);
        let material = server.create_material(slot);
        server.flush().expect("flush");
        let initial_key = material.current_key();

        material.set_color_initial_ramp(Some(TextureId::new(11))).expect("valid");
        material.set_emission_color_texture(Some(TextureId::new(12))).expect("valid");
        material.set_collision_use_scale(true).expect("valid");
        material.set_attractor_interaction(false).expect("valid");

        let config = material.config();
        assert_eq!(config.color_initial_ramp, Some(TextureId::new(11)));
        assert_eq!(config.emission_color_texture, Some(TextureId::new(12)));
        assert!(config.collision_use_scale);
        assert!(!config.attractor_interaction_enabled);
        assert_eq!(
            backend.param(slot, names::COLOR_INITIAL_RAMP),
            Some(UniformValue::Texture(Some(TextureId::new(11))))
        );
        assert_eq!(
            backend.param(slot, names::EMISSION_TEXTURE_COLOR),
            Some(UniformValue::Texture(Some(TextureId::new(12))))
        );

        assert!(material.is_dirty());
        server.flush().expect("flush");
        assert_eq!(material.current_key(), compute_key(&config));
        assert_ne!(material.current_key(), initial_key);
    }

    #[test]
    fn test_typed_uniform_setters_validate() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let slot = MaterialSlot::new(6);
        let material = server.create_material(slot);

        material.set_emission_point_count(64).expect("valid");
        material.set_collision_bounce(0.5).expect("valid");
        material.set_lifetime_randomness(0.25).expect("valid");
        assert_eq!(
            backend.param(slot, names::EMISSION_TEXTURE_POINT_COUNT),
            Some(UniformValue::Int(64))
        );

        assert!(material.set_emission_ring_axis(Vec3::ZERO).is_err());
        assert!(material.set_turbulence_noise_strength(25.0).is_err());
        assert!(material.set_emission_box_extents(Vec3::splat(f32::NAN)).is_err());
        assert!(material.set_param_min(Parameter::TurbInfluenceOverLife, 1.0).is_err());
        assert_eq!(material.config().emission_ring_axis, Vec3::Z);
    }

    #[test]
    fn test_on_read_policy_flushes() {
        let (backend, server) = server_with(FlushPolicy::OnRead);
        let material = server.create_material(MaterialSlot::new(1));

        let handle = material.bound_handle().expect("flushed on read");
        assert_eq!(backend.counters().compiles, 1);
        assert_eq!(material.current_key(), compute_key(&material.config()));
        assert_eq!(backend.bound(material.slot()), Some(handle));
    }

    #[test]
    fn test_manual_policy_does_not_flush_on_read() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let material = server.create_material(MaterialSlot::new(1));

        assert!(material.bound_handle().is_none());
        assert_eq!(backend.counters().compiles, 0);
    }

    #[test]
    fn test_drop_cancels_pending_and_detaches() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        let slot = MaterialSlot::new(5);
        let material = server.create_material(slot);
        server.flush().expect("flush");
        material.set_emission_shape(EmissionShape::Box).expect("valid");
        assert_eq!(server.pending_count(), 1);

        drop(material);
        assert_eq!(server.pending_count(), 0);
        assert_eq!(server.material_count(), 0);
        assert_eq!(server.variant_count(), 0);
        assert_eq!(backend.bound(slot), None);

        let report = server.flush().expect("flush");
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn test_compile_failure_leaves_no_handle() {
        let (backend, server) = server_with(FlushPolicy::Manual);
        backend.reject_sources_containing("shader_type");
        let material = server.create_material(MaterialSlot::new(1));

        let err = server.flush().expect_err("rejected");
        match err {
            EmberError::FlushFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].material, material.id());
            },
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(material.current_key(), ShaderKey::INVALID);
        assert!(material.bound_handle().is_none());
        assert!(!material.is_dirty());
    }
}
