//! Scenario tests for the material system.
//!
//! These drive a [`MaterialServer`] on a [`HeadlessBackend`] the way a host engine
//! would: create materials, edit them, flush once per tick and inspect what the
//! backend saw.

#![cfg(test)]

use std::sync::Arc;

use ember_common::{EmberError, MaterialSlot};
use ember_shader::{
    compute_key, properties::names, CollisionMode, EmissionShape, Parameter, ParticleConfig,
    ParticleFlag, UniformProperty, UniformValue,
};
use glam::Vec3;

use crate::backend::HeadlessBackend;
use crate::server::MaterialServer;
use crate::settings::MaterialSettings;

fn headless_server() -> (Arc<HeadlessBackend>, MaterialServer) {
    let backend = Arc::new(HeadlessBackend::new());
    let server = MaterialServer::new(backend.clone(), MaterialSettings::default());
    (backend, server)
}

/// Sphere emission with turbulence toggled on afterwards
mod sphere_tests {
    use super::*;

    #[test]
    fn e2e_sphere_then_turbulence() {
        let (backend, server) = headless_server();
        let material = server.create_material(MaterialSlot::new(1));
        material.set_emission_shape(EmissionShape::Sphere).expect("valid");
        server.flush().expect("flush");

        let first_key = material.current_key();
        let first = material.bound_handle().expect("bound");
        let text = backend.source(first).expect("live source");
        assert!(text.contains("emission_sphere_radius"));
        assert!(!text.contains("turbulence"));
        assert!(!text.contains("collision_"));

        material.set_turbulence_enabled(true).expect("valid");
        let report = server.flush().expect("flush");
        assert_eq!(report.rebuilt, 1);

        let second = material.bound_handle().expect("bound");
        assert_ne!(material.current_key(), first_key);
        assert_eq!(server.ref_count(first_key), 0, "unshared variant should be destroyed");
        assert!(backend.source(first).is_none());

        let text = backend.source(second).expect("live source");
        assert!(text.contains("uniform float turbulence_noise_strength"));
        assert!(text.contains("vec3 curl_3d(vec3 p, float c)"));

        let counters = backend.counters();
        assert_eq!(counters.compiles, 2);
        assert_eq!(counters.destroys, 1);
    }

    #[test]
    fn e2e_turbulence_on_shared_variant_keeps_it_alive() {
        let (backend, server) = headless_server();
        let a = server.create_material(MaterialSlot::new(1));
        let b = server.create_material(MaterialSlot::new(2));
        server.flush().expect("flush");
        let shared_key = a.current_key();
        assert_eq!(server.ref_count(shared_key), 2);

        a.set_turbulence_enabled(true).expect("valid");
        server.flush().expect("flush");

        assert_eq!(server.ref_count(shared_key), 1);
        assert_eq!(b.current_key(), shared_key);
        assert_eq!(backend.counters().destroys, 0);
        assert_eq!(server.variant_count(), 2);
    }
}

/// Rigid collision guarding the turbulence blend
mod collision_tests {
    use super::*;

    #[test]
    fn e2e_rigid_collision_guards_turbulence() {
        let (backend, server) = headless_server();
        let material = server.create_material(MaterialSlot::new(1));
        material.set_collision_mode(CollisionMode::Rigid).expect("valid");
        server.flush().expect("flush");

        let handle = material.bound_handle().expect("bound");
        let text = backend.source(handle).expect("live source");
        assert!(text.contains("uniform float collision_friction"));
        assert!(text.contains("uniform float collision_bounce"));
        assert!(!text.contains("if (!COLLIDED)"));

        material.set_turbulence_enabled(true).expect("valid");
        server.flush().expect("flush");
        let handle = material.bound_handle().expect("bound");
        let text = backend.source(handle).expect("live source");
        assert!(text.contains("if (!COLLIDED) {"));
    }

    #[test]
    fn e2e_hide_on_contact_has_no_guard() {
        let (backend, server) = headless_server();
        let material = server.create_material(MaterialSlot::new(1));
        material
            .set_collision_mode(CollisionMode::HideOnContact)
            .expect("valid");
        material.set_turbulence_enabled(true).expect("valid");
        server.flush().expect("flush");

        let handle = material.bound_handle().expect("bound");
        let text = backend.source(handle).expect("live source");
        assert!(!text.contains("if (!COLLIDED)"));
        assert!(!text.contains("collision_friction"));
    }
}

/// Sharing and reference counting across instances
mod sharing_tests {
    use super::*;

    #[test]
    fn e2e_instances_share_one_compile() {
        let (backend, server) = headless_server();
        let materials: Vec<_> = (0..8)
            .map(|i| server.create_material(MaterialSlot::new(i)))
            .collect();
        for (i, material) in materials.iter().enumerate() {
            // uniform differences do not split the variant
            material.set_spread(i as f32).expect("valid");
            material.set_emission_shape(EmissionShape::Box).expect("valid");
        }
        server.flush().expect("flush");

        let key = materials[0].current_key();
        assert!(materials.iter().all(|m| m.current_key() == key));
        assert_eq!(server.ref_count(key), 8);
        assert_eq!(backend.counters().compiles, 1);

        // release out of creation order
        let mut materials = materials;
        while let Some(material) = materials.pop() {
            let remaining = materials.len() as u32;
            drop(material);
            assert_eq!(server.ref_count(key), remaining);
            assert_eq!(backend.counters().destroys, u64::from(remaining == 0));
        }
        assert_eq!(backend.live_shaders(), 0);
    }

    #[test]
    fn e2e_destroy_with_refcount_one_and_two() {
        let (backend, server) = headless_server();
        let lone = server.create_material(MaterialSlot::new(1));
        lone.set_emission_shape(EmissionShape::Ring).expect("valid");
        let a = server.create_material(MaterialSlot::new(2));
        let b = server.create_material(MaterialSlot::new(3));
        server.flush().expect("flush");

        let lone_key = lone.current_key();
        let shared_key = a.current_key();
        assert_eq!(server.ref_count(lone_key), 1);
        assert_eq!(server.ref_count(shared_key), 2);

        drop(lone);
        assert_eq!(server.ref_count(lone_key), 0);
        assert_eq!(backend.counters().destroys, 1);

        drop(a);
        assert_eq!(server.ref_count(shared_key), 1);
        assert_eq!(backend.counters().destroys, 1);
        assert!(b.bound_handle().is_some());
    }
}

/// Batching of structural edits
mod batching_tests {
    use super::*;

    #[test]
    fn e2e_repeated_marks_processed_once() {
        let (backend, server) = headless_server();
        let material = server.create_material(MaterialSlot::new(1));
        server.flush().expect("flush");
        let stats = server.cache_stats();

        material.set_emission_shape(EmissionShape::Box).expect("valid");
        material.set_particle_flag(ParticleFlag::AlignYToVelocity, true).expect("valid");
        material.set_param_texture(Parameter::Scale, Some(ember_common::TextureId::new(3)))
            .expect("valid");
        material.set_emission_shape(EmissionShape::Sphere).expect("valid");
        assert_eq!(server.pending_count(), 1);

        let report = server.flush().expect("flush");
        assert_eq!(report.processed, 1);
        assert_eq!(report.rebuilt, 1);

        let after = server.cache_stats();
        assert_eq!(after.acquires - stats.acquires, 1);
        assert_eq!(after.releases - stats.releases, 1);
        assert_eq!(backend.counters().compiles, 2);
        assert_eq!(material.current_key(), compute_key(&material.config()));
    }

    #[test]
    fn e2e_uniform_edits_bypass_cache() {
        let (backend, server) = headless_server();
        let slot = MaterialSlot::new(1);
        let material = server.create_material(slot);
        server.flush().expect("flush");
        let stats = server.cache_stats();
        let compiles = backend.counters().compiles;

        for property in [
            UniformProperty::Spread(30.0),
            UniformProperty::Gravity(Vec3::ZERO),
            UniformProperty::ParamMax(Parameter::Damping, 2.0),
            UniformProperty::EmissionSphereRadius(4.0),
            UniformProperty::TurbulenceNoiseStrength(3.0),
        ] {
            material.set_uniform_property(property).expect("valid");
            assert!(!material.is_dirty());
        }

        assert_eq!(server.pending_count(), 0);
        assert_eq!(server.cache_stats(), stats);
        assert_eq!(backend.counters().compiles, compiles);
        assert_eq!(
            backend.param(slot, names::EMISSION_SPHERE_RADIUS),
            Some(UniformValue::Float(4.0))
        );
        assert_eq!(
            backend.param(slot, names::GRAVITY),
            Some(UniformValue::Vec3(Vec3::new(0.0, -0.000_001, 0.0)))
        );
    }

    #[test]
    fn e2e_edits_netting_to_no_change() {
        let (backend, server) = headless_server();
        let material = server.create_material(MaterialSlot::new(1));
        server.flush().expect("flush");

        material.set_turbulence_enabled(true).expect("valid");
        material.set_turbulence_enabled(false).expect("valid");
        let report = server.flush().expect("flush");

        assert_eq!(report.unchanged, 1);
        assert_eq!(backend.counters().compiles, 1);
        assert_eq!(backend.counters().destroys, 0);
    }
}

/// Compile failures reported by the backend
mod failure_tests {
    use super::*;

    #[test]
    fn e2e_compile_failure_is_reported_and_not_retried() {
        let (backend, server) = headless_server();
        let healthy = server.create_material(MaterialSlot::new(1));
        let broken = server.create_material(MaterialSlot::new(2));
        server.flush().expect("flush");
        let old_key = broken.current_key();
        assert_eq!(server.ref_count(old_key), 2);

        backend.reject_sources_containing("emission_box_extents");
        broken.set_emission_shape(EmissionShape::Box).expect("valid");
        let err = server.flush().expect_err("box rejected");
        assert!(err.is_compile());
        match &err {
            EmberError::FlushFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].material, broken.id());
            },
            other => panic!("unexpected error {other}"),
        }

        // the old variant stays released and the slot is detached
        assert_eq!(server.ref_count(old_key), 1);
        assert!(broken.bound_handle().is_none());
        assert_eq!(backend.bound(broken.slot()), None);
        assert!(healthy.bound_handle().is_some());

        // nothing pending, so a second flush does not retry
        let rejected = backend.counters().rejected;
        assert_eq!(server.flush().expect("flush").processed, 0);
        assert_eq!(backend.counters().rejected, rejected);

        // re-marking after the rejection is lifted recovers the instance
        backend.clear_rejections();
        broken.set_emission_shape(EmissionShape::Box).expect("valid");
        server.flush().expect("flush");
        assert!(broken.bound_handle().is_some());
    }

    #[test]
    fn e2e_failure_does_not_stop_the_drain() {
        let (backend, server) = headless_server();
        backend.reject_sources_containing("emission_ring_axis");
        let ring = server.create_material_with(
            MaterialSlot::new(1),
            ParticleConfig {
                emission_shape: EmissionShape::Ring,
                ..ParticleConfig::default()
            },
        )
        .expect("valid config");
        let point = server.create_material(MaterialSlot::new(2));

        let err = server.flush().expect_err("ring rejected");
        assert!(matches!(err, EmberError::FlushFailed { ref failures } if failures.len() == 1));
        assert!(ring.bound_handle().is_none());
        assert!(point.bound_handle().is_some());
        assert_eq!(server.pending_count(), 0);
    }
}

/// Concurrent edits and flushes
mod concurrency_tests {
    use super::*;

    const SHAPES: [EmissionShape; 4] = [
        EmissionShape::Point,
        EmissionShape::Sphere,
        EmissionShape::Box,
        EmissionShape::Ring,
    ];

    #[test]
    fn e2e_threads_edit_while_owner_flushes() {
        let (backend, server) = headless_server();

        let materials: Vec<_> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4u64)
                .map(|worker| {
                    let server = server.clone();
                    scope.spawn(move || {
                        let mut owned = Vec::new();
                        for i in 0..16u64 {
                            let material = server.create_material(MaterialSlot::new(worker * 100 + i));
                            let shape = SHAPES[((worker + i) % 4) as usize];
                            material.set_emission_shape(shape).expect("valid");
                            material.set_spread((i % 90) as f32).expect("valid");
                            if i % 3 == 0 {
                                material.set_turbulence_enabled(true).expect("valid");
                            }
                            owned.push(material);
                        }
                        owned
                    })
                })
                .collect();

            for _ in 0..8 {
                server.flush().expect("flush");
                std::thread::yield_now();
            }

            workers
                .into_iter()
                .flat_map(|worker| worker.join().expect("worker panicked"))
                .collect()
        });

        server.flush().expect("flush");
        assert_eq!(server.pending_count(), 0);
        assert_eq!(server.material_count(), 64);

        let mut total = 0;
        let mut keys: Vec<_> = materials.iter().map(|m| m.current_key()).collect();
        for material in &materials {
            assert_eq!(material.current_key(), compute_key(&material.config()));
        }
        keys.sort_by_key(|key| key.raw());
        keys.dedup();
        for key in &keys {
            total += server.ref_count(*key);
        }
        assert_eq!(total, 64);
        assert_eq!(server.variant_count(), keys.len());
        assert_eq!(backend.live_shaders(), keys.len());

        drop(materials);
        assert_eq!(server.variant_count(), 0);
        assert_eq!(backend.live_shaders(), 0);
        assert_eq!(backend.counters().invalid_destroys, 0);
    }
}
