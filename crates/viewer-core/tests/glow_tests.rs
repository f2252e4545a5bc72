// Host-side tests for the glow engine: idempotence, round-trips, mode
// switching, live parameter updates, and pulse behavior.

use std::sync::Arc;

use viewer_core::{
    hsl_to_rgb, BloomLayer, Geometry, GlowEngine, GlowMode, GlowParamsUpdate, GlowSettings,
    Material, MeshId, Scene,
};

fn triangle_geometry() -> Arc<Geometry> {
    Arc::new(Geometry {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        indices: vec![0, 1, 2],
    })
}

/// Two glow targets (by name) and one bystander.
fn house_scene() -> (Scene, MeshId, MeshId, MeshId) {
    let mut scene = Scene::new();
    let eye = scene.add_mesh("Eye_L", triangle_geometry(), Material::default());
    let lamp = scene.add_mesh("PorchLamp", triangle_geometry(), Material::default());
    let wall = scene.add_mesh("Wall", triangle_geometry(), Material::default());
    (scene, eye, lamp, wall)
}

fn emissive_engine() -> GlowEngine {
    let mut engine = GlowEngine::new();
    engine.set_mode(GlowMode::Emissive);
    engine
}

#[test]
fn apply_selects_by_name_and_tags_layer() {
    let (mut scene, eye, lamp, wall) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();

    engine.apply(&mut scene, &mut layer);

    assert_eq!(engine.target_count(), 2);
    assert!(layer.contains(eye));
    assert!(layer.contains(lamp));
    assert!(!layer.contains(wall));
    let eye_material = scene.get(eye).unwrap().primary_material().unwrap();
    assert_eq!(eye_material.emissive, hsl_to_rgb(0.6, 1.0, 0.3));
    assert!((eye_material.emissive_intensity - 0.2).abs() < 1e-6);
    let wall_material = scene.get(wall).unwrap().primary_material().unwrap();
    assert_eq!(*wall_material, Material::default());
}

#[test]
fn apply_twice_is_idempotent() {
    let (mut scene, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();

    engine.apply(&mut scene, &mut layer);
    engine.apply(&mut scene, &mut layer);

    assert_eq!(engine.target_count(), 2);
    assert_eq!(engine.saved_original_count(), 2);
    assert_eq!(scene.len(), 3, "no meshes gained or lost");
    assert_eq!(layer.len(), 2);

    // The re-saved originals are the true pre-glow materials, not the
    // glowing ones from the first application.
    engine.clear(&mut scene, &mut layer);
    for node in scene.iter() {
        assert_eq!(*node.primary_material().unwrap(), Material::default());
    }
}

#[test]
fn clear_round_trips_materials_and_layer() {
    let (mut scene, eye, lamp, wall) = house_scene();
    let before: Vec<Material> = scene
        .iter()
        .map(|n| n.primary_material().unwrap().clone())
        .collect();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();

    engine.apply(&mut scene, &mut layer);
    engine.clear(&mut scene, &mut layer);

    let after: Vec<Material> = scene
        .iter()
        .map(|n| n.primary_material().unwrap().clone())
        .collect();
    assert_eq!(before, after);
    assert_eq!(engine.saved_original_count(), 0);
    for id in [eye, lamp, wall] {
        assert!(!layer.contains(id));
    }
    assert!(layer.is_empty());
}

#[test]
fn separate_mode_builds_one_shell_per_target() {
    let (mut scene, eye, lamp, wall) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = GlowEngine::new();
    assert_eq!(engine.mode(), GlowMode::Separate);

    engine.apply(&mut scene, &mut layer);

    assert_eq!(engine.shell_ids().len(), 2);
    assert_eq!(scene.len(), 5);
    // Source materials are untouched in separate mode.
    for id in [eye, lamp, wall] {
        assert_eq!(
            *scene.get(id).unwrap().primary_material().unwrap(),
            Material::default()
        );
    }
    for &shell_id in engine.shell_ids() {
        let shell = scene.get(shell_id).unwrap();
        let material = shell.primary_material().unwrap();
        assert!(material.backside);
        assert!(material.transparent);
        assert!(material.unlit);
        assert_eq!(material.base_color, hsl_to_rgb(0.6, 1.0, 0.5));
        assert!(layer.contains(shell_id));
    }
}

#[test]
fn shells_share_source_geometry() {
    let (mut scene, eye, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = GlowEngine::new();

    engine.apply(&mut scene, &mut layer);

    let source_geometry = Arc::clone(&scene.get(eye).unwrap().geometry);
    let shared = engine
        .shell_ids()
        .iter()
        .any(|&id| Arc::ptr_eq(&scene.get(id).unwrap().geometry, &source_geometry));
    assert!(shared, "some shell must borrow the eye geometry");
}

#[test]
fn mode_switch_swaps_strategy_cleanly() {
    let (mut scene, ..) = house_scene();
    let original_len = scene.len();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();

    engine.apply(&mut scene, &mut layer);
    engine.set_mode(GlowMode::Separate);
    engine.apply(&mut scene, &mut layer);

    // No emissive mutations remain, exactly one shell per target exists.
    assert_eq!(engine.emissive_target_ids().len(), 0);
    assert_eq!(engine.saved_original_count(), 0);
    assert_eq!(engine.shell_ids().len(), 2);
    for id in scene.mesh_ids() {
        if engine.shell_ids().contains(&id) {
            continue;
        }
        assert_eq!(
            *scene.get(id).unwrap().primary_material().unwrap(),
            Material::default()
        );
    }

    engine.set_mode(GlowMode::Emissive);
    engine.apply(&mut scene, &mut layer);
    assert_eq!(engine.shell_ids().len(), 0);
    assert_eq!(scene.len(), original_len);
    assert_eq!(engine.emissive_target_ids().len(), 2);
}

#[test]
fn clear_after_unapplied_mode_switch_does_not_leak() {
    let (mut scene, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();

    engine.apply(&mut scene, &mut layer);
    // Switch without re-applying, then clear: saved originals must still be
    // restored even though the current mode is no longer Emissive.
    engine.set_mode(GlowMode::Separate);
    engine.clear(&mut scene, &mut layer);

    assert_eq!(engine.saved_original_count(), 0);
    for node in scene.iter() {
        assert_eq!(*node.primary_material().unwrap(), Material::default());
    }
    assert!(layer.is_empty());
}

#[test]
fn update_params_recolors_live_targets_in_place() {
    let (mut scene, eye, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();
    engine.apply(&mut scene, &mut layer);

    engine.update_params(
        &mut scene,
        GlowParamsUpdate {
            intensity: Some(4.0),
            hue: Some(0.1),
        },
    );

    let material = scene.get(eye).unwrap().primary_material().unwrap();
    assert_eq!(material.emissive, hsl_to_rgb(0.1, 1.0, 0.3));
    assert!((material.emissive_intensity - 0.4).abs() < 1e-6);
    // The saved originals are untouched by parameter updates.
    assert_eq!(engine.saved_original_count(), 2);
    engine.clear(&mut scene, &mut layer);
    assert_eq!(
        *scene.get(eye).unwrap().primary_material().unwrap(),
        Material::default()
    );
}

#[test]
fn hue_wraps_into_unit_range() {
    let (mut scene, ..) = house_scene();
    let mut engine = GlowEngine::new();
    engine.update_params(
        &mut scene,
        GlowParamsUpdate {
            hue: Some(1.35),
            ..GlowParamsUpdate::default()
        },
    );
    assert!((engine.params().hue - 0.35).abs() < 1e-6);
}

#[test]
fn pulse_stays_within_bounds_over_a_full_period() {
    let (mut scene, eye, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();
    engine.apply(&mut scene, &mut layer);
    engine.set_pulse_enabled(&mut scene, true);

    // Defaults: intensity 2.0, pulse intensity 1.0, pulse speed 2.0.
    // Modulated intensity must stay within [1.0, 3.0] across a period.
    let period = std::f64::consts::PI;
    let mut seen_min = f32::INFINITY;
    let mut seen_max = f32::NEG_INFINITY;
    for step in 0..=100 {
        let t = period * step as f64 / 100.0;
        engine.update(&mut scene, t);
        let material = scene.get(eye).unwrap().primary_material().unwrap();
        let modulated = material.emissive_intensity / 0.15;
        assert!(
            (1.0 - 1e-3..=3.0 + 1e-3).contains(&modulated),
            "modulated intensity {modulated} out of bounds at t={t}"
        );
        seen_min = seen_min.min(modulated);
        seen_max = seen_max.max(modulated);
    }
    assert!(seen_min <= 1.01, "minimum of the period not reached");
    assert!(seen_max >= 2.99, "maximum of the period not reached");
}

#[test]
fn disabling_pulse_restores_base_values() {
    let (mut scene, eye, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();
    engine.apply(&mut scene, &mut layer);

    engine.set_pulse_enabled(&mut scene, true);
    engine.update(&mut scene, 0.785); // mid-pulse
    engine.set_pulse_enabled(&mut scene, false);

    let material = scene.get(eye).unwrap().primary_material().unwrap();
    assert_eq!(material.emissive, hsl_to_rgb(0.6, 1.0, 0.3));
    assert!((material.emissive_intensity - 0.2).abs() < 1e-6);

    // Further updates are no-ops while disabled.
    engine.update(&mut scene, 3.0);
    let material = scene.get(eye).unwrap().primary_material().unwrap();
    assert!((material.emissive_intensity - 0.2).abs() < 1e-6);
}

#[test]
fn pulse_modulates_shell_opacity_in_separate_mode() {
    let (mut scene, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = GlowEngine::new();
    engine.apply(&mut scene, &mut layer);
    engine.set_pulse_enabled(&mut scene, true);

    engine.update(&mut scene, 0.0);
    for &id in engine.shell_ids() {
        let material = scene.get(id).unwrap().primary_material().unwrap();
        // intensity' = 2.0 * (0.5 + 0 * 1.0)... at t=0 sin=0 so pulse=0.5,
        // intensity' = 2.0, opacity = 0.4 + 2.0 * 0.2 = 0.8
        assert!((material.opacity - 0.8).abs() < 1e-5);
    }
}

#[test]
fn empty_geometry_shell_is_skipped_without_aborting() {
    let mut scene = Scene::new();
    let broken = scene.add_mesh("GlowOrbBroken", Arc::new(Geometry::default()), Material::default());
    let good = scene.add_mesh("GlowOrb", triangle_geometry(), Material::default());
    let mut layer = BloomLayer::new();
    let mut engine = GlowEngine::new();

    engine.apply(&mut scene, &mut layer);

    // Only the healthy mesh received a shell; the broken one was skipped.
    assert_eq!(engine.shell_ids().len(), 1);
    let shell = scene.get(engine.shell_ids()[0]).unwrap();
    assert!(Arc::ptr_eq(&shell.geometry, &scene.get(good).unwrap().geometry));
    assert!(!layer.contains(broken));
}

#[test]
fn settings_update_changes_selection_on_next_apply() {
    let (mut scene, ..) = house_scene();
    let mut layer = BloomLayer::new();
    let mut engine = emissive_engine();

    engine.apply(&mut scene, &mut layer);
    assert_eq!(engine.target_count(), 2);

    engine.set_settings(GlowSettings {
        force_all: true,
        ..GlowSettings::default()
    });
    engine.apply(&mut scene, &mut layer);
    assert_eq!(engine.target_count(), 3);
    assert_eq!(engine.saved_original_count(), 3);
}
