// Host-side tests for the glow target selector.

use std::sync::Arc;

use glam::Vec3;
use viewer_core::{should_glow, Geometry, GlowSettings, Material, Scene};

fn triangle_geometry() -> Arc<Geometry> {
    Arc::new(Geometry {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        indices: vec![0, 1, 2],
    })
}

fn scene_with(name: &str, material: Material) -> Scene {
    let mut scene = Scene::new();
    scene.add_mesh(name, triangle_geometry(), material);
    scene
}

fn only(field: fn(&mut GlowSettings)) -> GlowSettings {
    let mut settings = GlowSettings {
        by_name_eyes: false,
        by_name_lights: false,
        by_transparency: false,
        by_emissive: false,
        force_all: false,
    };
    field(&mut settings);
    settings
}

#[test]
fn eye_name_matches_with_eye_toggle_only() {
    let settings = only(|s| s.by_name_eyes = true);
    let eye = scene_with("Eye_L", Material::default());
    let wall = scene_with("Wall", Material::default());
    assert!(should_glow(eye.iter().next().unwrap(), &settings));
    assert!(!should_glow(wall.iter().next().unwrap(), &settings));
}

#[test]
fn force_all_matches_everything() {
    let settings = only(|s| s.force_all = true);
    let eye = scene_with("Eye_L", Material::default());
    let wall = scene_with("Wall", Material::default());
    assert!(should_glow(eye.iter().next().unwrap(), &settings));
    assert!(should_glow(wall.iter().next().unwrap(), &settings));
}

#[test]
fn name_matching_is_case_insensitive_substring() {
    let settings = only(|s| s.by_name_lights = true);
    // Substring matching is the documented behavior: "Headlight" matches
    // the "light" fragment even though it is not a light fixture.
    for name in ["LAMP_01", "StreetLight", "Headlight", "neon_sign"] {
        let scene = scene_with(name, Material::default());
        assert!(
            should_glow(scene.iter().next().unwrap(), &settings),
            "{name} should match"
        );
    }
    let scene = scene_with("Chair", Material::default());
    assert!(!should_glow(scene.iter().next().unwrap(), &settings));
}

#[test]
fn transparency_heuristic_requires_flag_and_low_opacity() {
    let settings = only(|s| s.by_transparency = true);

    let translucent = Material {
        transparent: true,
        opacity: 0.5,
        ..Material::default()
    };
    let scene = scene_with("Pane", translucent);
    assert!(should_glow(scene.iter().next().unwrap(), &settings));

    // Nearly opaque does not count.
    let nearly_opaque = Material {
        transparent: true,
        opacity: 0.95,
        ..Material::default()
    };
    let scene = scene_with("Pane", nearly_opaque);
    assert!(!should_glow(scene.iter().next().unwrap(), &settings));

    // Low opacity without the transparent flag does not count either.
    let unflagged = Material {
        transparent: false,
        opacity: 0.5,
        ..Material::default()
    };
    let scene = scene_with("Pane", unflagged);
    assert!(!should_glow(scene.iter().next().unwrap(), &settings));
}

#[test]
fn emissive_heuristic_requires_nonzero_color() {
    let settings = only(|s| s.by_emissive = true);

    let emissive = Material {
        emissive: Vec3::new(1.0, 0.8, 0.2),
        ..Material::default()
    };
    let scene = scene_with("Sphere", emissive);
    assert!(should_glow(scene.iter().next().unwrap(), &settings));

    let scene = scene_with("Sphere", Material::default());
    assert!(!should_glow(scene.iter().next().unwrap(), &settings));
}

#[test]
fn multi_material_meshes_use_first_slot_only() {
    let settings = only(|s| s.by_transparency = true);
    let translucent = Material {
        transparent: true,
        opacity: 0.4,
        ..Material::default()
    };

    let mut scene = Scene::new();
    scene.add_mesh_with_slots(
        "TwoSlots",
        triangle_geometry(),
        smallvec::smallvec![Material::default(), translucent.clone()],
    );
    // The second slot is translucent but only the first slot is consulted.
    assert!(!should_glow(scene.iter().next().unwrap(), &settings));

    let mut scene = Scene::new();
    scene.add_mesh_with_slots(
        "TwoSlots",
        triangle_geometry(),
        smallvec::smallvec![translucent, Material::default()],
    );
    assert!(should_glow(scene.iter().next().unwrap(), &settings));
}

#[test]
fn default_settings_enable_heuristics_but_not_force_all() {
    let settings = GlowSettings::default();
    assert!(settings.by_name_eyes);
    assert!(settings.by_name_lights);
    assert!(settings.by_transparency);
    assert!(settings.by_emissive);
    assert!(!settings.force_all);

    let wall = scene_with("Wall", Material::default());
    assert!(!should_glow(wall.iter().next().unwrap(), &settings));
}
