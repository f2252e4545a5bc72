// Host-side tests for OBJ/MTL parsing, normalization, and the model cache.

use fnv::FnvHashMap;
use glam::Vec3;
use viewer_core::{
    analyze_transparency, force_transparency, parse_materials, parse_model, parse_objects,
    AssetError, Material, ModelLoader,
};

const HOUSE_OBJ: &str = "\
mtllib house.mtl
v -1.0 0.0 -1.0
v  1.0 0.0 -1.0
v  1.0 0.0  1.0
v -1.0 0.0  1.0
v  0.0 4.0  0.0
o Walls
usemtl walls
f 1 2 3 4
o LampBulb
usemtl lamp_bulb
f 1 2 5
f 2 3 5
";

const HOUSE_MTL: &str = "\
newmtl walls
Kd 0.75 0.70 0.62
d 1.0
newmtl lamp_bulb
Kd 1.00 0.95 0.80
Ke 1.00 0.85 0.40
newmtl glass
Kd 0.55 0.75 0.85
d 0.45
";

#[test]
fn obj_objects_carry_names_and_triangulated_faces() {
    let objects = parse_objects(HOUSE_OBJ).unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].name, "Walls");
    // The quad fan-triangulates into two triangles.
    assert_eq!(objects[0].geometry.triangle_count(), 2);
    assert_eq!(objects[1].name, "LampBulb");
    assert_eq!(objects[1].geometry.triangle_count(), 2);
    assert_eq!(objects[0].material_names, vec!["walls".to_string()]);
}

#[test]
fn missing_normals_are_replaced_with_flat_face_normals() {
    let objects = parse_objects(HOUSE_OBJ).unwrap();
    let geometry = &objects[0].geometry;
    assert_eq!(geometry.normals.len(), geometry.positions.len());
    for normal in &geometry.normals {
        let len = Vec3::from(*normal).length();
        assert!((len - 1.0).abs() < 1e-4, "normal not unit length: {len}");
    }
}

#[test]
fn mtl_fields_map_onto_material_values() {
    let materials = parse_materials(HOUSE_MTL);
    assert_eq!(materials.len(), 3);

    let walls = &materials["walls"];
    assert_eq!(walls.base_color, Vec3::new(0.75, 0.70, 0.62));
    assert!(!walls.transparent);

    let bulb = &materials["lamp_bulb"];
    assert_eq!(bulb.emissive, Vec3::new(1.0, 0.85, 0.40));
    assert_eq!(bulb.emissive_intensity, 1.0);

    let glass = &materials["glass"];
    assert!(glass.transparent);
    assert!((glass.opacity - 0.45).abs() < 1e-6);
}

#[test]
fn tr_statement_is_inverted_dissolve() {
    let materials = parse_materials("newmtl m\nTr 0.3\n");
    let m = &materials["m"];
    assert!((m.opacity - 0.7).abs() < 1e-6);
    assert!(m.transparent);
}

#[test]
fn parse_model_binds_materials_and_normalizes() {
    let materials = parse_materials(HOUSE_MTL);
    let scene = parse_model(HOUSE_OBJ, &materials).unwrap();
    assert_eq!(scene.len(), 2);

    let bulb = scene.iter().find(|n| n.name == "LampBulb").unwrap();
    assert!(bulb.primary_material().unwrap().has_emissive());

    // World-space bounds after normalization: centered, largest dim == 2.
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for node in scene.iter() {
        for p in &node.geometry.positions {
            let world = node.transform.scale * Vec3::from(*p) + node.transform.translation;
            min = min.min(world);
            max = max.max(world);
        }
    }
    let size = max - min;
    assert!((size.max_element() - 2.0).abs() < 1e-4);
    let center = (min + max) * 0.5;
    assert!(center.length() < 1e-4);
}

#[test]
fn unknown_material_names_fall_back_to_default() {
    let scene = parse_model(HOUSE_OBJ, &FnvHashMap::default()).unwrap();
    let walls = scene.iter().find(|n| n.name == "Walls").unwrap();
    let material = walls.primary_material().unwrap();
    assert_eq!(material.base_color, Material::default().base_color);
    assert_eq!(material.name, "walls");
}

#[test]
fn content_without_faces_is_an_empty_model_error() {
    let result = parse_model("v 0 0 0\nv 1 0 0\n", &FnvHashMap::default());
    assert!(matches!(result, Err(AssetError::EmptyModel(_))));
}

#[test]
fn malformed_face_index_is_a_parse_error() {
    let result = parse_objects("v 0 0 0\nf 1 x 2\n");
    assert!(matches!(result, Err(AssetError::Parse(_))));
}

#[test]
fn loader_caches_by_path() {
    let dir = std::env::temp_dir().join(format!("lumiview_test_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let obj_path = dir.join("house.obj");
    std::fs::write(&obj_path, HOUSE_OBJ).unwrap();
    std::fs::write(dir.join("house.mtl"), HOUSE_MTL).unwrap();
    let path = obj_path.to_str().unwrap().to_string();

    let mut loader = ModelLoader::new();
    let first = loader.load(&path).unwrap();
    let second = loader.load(&path).unwrap();

    assert_eq!(loader.loaded_paths(), vec![path.clone()]);
    assert_eq!(first.len(), second.len());
    // The cache hands out clones: mutating one load does not affect the next.
    let mut mutated = loader.load(&path).unwrap();
    force_transparency(&mut mutated, 0.25);
    let fresh = loader.load(&path).unwrap();
    assert!(analyze_transparency(&fresh).transparent.is_empty());

    loader.clear_cache();
    assert!(loader.loaded_paths().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_file_surfaces_io_error() {
    let mut loader = ModelLoader::new();
    let result = loader.load("definitely/not/here.obj");
    assert!(matches!(result, Err(AssetError::Io(_))));
}

#[test]
fn force_transparency_marks_and_clears_all_slots() {
    let materials = parse_materials(HOUSE_MTL);
    let mut scene = parse_model(HOUSE_OBJ, &materials).unwrap();

    force_transparency(&mut scene, 0.5);
    let report = analyze_transparency(&scene);
    assert_eq!(report.transparent.len(), 2);
    assert!(report.opaque.is_empty());

    force_transparency(&mut scene, 1.0);
    let report = analyze_transparency(&scene);
    assert!(report.transparent.is_empty());
    assert_eq!(report.opaque.len(), 2);
}
