//! Model loading and caching.
//!
//! Wavefront OBJ/MTL is the asset format: object and group names become mesh
//! names, and `Kd`/`Ke`/`d` map onto the material fields the effect
//! heuristics inspect. Loaded scenes are cached per path; a cache hit hands
//! out a clone so the caller can mutate its copy freely.

mod mtl;
mod obj;

use std::path::Path;
use std::sync::Arc;

use fnv::FnvHashMap;
use glam::Vec3;
use smallvec::{smallvec, SmallVec};

use crate::constants::MODEL_TARGET_SIZE;
use crate::error::AssetError;
use crate::scene::{Material, Scene, Transform};

pub use mtl::parse_materials;
pub use obj::{mtllib_names, parse_objects, ObjObject};

#[derive(Default)]
pub struct ModelLoader {
    cache: FnvHashMap<String, Scene>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model from disk, resolving `mtllib` references next to the OBJ
    /// file. Cached per path; a hit returns a clone of the cached scene.
    pub fn load(&mut self, path: &str) -> Result<Scene, AssetError> {
        if let Some(cached) = self.cache.get(path) {
            log::info!("model '{path}' served from cache");
            return Ok(cached.clone());
        }
        log::info!("loading model '{path}'");
        let content = std::fs::read_to_string(path)?;

        let mut materials = FnvHashMap::default();
        let dir = Path::new(path).parent().unwrap_or_else(|| Path::new("."));
        for lib in obj::mtllib_names(&content) {
            let lib_path = dir.join(&lib);
            match std::fs::read_to_string(&lib_path) {
                Ok(mtl_content) => materials.extend(parse_materials(&mtl_content)),
                Err(err) => {
                    log::warn!("material library '{}' not readable: {err}", lib_path.display());
                }
            }
        }

        let scene = parse_model(&content, &materials)?;
        log::info!("model '{path}' loaded ({} meshes)", scene.len());
        self.cache.insert(path.to_string(), scene.clone());
        Ok(scene)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        log::info!("model cache cleared");
    }

    pub fn loaded_paths(&self) -> Vec<String> {
        self.cache.keys().cloned().collect()
    }
}

/// Build a scene from raw OBJ content and an already-parsed material set.
/// This is the entry point for raw (non-file) model content.
pub fn parse_model(
    obj_content: &str,
    materials: &FnvHashMap<String, Material>,
) -> Result<Scene, AssetError> {
    let objects = parse_objects(obj_content)?;
    let mut scene = Scene::new();
    for object in objects {
        if object.geometry.is_empty() {
            log::warn!("object '{}' has no geometry, skipped", object.name);
            continue;
        }
        let mut slots: SmallVec<[Material; 1]> = object
            .material_names
            .iter()
            .map(|name| {
                materials.get(name).cloned().unwrap_or_else(|| {
                    log::warn!("unknown material '{name}', using default");
                    Material {
                        name: name.clone(),
                        ..Material::default()
                    }
                })
            })
            .collect();
        if slots.is_empty() {
            slots = smallvec![Material::default()];
        }
        scene.add_mesh_with_slots(object.name, Arc::new(object.geometry), slots);
    }
    if scene.is_empty() {
        return Err(AssetError::EmptyModel(
            "no renderable objects in OBJ content".to_string(),
        ));
    }
    normalize_scene(&mut scene);
    Ok(scene)
}

/// Recenter the model on the origin and scale it so its largest dimension
/// matches the standard viewing size.
fn normalize_scene(scene: &mut Scene) {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for node in scene.iter() {
        for p in &node.geometry.positions {
            let p = Vec3::from(*p);
            min = min.min(p);
            max = max.max(p);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        return;
    }
    let center = (min + max) * 0.5;
    let size = max - min;
    let max_dimension = size.max_element();
    let scale = if max_dimension > 0.0 {
        MODEL_TARGET_SIZE / max_dimension
    } else {
        1.0
    };
    for node in scene.iter_mut() {
        node.transform = Transform {
            translation: -center * scale,
            scale: Vec3::splat(scale),
        };
    }
    log::debug!(
        "model normalized, size {:.2} x {:.2} x {:.2}",
        size.x,
        size.y,
        size.z
    );
}
