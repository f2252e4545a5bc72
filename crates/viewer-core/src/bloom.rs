//! Bloom compositor state and the selective-bloom isolation scope.
//!
//! The GPU pass chains live in the render crate; this module owns the part
//! that must be exactly right regardless of backend: mode/parameter state and
//! the temporary substitution of non-bloom materials with flat black during
//! the isolated extraction pass.

use fnv::FnvHashMap;
use glam::Vec3;
use smallvec::SmallVec;

use crate::constants::{
    DEFAULT_BLOOM_RADIUS, DEFAULT_BLOOM_STRENGTH, DEFAULT_BLOOM_THRESHOLD, DEFAULT_EXPOSURE,
};
use crate::layers::BloomLayer;
use crate::scene::{Material, MeshId, Scene};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloomMode {
    Simple,
    Selective,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomParams {
    pub exposure: f32,
    pub strength: f32,
    pub threshold: f32,
    pub radius: f32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            exposure: DEFAULT_EXPOSURE,
            strength: DEFAULT_BLOOM_STRENGTH,
            threshold: DEFAULT_BLOOM_THRESHOLD,
            radius: DEFAULT_BLOOM_RADIUS,
        }
    }
}

/// Partial parameter update; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default)]
pub struct BloomParamsUpdate {
    pub exposure: Option<f32>,
    pub strength: Option<f32>,
    pub threshold: Option<f32>,
    pub radius: Option<f32>,
}

/// Mode flag plus live parameters, selected per frame by the renderer.
#[derive(Clone, Copy, Debug)]
pub struct BloomState {
    pub mode: BloomMode,
    pub params: BloomParams,
}

impl Default for BloomState {
    fn default() -> Self {
        Self {
            mode: BloomMode::Simple,
            params: BloomParams::default(),
        }
    }
}

impl BloomState {
    pub fn set_mode(&mut self, mode: BloomMode) {
        self.mode = mode;
        log::info!("bloom mode set to {mode:?}");
    }

    pub fn update_params(&mut self, update: BloomParamsUpdate) {
        if let Some(exposure) = update.exposure {
            self.params.exposure = exposure.max(0.0);
        }
        if let Some(strength) = update.strength {
            self.params.strength = strength.max(0.0);
        }
        if let Some(threshold) = update.threshold {
            self.params.threshold = threshold.max(0.0);
        }
        if let Some(radius) = update.radius {
            self.params.radius = radius.max(0.0);
        }
    }
}

/// Extent of the half-resolution bloom targets for a given surface dimension.
pub fn half_extent(d: u32) -> u32 {
    (d.max(1) / 2).max(1)
}

/// The flat unlit black stand-in used during the isolated bloom pass.
pub fn dark_material() -> Material {
    Material {
        name: "bloom_dark".to_string(),
        base_color: Vec3::ZERO,
        unlit: true,
        ..Material::default()
    }
}

/// Scoped material substitution for the selective-bloom extraction pass.
///
/// On construction, every mesh NOT in the bloom layer has all of its material
/// slots replaced with [`dark_material`], the originals recorded. Dropping
/// the scope restores every recorded slot and drains the map — on every exit
/// path, so a render error mid-pass can never leave the scene blacked out.
pub struct IsolationScope<'s> {
    scene: &'s mut Scene,
    saved: FnvHashMap<MeshId, SmallVec<[Material; 1]>>,
}

impl<'s> IsolationScope<'s> {
    pub fn begin(scene: &'s mut Scene, layer: &BloomLayer) -> Self {
        let mut saved = FnvHashMap::default();
        for id in scene.mesh_ids() {
            if layer.contains(id) {
                continue;
            }
            let Some(node) = scene.get_mut(id) else { continue };
            let dark: SmallVec<[Material; 1]> =
                node.materials.iter().map(|_| dark_material()).collect();
            let originals = std::mem::replace(&mut node.materials, dark);
            saved.insert(id, originals);
        }
        Self { scene, saved }
    }

    /// The scene with substitutions in place, for encoding the isolated pass.
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    pub fn substituted_count(&self) -> usize {
        self.saved.len()
    }
}

impl Drop for IsolationScope<'_> {
    fn drop(&mut self) {
        for (id, originals) in self.saved.drain() {
            match self.scene.get_mut(id) {
                Some(node) => node.materials = originals,
                // Mesh disappeared while substituted: nothing to restore.
                None => log::debug!("substituted mesh {id:?} no longer in scene"),
            }
        }
    }
}
