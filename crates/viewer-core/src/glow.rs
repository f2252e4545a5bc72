//! Inner-glow engine.
//!
//! Two mutually exclusive strategies over the selected targets:
//!
//! - `Emissive` mutates each target's primary material in place, saving a
//!   clone of the original for restoration.
//! - `Separate` leaves source materials alone and attaches an outward-scaled
//!   backside shell mesh per target instead.
//!
//! `apply` is idempotent: it always tears down existing glow state (both
//! kinds, regardless of the current mode) before re-selecting, so repeated
//! calls never accumulate targets or leak saved originals.

use std::sync::Arc;

use fnv::FnvHashMap;
use glam::Vec3;

use crate::color::hsl_to_rgb;
use crate::constants::{
    DEFAULT_GLOW_HUE, DEFAULT_GLOW_INTENSITY, DEFAULT_PULSE_INTENSITY, DEFAULT_PULSE_SPEED,
    GLOW_SHELL_OPACITY, GLOW_SHELL_SCALE,
};
use crate::layers::BloomLayer;
use crate::scene::{Geometry, Material, MeshId, Scene, Transform};
use crate::selector::{should_glow, GlowSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlowMode {
    Emissive,
    Separate,
}

/// Live glow tuning. `hue` is in turns, wrapped into `[0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowParams {
    pub intensity: f32,
    pub hue: f32,
}

impl Default for GlowParams {
    fn default() -> Self {
        Self {
            intensity: DEFAULT_GLOW_INTENSITY,
            hue: DEFAULT_GLOW_HUE,
        }
    }
}

/// Partial parameter update; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlowParamsUpdate {
    pub intensity: Option<f32>,
    pub hue: Option<f32>,
}

#[derive(Clone, Copy, Debug)]
pub struct PulseSettings {
    pub enabled: bool,
    pub speed: f32,
    pub intensity: f32,
}

impl Default for PulseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            speed: DEFAULT_PULSE_SPEED,
            intensity: DEFAULT_PULSE_INTENSITY,
        }
    }
}

#[derive(Debug)]
pub struct GlowEngine {
    mode: GlowMode,
    params: GlowParams,
    settings: GlowSettings,
    pulse: PulseSettings,
    /// Saved pre-glow primary materials, at most one per mesh.
    saved_originals: FnvHashMap<MeshId, Material>,
    /// Meshes whose primary material is currently mutated (emissive mode).
    emissive_targets: Vec<MeshId>,
    /// Shell meshes added to the scene (separate mode).
    shells: Vec<MeshId>,
}

impl Default for GlowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GlowEngine {
    pub fn new() -> Self {
        Self {
            mode: GlowMode::Separate,
            params: GlowParams::default(),
            settings: GlowSettings::default(),
            pulse: PulseSettings::default(),
            saved_originals: FnvHashMap::default(),
            emissive_targets: Vec::new(),
            shells: Vec::new(),
        }
    }

    pub fn mode(&self) -> GlowMode {
        self.mode
    }

    pub fn params(&self) -> GlowParams {
        self.params
    }

    pub fn settings(&self) -> GlowSettings {
        self.settings
    }

    pub fn pulse_enabled(&self) -> bool {
        self.pulse.enabled
    }

    /// Number of live glow targets (mutated meshes or shells).
    pub fn target_count(&self) -> usize {
        self.emissive_targets.len() + self.shells.len()
    }

    pub fn emissive_target_ids(&self) -> &[MeshId] {
        &self.emissive_targets
    }

    pub fn shell_ids(&self) -> &[MeshId] {
        &self.shells
    }

    pub fn saved_original_count(&self) -> usize {
        self.saved_originals.len()
    }

    /// Switch strategy. Pure state change: the caller re-invokes `apply` to
    /// rebuild glow under the new mode.
    pub fn set_mode(&mut self, mode: GlowMode) {
        self.mode = mode;
        log::info!("glow mode set to {mode:?}");
    }

    /// Replace the selector settings wholesale. Takes effect on the next
    /// `apply`.
    pub fn set_settings(&mut self, settings: GlowSettings) {
        self.settings = settings;
    }

    /// Apply glow to every selected mesh in `scene`. Clears any existing
    /// glow state first, so this is safe to call repeatedly.
    pub fn apply(&mut self, scene: &mut Scene, layer: &mut BloomLayer) {
        self.clear(scene, layer);
        match self.mode() {
            GlowMode::Emissive => self.apply_emissive(scene, layer),
            GlowMode::Separate => self.apply_separate(scene, layer),
        }
    }

    fn apply_emissive(&mut self, scene: &mut Scene, layer: &mut BloomLayer) {
        let emissive = hsl_to_rgb(self.params.hue, 1.0, 0.3);
        let intensity = self.params.intensity * 0.1;
        let ids = scene.mesh_ids();
        for id in ids {
            let Some(node) = scene.get_mut(id) else { continue };
            if !should_glow(node, &self.settings) {
                continue;
            }
            let Some(material) = node.primary_material_mut() else {
                continue;
            };
            self.saved_originals.insert(id, material.clone());
            material.emissive = emissive;
            material.emissive_intensity = intensity;
            layer.enable(id);
            self.emissive_targets.push(id);
        }
        log::info!(
            "emissive glow applied to {} meshes",
            self.emissive_targets.len()
        );
    }

    fn apply_separate(&mut self, scene: &mut Scene, layer: &mut BloomLayer) {
        struct ShellSource {
            name: String,
            geometry: Arc<Geometry>,
            transform: Transform,
            parent: Option<MeshId>,
        }

        let sources: Vec<ShellSource> = scene
            .iter()
            .filter(|node| should_glow(node, &self.settings))
            .map(|node| ShellSource {
                name: node.name.clone(),
                geometry: Arc::clone(&node.geometry),
                transform: node.transform,
                parent: node.parent,
            })
            .collect();

        for source in sources {
            // Best-effort: a mesh we cannot build a shell for is skipped,
            // never fatal for the rest of the pass.
            if source.geometry.is_empty() {
                log::warn!("cannot create glow shell for '{}': empty geometry", source.name);
                continue;
            }
            let material = self.shell_material();
            let shell_id = scene.add_mesh(format!("{}.glow", source.name), source.geometry, material);
            let shell = scene
                .get_mut(shell_id)
                .expect("shell mesh was just inserted");
            shell.transform = Transform {
                translation: source.transform.translation,
                scale: source.transform.scale * GLOW_SHELL_SCALE,
            };
            shell.parent = source.parent;
            layer.enable(shell_id);
            self.shells.push(shell_id);
        }
        log::info!("separate glow shells added for {} meshes", self.shells.len());
    }

    fn shell_material(&self) -> Material {
        Material {
            name: "glow_shell".to_string(),
            base_color: hsl_to_rgb(self.params.hue, 1.0, 0.5),
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
            opacity: GLOW_SHELL_OPACITY,
            transparent: true,
            backside: true,
            unlit: true,
        }
    }

    /// Tear down all glow state: restore every saved material, drop every
    /// shell, and remove the bloom-layer memberships this engine created.
    ///
    /// Both kinds of state are cleared no matter which mode is current, so a
    /// mode switch between apply and clear cannot leak.
    pub fn clear(&mut self, scene: &mut Scene, layer: &mut BloomLayer) {
        for id in self.emissive_targets.drain(..) {
            layer.disable(id);
            match self.saved_originals.remove(&id) {
                Some(original) => {
                    if let Some(node) = scene.get_mut(id) {
                        if let Some(slot) = node.primary_material_mut() {
                            *slot = original;
                        }
                    }
                }
                // No recorded original: leave the mesh untouched.
                None => log::debug!("no saved material for glow target {id:?}"),
            }
        }
        // Anything left in the map was saved without a matching target entry.
        for (id, original) in self.saved_originals.drain() {
            layer.disable(id);
            if let Some(node) = scene.get_mut(id) {
                if let Some(slot) = node.primary_material_mut() {
                    *slot = original;
                }
            }
        }
        for id in self.shells.drain(..) {
            layer.disable(id);
            if scene.remove_mesh(id).is_none() {
                log::debug!("glow shell {id:?} already removed from scene");
            }
        }
    }

    /// Merge a partial parameter update and push the new base values onto all
    /// live targets. No re-selection and no re-cloning happens here.
    pub fn update_params(&mut self, scene: &mut Scene, update: GlowParamsUpdate) {
        if let Some(intensity) = update.intensity {
            self.params.intensity = intensity.max(0.0);
        }
        if let Some(hue) = update.hue {
            self.params.hue = hue.rem_euclid(1.0);
        }
        self.refresh_targets(scene);
    }

    /// Enable or disable the pulse. Disabling re-applies the base parameter
    /// values so no pulse modulation is left frozen on the materials.
    pub fn set_pulse_enabled(&mut self, scene: &mut Scene, enabled: bool) {
        self.pulse.enabled = enabled;
        if !enabled {
            self.refresh_targets(scene);
        }
        log::info!("glow pulse {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Per-frame pulse update driven by wall-clock seconds, so the pulse rate
    /// is independent of frame rate. The stored base parameters are never
    /// modified; only live material values are modulated.
    pub fn update(&mut self, scene: &mut Scene, now_sec: f64) {
        if !self.pulse.enabled || self.target_count() == 0 {
            return;
        }
        let pulse = ((now_sec * self.pulse.speed as f64).sin() * 0.5 + 0.5) as f32;
        let intensity = self.params.intensity * (0.5 + pulse * self.pulse.intensity);

        for &id in &self.emissive_targets {
            let Some(material) = scene.get_mut(id).and_then(|n| n.primary_material_mut()) else {
                continue;
            };
            material.emissive = hsl_to_rgb(self.params.hue, 1.0, 0.3 + intensity * 0.1);
            material.emissive_intensity = intensity * 0.15;
        }
        for &id in &self.shells {
            let Some(material) = scene.get_mut(id).and_then(|n| n.primary_material_mut()) else {
                continue;
            };
            material.base_color = hsl_to_rgb(self.params.hue, 1.0, 0.3 + intensity * 0.2);
            material.opacity = 0.4 + intensity * 0.2;
        }
    }

    /// Write the un-pulsed base values onto all live targets.
    fn refresh_targets(&mut self, scene: &mut Scene) {
        let emissive = hsl_to_rgb(self.params.hue, 1.0, 0.3);
        let emissive_intensity = self.params.intensity * 0.1;
        for &id in &self.emissive_targets {
            let Some(material) = scene.get_mut(id).and_then(|n| n.primary_material_mut()) else {
                continue;
            };
            material.emissive = emissive;
            material.emissive_intensity = emissive_intensity;
        }
        let shell_color = hsl_to_rgb(self.params.hue, 1.0, 0.5);
        for &id in &self.shells {
            let Some(material) = scene.get_mut(id).and_then(|n| n.primary_material_mut()) else {
                continue;
            };
            material.base_color = shell_color;
            material.opacity = GLOW_SHELL_OPACITY;
        }
    }
}
