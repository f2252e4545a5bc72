//! Glow target selection.
//!
//! One pure classification function decides whether a mesh participates in
//! the glow effect; both glow strategies reuse it so the heuristics cannot
//! drift apart.

use glam::Vec3;

use crate::constants::GLOW_OPACITY_CUTOFF;
use crate::scene::MeshNode;

/// Name fragments that mark a mesh as an eye.
pub const EYE_NAME_HINTS: &[&str] = &["eye", "pupil", "iris"];

/// Name fragments that mark a mesh as a light fixture or emissive surface.
pub const LIGHT_NAME_HINTS: &[&str] = &[
    "light", "glow", "emission", "lamp", "bulb", "neon", "screen", "display", "led", "torch",
];

/// Toggles controlling the selector heuristic. Replaced wholesale by the
/// settings-update call; the glow engine re-selects on the next apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlowSettings {
    pub by_name_eyes: bool,
    pub by_name_lights: bool,
    pub by_transparency: bool,
    pub by_emissive: bool,
    pub force_all: bool,
}

impl Default for GlowSettings {
    fn default() -> Self {
        Self {
            by_name_eyes: true,
            by_name_lights: true,
            by_transparency: true,
            by_emissive: true,
            force_all: false,
        }
    }
}

/// Decide whether `mesh` should receive the glow effect.
///
/// First matching rule wins: force-all, then eye names, then light names,
/// then translucency, then emissive color. Name matching is case-insensitive
/// substring matching — "Headlight" matches "light" on purpose; multi-material
/// meshes are judged on their first slot only.
pub fn should_glow(mesh: &MeshNode, settings: &GlowSettings) -> bool {
    if settings.force_all {
        return true;
    }
    let name = mesh.name.to_lowercase();
    if settings.by_name_eyes && contains_any(&name, EYE_NAME_HINTS) {
        log::debug!("glow target (eye name): {}", mesh.name);
        return true;
    }
    if settings.by_name_lights && contains_any(&name, LIGHT_NAME_HINTS) {
        log::debug!("glow target (light name): {}", mesh.name);
        return true;
    }
    if let Some(material) = mesh.primary_material() {
        if settings.by_transparency
            && material.transparent
            && material.opacity < GLOW_OPACITY_CUTOFF
        {
            log::debug!("glow target (translucent): {}", mesh.name);
            return true;
        }
        if settings.by_emissive && material.emissive != Vec3::ZERO {
            log::debug!("glow target (emissive): {}", mesh.name);
            return true;
        }
    }
    false
}

fn contains_any(name: &str, hints: &[&str]) -> bool {
    hints.iter().any(|h| name.contains(h))
}
