//! Model transparency inspection and forcing.

use crate::scene::{MeshId, Scene};

#[derive(Clone, Debug)]
pub struct MeshSummary {
    pub id: MeshId,
    pub name: String,
    pub opacity: f32,
}

/// Classification of a model's meshes by their primary material.
#[derive(Clone, Debug, Default)]
pub struct TransparencyReport {
    pub transparent: Vec<MeshSummary>,
    pub opaque: Vec<MeshSummary>,
}

pub fn analyze_transparency(scene: &Scene) -> TransparencyReport {
    let mut report = TransparencyReport::default();
    for node in scene.iter() {
        let Some(material) = node.primary_material() else {
            continue;
        };
        let summary = MeshSummary {
            id: node.id(),
            name: node.name.clone(),
            opacity: material.opacity,
        };
        if material.transparent && material.opacity < 1.0 {
            report.transparent.push(summary);
        } else {
            report.opaque.push(summary);
        }
    }
    log::debug!(
        "transparency analysis: {} transparent, {} opaque",
        report.transparent.len(),
        report.opaque.len()
    );
    report
}

/// Force the given opacity onto every material slot of every mesh. Values
/// below 1.0 mark the material transparent; 1.0 clears the flag.
pub fn force_transparency(scene: &mut Scene, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    let transparent = opacity < 1.0;
    for node in scene.iter_mut() {
        for material in node.materials.iter_mut() {
            material.opacity = opacity;
            material.transparent = transparent;
        }
    }
    log::info!("forced opacity {opacity} on all meshes");
}
