//! Bloom render-layer membership.
//!
//! Rather than flipping a layer bit on scene objects, membership is an
//! explicit set keyed by mesh identity. The glow engine enrolls its targets
//! and the bulk classifier enrolls anything already emissive; the bloom
//! compositor only ever queries `contains`.

use fnv::FnvHashSet;

use crate::scene::{MeshId, Scene};

#[derive(Clone, Debug, Default)]
pub struct BloomLayer {
    members: FnvHashSet<MeshId>,
}

impl BloomLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, id: MeshId) {
        self.members.insert(id);
    }

    pub fn disable(&mut self, id: MeshId) {
        self.members.remove(&id);
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.members.contains(&id)
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Enroll every mesh whose primary material is already emissive.
    /// Run once after a model load; returns how many meshes were tagged.
    pub fn tag_emissive(&mut self, scene: &Scene) -> usize {
        let mut tagged = 0;
        for node in scene.iter() {
            if node.primary_material().is_some_and(|m| m.has_emissive()) {
                self.members.insert(node.id());
                tagged += 1;
            }
        }
        if tagged > 0 {
            log::info!("tagged {tagged} emissive meshes for the bloom layer");
        }
        tagged
    }
}
