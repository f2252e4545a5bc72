//! CPU-side scene model shared by the effect engines and the renderer.
//!
//! A loaded model is a flat arena of [`MeshNode`]s with stable [`MeshId`]
//! keys. Geometry is reference-counted so a glow shell can share its source
//! mesh's buffers without owning them; materials are plain values so effect
//! code can snapshot and restore them by value equality.

use std::sync::Arc;

use fnv::FnvHashMap;
use glam::{Mat4, Vec3};
use smallvec::{smallvec, SmallVec};

/// Stable identity of a mesh within one [`Scene`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct MeshId(u64);

/// Shared triangle geometry. Positions/normals are parallel arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Plain-value material. Value equality (`PartialEq`) is what "restored to
/// its pre-glow state" means throughout the effect code.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: Vec3,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub transparent: bool,
    /// Render back faces only (used by glow shells).
    pub backside: bool,
    /// Skip lighting entirely.
    pub unlit: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Vec3::splat(0.8),
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
            opacity: 1.0,
            transparent: false,
            backside: false,
            unlit: false,
        }
    }
}

impl Material {
    pub fn has_emissive(&self) -> bool {
        self.emissive != Vec3::ZERO
    }
}

/// Translation + non-uniform scale. Model nodes never carry rotation; the
/// loader bakes orientation into the vertex data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_scale(self.scale)
    }
}

/// One mesh in the scene: a name, shared geometry, one or more material
/// slots, and a transform. Heuristics and effect mutation use the first
/// (primary) slot.
#[derive(Clone, Debug)]
pub struct MeshNode {
    id: MeshId,
    pub name: String,
    pub geometry: Arc<Geometry>,
    pub materials: SmallVec<[Material; 1]>,
    pub transform: Transform,
    pub parent: Option<MeshId>,
}

impl MeshNode {
    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn primary_material(&self) -> Option<&Material> {
        self.materials.first()
    }

    pub fn primary_material_mut(&mut self) -> Option<&mut Material> {
        self.materials.first_mut()
    }
}

/// Flat arena of meshes with O(1) id lookup. A loaded model IS a scene;
/// the viewer keeps exactly one active at a time.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<MeshNode>,
    index: FnvHashMap<MeshId, usize>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        geometry: Arc<Geometry>,
        material: Material,
    ) -> MeshId {
        self.add_mesh_with_slots(name, geometry, smallvec![material])
    }

    pub fn add_mesh_with_slots(
        &mut self,
        name: impl Into<String>,
        geometry: Arc<Geometry>,
        materials: SmallVec<[Material; 1]>,
    ) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.index.insert(id, self.nodes.len());
        self.nodes.push(MeshNode {
            id,
            name: name.into(),
            geometry,
            materials,
            transform: Transform::default(),
            parent: None,
        });
        id
    }

    /// Remove a mesh and return it. Index order of the remaining meshes is
    /// not preserved.
    pub fn remove_mesh(&mut self, id: MeshId) -> Option<MeshNode> {
        let slot = self.index.remove(&id)?;
        let node = self.nodes.swap_remove(slot);
        if let Some(moved) = self.nodes.get(slot) {
            self.index.insert(moved.id, slot);
        }
        Some(node)
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: MeshId) -> Option<&MeshNode> {
        self.index.get(&id).map(|&slot| &self.nodes[slot])
    }

    pub fn get_mut(&mut self, id: MeshId) -> Option<&mut MeshNode> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.nodes[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeshNode> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MeshNode> {
        self.nodes.iter_mut()
    }

    /// Snapshot of all current ids, in insertion-independent arena order.
    pub fn mesh_ids(&self) -> Vec<MeshId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a node's world matrix through its parent chain.
    pub fn world_matrix(&self, id: MeshId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.get(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|p| self.get(p));
        }
        matrix
    }
}
