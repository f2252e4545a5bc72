//! GPU-side mesh resources mirrored from the CPU scene.
//!
//! Geometry buffers are cached per shared `Geometry` allocation, so a glow
//! shell reuses its source mesh's vertex data. Per-mesh uniforms are
//! re-written every frame from the current CPU materials — that is what makes
//! glow mutation, pulse modulation, and selective-bloom substitution visible
//! without any pipeline rebuilds.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use viewer_core::{Geometry, Material};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct Vertex {
    pub(crate) position: [f32; 3],
    pub(crate) normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct MeshUniforms {
    pub(crate) model: [[f32; 4]; 4],
    pub(crate) base_color: [f32; 4],
    pub(crate) emissive: [f32; 4],
    pub(crate) params: [f32; 4],
}

pub(crate) fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 1,
            },
        ],
    }
}

/// Uploaded vertex/index buffers for one shared geometry.
pub(crate) struct GpuGeometry {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

pub(crate) fn upload_geometry(device: &wgpu::Device, geometry: &Geometry) -> GpuGeometry {
    let vertices: Vec<Vertex> = geometry
        .positions
        .iter()
        .zip(&geometry.normals)
        .map(|(&position, &normal)| Vertex { position, normal })
        .collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_vb"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh_ib"),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuGeometry {
        vertex_buffer,
        index_buffer,
        index_count: geometry.indices.len() as u32,
    }
}

/// Per-mesh uniform buffer and bind group, plus the shared geometry handle.
/// `geometry_key` identifies the CPU geometry allocation this binding was
/// built for; a mismatch means the mesh id was reused by a new scene and the
/// binding must be rebuilt.
pub(crate) struct MeshBinding {
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
    pub(crate) geometry: Arc<GpuGeometry>,
    pub(crate) geometry_key: usize,
}

/// Which scene pipeline a material draws with.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineKind {
    Opaque,
    Translucent,
    Shell,
}

pub(crate) fn pipeline_kind(material: &Material) -> PipelineKind {
    if material.backside {
        PipelineKind::Shell
    } else if material.transparent || material.opacity < 1.0 {
        PipelineKind::Translucent
    } else {
        PipelineKind::Opaque
    }
}
