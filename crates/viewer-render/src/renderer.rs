//! wgpu renderer and bloom compositor.
//!
//! Both bloom configurations are built once at construction and selected per
//! frame by the [`BloomState`] mode flag:
//!
//! - Simple: scene -> HDR, bright-pass -> blur -> additive composite.
//! - Selective: the scene is first rendered with every non-bloom mesh
//!   substituted to flat black (via [`IsolationScope`]), the blur chain runs
//!   on that isolated image, materials are restored, and the full scene is
//!   re-rendered and composited with the offscreen bloom result.

use std::sync::{Arc, Weak};

use fnv::{FnvHashMap, FnvHashSet};
use glam::Vec3;

use viewer_core::{
    half_extent, BloomLayer, BloomParams, BloomState, Camera, IsolationScope, MeshId, Scene,
};

use crate::mesh::{
    pipeline_kind, upload_geometry, vertex_buffer_layout, GpuGeometry, MeshBinding, MeshUniforms,
    PipelineKind,
};
use crate::post::{create_post_resources, PostResources, PostUniforms};
use crate::targets::{RenderTargets, DEPTH_FORMAT, HDR_FORMAT};
use crate::{POST_WGSL, SCENE_WGSL};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
}

pub struct Renderer<'w> {
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    width: u32,
    height: u32,
    clear_color: wgpu::Color,

    // Mesh pipelines into the HDR target
    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,
    shell_pipeline: wgpu::RenderPipeline,
    mesh_bgl: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    // Post-processing resources
    targets: RenderTargets,
    linear_sampler: wgpu::Sampler,
    post: PostResources,
    bg_hdr: wgpu::BindGroup,
    bg_from_bloom_a: wgpu::BindGroup,
    bg_from_bloom_b: wgpu::BindGroup,
    bg_bloom_a_only: wgpu::BindGroup,

    // GPU mirrors of the CPU scene
    geometries: FnvHashMap<usize, (Weak<viewer_core::Geometry>, Arc<GpuGeometry>)>,
    bindings: FnvHashMap<MeshId, MeshBinding>,
}

impl<'w> Renderer<'w> {
    pub async fn new(window: &'w winit::window::Window) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .unwrap_or(caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let targets = RenderTargets::new(&device, width, height);

        // Mesh pipelines
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_WGSL.into()),
        });
        let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let mesh_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let scene_pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pl"),
            bind_group_layouts: &[&camera_bgl, &mesh_bgl],
            push_constant_ranges: &[],
        });
        let opaque_pipeline = make_scene_pipeline(
            &device,
            &scene_pl,
            &scene_shader,
            "opaque_pipeline",
            wgpu::Face::Back,
            None,
            true,
        );
        let translucent_pipeline = make_scene_pipeline(
            &device,
            &scene_pl,
            &scene_shader,
            "translucent_pipeline",
            wgpu::Face::Back,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
        );
        // Shells render back faces only, so front faces are culled.
        let shell_pipeline = make_scene_pipeline(
            &device,
            &scene_pl,
            &scene_shader,
            "shell_pipeline",
            wgpu::Face::Front,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
        );

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bg"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Post shader + pipelines
        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(POST_WGSL.into()),
        });
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let post = create_post_resources(&device, &post_shader, HDR_FORMAT, format);
        let (bg_hdr, bg_from_bloom_a, bg_from_bloom_b, bg_bloom_a_only) =
            build_post_bind_groups(&device, &post, &targets, &linear_sampler);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            width,
            height,
            clear_color: wgpu::Color {
                r: 0.012,
                g: 0.012,
                b: 0.016,
                a: 1.0,
            },
            opaque_pipeline,
            translucent_pipeline,
            shell_pipeline,
            mesh_bgl,
            camera_buffer,
            camera_bind_group,
            targets,
            linear_sampler,
            post,
            bg_hdr,
            bg_from_bloom_a,
            bg_from_bloom_b,
            bg_bloom_a_only,
            geometries: FnvHashMap::default(),
            bindings: FnvHashMap::default(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Propagate a new viewport size to the surface and every offscreen
    /// target, then rebuild the bind groups that reference them. Also used
    /// to reconfigure a lost surface, so it never early-outs on equal size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.targets.recreate(&self.device, width, height);
        let (bg_hdr, bg_from_bloom_a, bg_from_bloom_b, bg_bloom_a_only) =
            build_post_bind_groups(&self.device, &self.post, &self.targets, &self.linear_sampler);
        self.bg_hdr = bg_hdr;
        self.bg_from_bloom_a = bg_from_bloom_a;
        self.bg_from_bloom_b = bg_from_bloom_b;
        self.bg_bloom_a_only = bg_bloom_a_only;
        log::debug!("render targets resized to {width}x{height}");
    }

    /// Render one frame with the active bloom configuration.
    pub fn render_frame(
        &mut self,
        scene: &mut Scene,
        layer: &BloomLayer,
        bloom: &BloomState,
        camera: &Camera,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.sync_meshes(scene);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms {
                view_proj: camera.view_proj_matrix().to_cols_array_2d(),
            }),
        );

        let params = bloom.params;
        match bloom.mode {
            viewer_core::BloomMode::Simple => {
                self.upload_mesh_uniforms(scene);
                self.encode_scene_pass(scene);
                self.run_bloom_chain(&params);
            }
            viewer_core::BloomMode::Selective => {
                // The scope restores the substituted materials when it drops,
                // whatever happens in between.
                {
                    let scope = IsolationScope::begin(scene, layer);
                    self.upload_mesh_uniforms(scope.scene());
                    self.encode_scene_pass(scope.scene());
                    self.run_bloom_chain(&params);
                }
                self.upload_mesh_uniforms(scene);
                self.encode_scene_pass(scene);
            }
        }
        self.run_composite(&swap_view, &params);

        frame.present();
        Ok(())
    }

    /// Mirror the CPU scene into GPU resources: upload new geometry, create
    /// bindings for new meshes, drop resources for removed ones.
    ///
    /// Geometry is cached by allocation identity, verified through a weak
    /// handle so an address reused by a later model cannot alias a stale
    /// upload; bindings are rebuilt whenever a mesh id points at different
    /// geometry than it did before (ids restart per scene).
    fn sync_meshes(&mut self, scene: &Scene) {
        let mut live_geometries = FnvHashSet::default();
        let mut live_ids = FnvHashSet::default();
        for node in scene.iter() {
            let id = node.id();
            live_ids.insert(id);
            let key = Arc::as_ptr(&node.geometry) as usize;
            live_geometries.insert(key);

            let cached = self.geometries.get(&key).is_some_and(|(weak, _)| {
                weak.upgrade().is_some_and(|g| Arc::ptr_eq(&g, &node.geometry))
            });
            if !cached {
                self.geometries.insert(
                    key,
                    (
                        Arc::downgrade(&node.geometry),
                        Arc::new(upload_geometry(&self.device, &node.geometry)),
                    ),
                );
            }
            let gpu_geometry = &self.geometries[&key].1;

            let binding_ok = self.bindings.get(&id).is_some_and(|b| {
                b.geometry_key == key && Arc::ptr_eq(&b.geometry, gpu_geometry)
            });
            if !binding_ok {
                let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("mesh_uniforms"),
                    size: std::mem::size_of::<MeshUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("mesh_bg"),
                    layout: &self.mesh_bgl,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    }],
                });
                self.bindings.insert(
                    id,
                    MeshBinding {
                        uniform_buffer,
                        bind_group,
                        geometry: Arc::clone(gpu_geometry),
                        geometry_key: key,
                    },
                );
            }
        }
        self.bindings.retain(|id, _| live_ids.contains(id));
        self.geometries.retain(|key, _| live_geometries.contains(key));
    }

    /// Push the current CPU material state into every mesh's uniform buffer.
    fn upload_mesh_uniforms(&self, scene: &Scene) {
        for node in scene.iter() {
            let Some(binding) = self.bindings.get(&node.id()) else {
                continue;
            };
            let Some(material) = node.primary_material() else {
                continue;
            };
            let uniforms = MeshUniforms {
                model: scene.world_matrix(node.id()).to_cols_array_2d(),
                base_color: color_with(material.base_color, material.opacity),
                emissive: color_with(material.emissive, material.emissive_intensity),
                params: [if material.unlit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
            };
            self.queue
                .write_buffer(&binding.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }
    }

    /// Draw every mesh into the HDR target: opaque first, then blended.
    fn encode_scene_pass(&self, scene: &Scene) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene_encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            for phase in [
                PipelineKind::Opaque,
                PipelineKind::Translucent,
                PipelineKind::Shell,
            ] {
                for node in scene.iter() {
                    let Some(material) = node.primary_material() else {
                        continue;
                    };
                    if pipeline_kind(material) != phase {
                        continue;
                    }
                    let Some(binding) = self.bindings.get(&node.id()) else {
                        continue;
                    };
                    let pipeline = match phase {
                        PipelineKind::Opaque => &self.opaque_pipeline,
                        PipelineKind::Translucent => &self.translucent_pipeline,
                        PipelineKind::Shell => &self.shell_pipeline,
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(1, &binding.bind_group, &[]);
                    rpass.set_vertex_buffer(0, binding.geometry.vertex_buffer.slice(..));
                    rpass.set_index_buffer(
                        binding.geometry.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    rpass.draw_indexed(0..binding.geometry.index_count, 0, 0..1);
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
    }

    /// Bright-pass extraction plus the two blur passes. Leaves the blurred
    /// result in `bloom_a`, where the composite pass reads it.
    fn run_bloom_chain(&self, params: &BloomParams) {
        let mut post = self.post_uniforms(params);
        self.write_post(&post);
        self.blit(
            "bright_pass",
            &self.targets.bloom_a_view,
            &self.post.bright_pipeline,
            &self.bg_hdr,
            None,
        );

        post.blur_dir = [1.0, 0.0];
        self.write_post(&post);
        self.blit(
            "blur_h",
            &self.targets.bloom_b_view,
            &self.post.blur_pipeline,
            &self.bg_from_bloom_a,
            None,
        );

        post.blur_dir = [0.0, 1.0];
        self.write_post(&post);
        self.blit(
            "blur_v",
            &self.targets.bloom_a_view,
            &self.post.blur_pipeline,
            &self.bg_from_bloom_b,
            None,
        );
    }

    /// Additive combine of the HDR scene and the blurred bloom into the
    /// swapchain, with exposure applied.
    fn run_composite(&self, swap_view: &wgpu::TextureView, params: &BloomParams) {
        let post = self.post_uniforms(params);
        self.write_post(&post);
        self.blit(
            "composite",
            swap_view,
            &self.post.composite_pipeline,
            &self.bg_hdr,
            Some(&self.bg_bloom_a_only),
        );
    }

    fn post_uniforms(&self, params: &BloomParams) -> PostUniforms {
        PostUniforms {
            resolution: [
                half_extent(self.width) as f32,
                half_extent(self.height) as f32,
            ],
            blur_dir: [0.0, 0.0],
            strength: params.strength,
            threshold: params.threshold,
            radius: params.radius,
            exposure: params.exposure,
        }
    }

    fn write_post(&self, uniforms: &PostUniforms) {
        self.queue
            .write_buffer(&self.post.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Encode and submit one fullscreen pass. Each pass is its own submit so
    /// the uniform write issued just before it is observed with the intended
    /// values.
    fn blit(
        &self,
        label: &str,
        target: &wgpu::TextureView,
        pipeline: &wgpu::RenderPipeline,
        bg0: &wgpu::BindGroup,
        bg1: Option<&wgpu::BindGroup>,
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut r = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            r.set_pipeline(pipeline);
            r.set_bind_group(0, bg0, &[]);
            if let Some(g1) = bg1 {
                r.set_bind_group(1, g1, &[]);
            }
            r.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
    }
}

fn color_with(color: Vec3, w: f32) -> [f32; 4] {
    [color.x, color.y, color.z, w]
}

fn make_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    cull: wgpu::Face,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_mesh"),
            buffers: &[vertex_buffer_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            cull_mode: Some(cull),
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_mesh"),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        cache: None,
        multiview: None,
    })
}

fn build_post_bind_groups(
    device: &wgpu::Device,
    post: &PostResources,
    targets: &RenderTargets,
    sampler: &wgpu::Sampler,
) -> (
    wgpu::BindGroup,
    wgpu::BindGroup,
    wgpu::BindGroup,
    wgpu::BindGroup,
) {
    let bg0 = |label: &str, view: &wgpu::TextureView| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &post.bgl0,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: post.uniform_buffer.as_entire_binding(),
                },
            ],
        })
    };
    let bg_hdr = bg0("bg_hdr", &targets.hdr_view);
    let bg_from_bloom_a = bg0("bg_from_bloom_a", &targets.bloom_a_view);
    let bg_from_bloom_b = bg0("bg_from_bloom_b", &targets.bloom_b_view);
    let bg_bloom_a_only = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bg_bloom_a_only"),
        layout: &post.bgl1,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&targets.bloom_a_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    (bg_hdr, bg_from_bloom_a, bg_from_bloom_b, bg_bloom_a_only)
}
