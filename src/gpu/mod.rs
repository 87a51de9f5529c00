//! wgpu renderer for the flower field.
//!
//! [`SceneRenderer`] implements [`RenderBoundary`]: the simulation hands it
//! instance transforms and point positions, and it keeps one GPU buffer per
//! batch and point cloud. Two pipelines draw everything:
//!
//! - an instanced textured-quad pipeline (field, petals, highlighted model,
//!   label glyphs) with alpha test and exponential-squared fog
//! - an additive camera-facing sprite pipeline (hover sparkles, fireflies)

#[cfg(feature = "egui")]
mod egui_integration;
mod shaders;

#[cfg(feature = "egui")]
pub use egui_integration::{EguiFrameOutput, EguiIntegration, PanelStats};

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::assets::LabelMesh;
use crate::camera::Camera;
use crate::config::{hex_to_rgb, SceneConfig};
use crate::error::GpuError;
use crate::instances::{Category, InstanceBatch};
use crate::pool::PointBuffer;
use crate::reveal::RevealView;
use crate::simulation::{BatchKind, PointsKind, RenderBoundary};
use crate::textures::{FilterMode, SceneTextures, TextureConfig};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const MAX_LIGHTS: usize = 3;
const FIELD_QUAD_SIZE: f32 = 2.0;
const FIELD_ALPHA_TEST: f32 = 0.3;
const PETAL_ALPHA_TEST: f32 = 0.5;
const AMBIENT: (u32, f32) = (0xffffff, 1.2);
const SUN: (u32, f32, Vec3) = (0xffeedd, 0.8, Vec3::new(50.0, 100.0, 50.0));

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4];
const POINT_POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x3];
const POINT_COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
    fog: [f32; 4],
    ambient: [f32; 4],
    light_pos: [[f32; 4]; MAX_LIGHTS],
    light_color: [[f32; 4]; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct MaterialUniforms {
    tint: [f32; 4],
    emissive: [f32; 4],
    params: [f32; 4],
}

impl MaterialUniforms {
    fn unlit(alpha_test: f32) -> Self {
        Self {
            tint: [1.0, 1.0, 1.0, 1.0],
            emissive: [0.0; 4],
            params: [alpha_test, 0.0, 0.0, 0.0],
        }
    }

    fn lit(tint: u32, emissive: u32, alpha_test: f32) -> Self {
        Self {
            tint: hex_to_rgb(tint).extend(1.0).to_array(),
            emissive: hex_to_rgb(emissive).extend(1.0).to_array(),
            params: [alpha_test, 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SpriteUniforms {
    color: [f32; 4],
    params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// Two triangles over four corners given counter-clockwise.
fn push_quad(out: &mut Vec<Vertex>, corners: [Vec3; 4], normal: Vec3) {
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    for i in [0, 1, 2, 0, 2, 3] {
        out.push(Vertex::new(corners[i], normal, uvs[i]));
    }
}

/// Square of edge `size` lying flat on the ground plane, facing up.
fn flat_quad(size: f32) -> Vec<Vertex> {
    let h = 0.5 * size;
    let mut out = Vec::with_capacity(6);
    push_quad(
        &mut out,
        [
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(-h, 0.0, -h),
        ],
        Vec3::Y,
    );
    out
}

/// Two crossed upright unit quads standing on the origin.
///
/// Stands in for the highlighted model, whose bytes stay opaque to the
/// renderer.
fn crossed_quads() -> Vec<Vertex> {
    let mut out = Vec::with_capacity(12);
    push_quad(
        &mut out,
        [
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::new(-0.5, 1.0, 0.0),
        ],
        Vec3::Z,
    );
    push_quad(
        &mut out,
        [
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(0.0, 0.0, -0.5),
            Vec3::new(0.0, 1.0, -0.5),
            Vec3::new(0.0, 1.0, 0.5),
        ],
        Vec3::X,
    );
    out
}

/// One front-facing quad per glyph cell, on the label's front face.
fn label_vertices(mesh: &LabelMesh) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(mesh.glyphs.len() * 6);
    for glyph in &mesh.glyphs {
        let o = glyph.origin + Vec3::new(0.0, 0.0, 0.5 * mesh.depth);
        push_quad(
            &mut out,
            [
                o,
                o + Vec3::new(glyph.size.x, 0.0, 0.0),
                o + Vec3::new(glyph.size.x, glyph.size.y, 0.0),
                o + Vec3::new(0.0, glyph.size.y, 0.0),
            ],
            Vec3::Z,
        );
    }
    out
}

struct GpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuTexture {
    fn upload(device: &wgpu::Device, queue: &wgpu::Queue, config: &TextureConfig, label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &config.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * config.width),
                rows_per_image: Some(config.height),
            },
            size,
        );

        let filter = match config.filter {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            sampler,
        }
    }
}

/// Uniform block plus texture for one draw.
struct Material {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Material {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniforms: &[u8],
        texture: &GpuTexture,
        label: &str,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: uniforms,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });
        Self { buffer, bind_group }
    }
}

/// One mesh drawn once per visible transform.
struct InstancedDraw {
    vertices: wgpu::Buffer,
    vertex_count: u32,
    instances: wgpu::Buffer,
    capacity: usize,
    visible: u32,
    material: Material,
    uniforms: MaterialUniforms,
}

impl InstancedDraw {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        mesh: &[Vertex],
        capacity: usize,
        uniforms: MaterialUniforms,
        texture: &GpuTexture,
        label: &str,
    ) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(mesh),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity.max(1) * std::mem::size_of::<Mat4>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            vertices,
            vertex_count: mesh.len() as u32,
            instances,
            capacity,
            visible: 0,
            material: Material::new(device, layout, bytemuck::bytes_of(&uniforms), texture, label),
            uniforms,
        }
    }

    fn write_instances(&mut self, queue: &wgpu::Queue, transforms: &[Mat4]) {
        let count = transforms.len().min(self.capacity);
        if count > 0 {
            queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(&transforms[..count]));
        }
        self.visible = count as u32;
    }

    fn set_opacity(&mut self, queue: &wgpu::Queue, opacity: f32) {
        if self.uniforms.tint[3] != opacity {
            self.uniforms.tint[3] = opacity;
            queue.write_buffer(&self.material.buffer, 0, bytemuck::bytes_of(&self.uniforms));
        }
    }

    fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        if self.visible == 0 || self.vertex_count == 0 {
            return;
        }
        pass.set_bind_group(1, &self.material.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_vertex_buffer(1, self.instances.slice(..));
        pass.draw(0..self.vertex_count, 0..self.visible);
    }
}

/// Positions and colours of one sprite cloud.
struct PointCloud {
    positions: wgpu::Buffer,
    colors: wgpu::Buffer,
    capacity: usize,
    count: u32,
    material: Material,
}

impl PointCloud {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
        sprite: SpriteUniforms,
        glow: &GpuTexture,
        label: &str,
    ) -> Self {
        let slots = capacity.max(1);
        let positions = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (slots * std::mem::size_of::<Vec3>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // Clouds without per-point colours keep white and tint in the sprite block
        let white = vec![Vec3::ONE; slots];
        let colors = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&white),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            positions,
            colors,
            capacity,
            count: 0,
            material: Material::new(device, layout, bytemuck::bytes_of(&sprite), glow, label),
        }
    }

    fn write(&mut self, queue: &wgpu::Queue, points: &PointBuffer) {
        let count = points.len().min(self.capacity);
        if count > 0 {
            queue.write_buffer(&self.positions, 0, bytemuck::cast_slice(&points.positions()[..count]));
            if let Some(colors) = points.colors() {
                queue.write_buffer(&self.colors, 0, bytemuck::cast_slice(&colors[..count]));
            }
        }
        self.count = count as u32;
    }

    fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        if self.count == 0 {
            return;
        }
        pass.set_bind_group(1, &self.material.bind_group, &[]);
        pass.set_vertex_buffer(0, self.positions.slice(..));
        pass.set_vertex_buffer(1, self.colors.slice(..));
        pass.draw(0..6, 0..self.count);
    }
}

/// The scene's GPU state.
pub struct SceneRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,

    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    mesh_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,

    field: [InstancedDraw; 2],
    petals: [InstancedDraw; 2],
    model: InstancedDraw,
    label: Option<InstancedDraw>,
    hover: PointCloud,
    fireflies: PointCloud,
    white: GpuTexture,

    uniforms: SceneUniforms,
    background: wgpu::Color,
    fog_color: Vec3,
}

impl SceneRenderer {
    /// Create the surface, device, pipelines and every buffer the scene needs.
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        // Scene block, group 0
        let mut uniforms = SceneUniforms::zeroed();
        uniforms.ambient = (hex_to_rgb(AMBIENT.0) * AMBIENT.1).extend(0.0).to_array();
        uniforms.light_pos[0] = SUN.2.extend(0.0).to_array();
        uniforms.light_color[0] = (hex_to_rgb(SUN.0) * SUN.1).extend(0.0).to_array();
        let fog_color = hex_to_rgb(scene.palette.fog);
        uniforms.fog = fog_color.extend(scene.palette.fog_density).to_array();

        let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        // Material block, group 1
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::mesh_shader().into()),
        });
        let mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &mesh_shader,
            &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MESH_ATTRIBUTES,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Mat4>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &INSTANCE_ATTRIBUTES,
                },
            ],
            config.format,
            wgpu::BlendState::ALPHA_BLENDING,
            true,
            "Mesh Pipeline",
        );

        let point_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::point_shader().into()),
        });
        let point_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &point_shader,
            &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &POINT_POSITION_ATTRIBUTES,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &POINT_COLOR_ATTRIBUTES,
                },
            ],
            config.format,
            ADDITIVE_BLENDING,
            false,
            "Point Pipeline",
        );

        // Textures
        let assets = &scene.assets;
        let textures = SceneTextures::load(&assets.root, &assets.primary_texture, &assets.secondary_texture);
        let primary = GpuTexture::upload(&device, &queue, &textures.primary, "Primary Texture");
        let secondary = GpuTexture::upload(&device, &queue, &textures.secondary, "Secondary Texture");
        let glow = GpuTexture::upload(&device, &queue, &textures.glow, "Glow Texture");
        let white = GpuTexture::upload(&device, &queue, &TextureConfig::solid(255, 255, 255, 255), "White Texture");

        let field_capacity = scene.field.capacity();
        let petal_capacity = scene.petals.count.div_ceil(2);
        let field_mesh = flat_quad(FIELD_QUAD_SIZE);
        let petal_mesh = flat_quad(scene.petals.size);
        let textures_by_category = [&primary, &secondary];

        let field = Category::ALL.map(|category| {
            InstancedDraw::new(
                &device,
                &material_layout,
                &field_mesh,
                field_capacity,
                MaterialUniforms::unlit(FIELD_ALPHA_TEST),
                textures_by_category[category.index()],
                "Field Batch",
            )
        });
        let petals = Category::ALL.map(|category| {
            InstancedDraw::new(
                &device,
                &material_layout,
                &petal_mesh,
                petal_capacity,
                MaterialUniforms::unlit(PETAL_ALPHA_TEST),
                textures_by_category[category.index()],
                "Petal Batch",
            )
        });
        let model = InstancedDraw::new(
            &device,
            &material_layout,
            &crossed_quads(),
            1,
            MaterialUniforms::lit(0xffffff, scene.palette.highlight_emissive, PETAL_ALPHA_TEST),
            &primary,
            "Highlight Model",
        );

        let hover = PointCloud::new(
            &device,
            &material_layout,
            scene.hover.capacity,
            SpriteUniforms {
                color: [1.0, 1.0, 1.0, 1.0],
                params: [scene.hover.size, 0.0, 0.0, 0.0],
            },
            &glow,
            "Hover Sparkles",
        );
        let fireflies = PointCloud::new(
            &device,
            &material_layout,
            scene.fireflies.count,
            SpriteUniforms {
                color: hex_to_rgb(scene.fireflies.color)
                    .extend(scene.fireflies.opacity)
                    .to_array(),
                params: [scene.fireflies.size, 0.0, 0.0, 0.0],
            },
            &glow,
            "Fireflies",
        );

        let bg = hex_to_rgb(scene.palette.background);
        log::info!(
            "Renderer ready: {}x{} {:?}, {} field slots per batch",
            config.width,
            config.height,
            config.format,
            field_capacity
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            scene_buffer,
            scene_bind_group,
            material_layout,
            mesh_pipeline,
            point_pipeline,
            field,
            petals,
            model,
            label: None,
            hover,
            fireflies,
            white,
            uniforms,
            background: wgpu::Color {
                r: bg.x as f64,
                g: bg.y as f64,
                b: bg.z as f64,
                a: 1.0,
            },
            fog_color,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.render_with(|_, _, _, _| {})
    }

    /// Render the scene, then let `overlay` record extra passes onto the
    /// same frame before it is presented.
    pub fn render_with<F>(&mut self, overlay: F) -> Result<(), wgpu::SurfaceError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

            render_pass.set_pipeline(&self.mesh_pipeline);
            for draw in self.field.iter().chain(self.petals.iter()) {
                draw.draw(&mut render_pass);
            }
            self.model.draw(&mut render_pass);
            if let Some(label) = &self.label {
                label.draw(&mut render_pass);
            }

            // Sprites last: additive, no depth writes
            render_pass.set_pipeline(&self.point_pipeline);
            self.hover.draw(&mut render_pass);
            self.fireflies.draw(&mut render_pass);
        }

        overlay(&self.device, &self.queue, &mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn sync_label(&mut self, mesh: &LabelMesh, transform: Mat4, view: &RevealView<'_>) {
        if self.label.is_none() {
            let vertices = label_vertices(mesh);
            log::debug!("Uploading label with {} glyph quads", mesh.glyphs.len());
            self.label = Some(InstancedDraw::new(
                &self.device,
                &self.material_layout,
                &vertices,
                1,
                MaterialUniforms::lit(view.label_color, view.label_emissive, 0.0),
                &self.white,
                "Label",
            ));
        }
        if let Some(label) = &mut self.label {
            label.write_instances(&self.queue, &[transform]);
        }
    }
}

impl RenderBoundary for SceneRenderer {
    fn upload_batch(&mut self, kind: BatchKind, batch: &InstanceBatch) {
        let draw = match kind {
            BatchKind::Field(category) => &mut self.field[category.index()],
            BatchKind::Petals(category) => &mut self.petals[category.index()],
        };
        draw.write_instances(&self.queue, batch.visible_transforms());
    }

    fn upload_points(&mut self, kind: PointsKind, points: &PointBuffer) {
        let cloud = match kind {
            PointsKind::Hover => &mut self.hover,
            PointsKind::Fireflies => &mut self.fireflies,
        };
        cloud.write(&self.queue, points);
    }

    fn set_camera(&mut self, camera: &Camera) {
        let view = camera.view_matrix();
        let inverse = view.inverse();
        self.uniforms.view_proj = (camera.projection_matrix() * view).to_cols_array_2d();
        self.uniforms.camera_pos = camera.position.extend(1.0).to_array();
        self.uniforms.camera_right = inverse.x_axis.truncate().extend(0.0).to_array();
        self.uniforms.camera_up = inverse.y_axis.truncate().extend(0.0).to_array();
    }

    fn set_reveal(&mut self, view: &RevealView<'_>) {
        self.uniforms.fog = self.fog_color.extend(view.fog_density).to_array();

        for draw in &mut self.field {
            draw.set_opacity(&self.queue, view.field_opacity);
        }

        for slot in 1..MAX_LIGHTS {
            let (position, color) = match view.lights.get(slot - 1) {
                Some(light) => (
                    light.position.extend(light.range),
                    (hex_to_rgb(light.color) * light.intensity).extend(0.0),
                ),
                None => (Vec3::ZERO.extend(1.0), Vec3::ZERO.extend(0.0)),
            };
            self.uniforms.light_pos[slot] = position.to_array();
            self.uniforms.light_color[slot] = color.to_array();
        }

        match view.model {
            Some((_, transform)) => self.model.write_instances(&self.queue, &[transform]),
            None => self.model.visible = 0,
        }

        match view.label {
            Some((mesh, transform)) => self.sync_label(mesh, transform, view),
            None => {
                if let Some(label) = &mut self.label {
                    label.visible = 0;
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    depth_write: bool,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Quads are double sided
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FontHandle;

    #[test]
    fn test_uniform_blocks_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 48);
        assert_eq!(std::mem::size_of::<SpriteUniforms>(), 32);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_flat_quad_lies_on_ground() {
        let quad = flat_quad(2.0);
        assert_eq!(quad.len(), 6);
        for v in &quad {
            assert_eq!(v.position[1], 0.0);
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
            assert!(v.position[0].abs() <= 1.0 && v.position[2].abs() <= 1.0);
        }
    }

    #[test]
    fn test_crossed_quads_stand_upright() {
        let mesh = crossed_quads();
        assert_eq!(mesh.len(), 12);
        let top = mesh.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_eq!(top, 1.0);
    }

    #[test]
    fn test_label_vertices_skip_spaces() {
        let font = FontHandle::from_bytes("font", b"{}");
        let mesh = font.layout_label("A B", 1.0, 0.2, 0.0);
        let vertices = label_vertices(&mesh);
        assert_eq!(vertices.len(), 2 * 6);
        // Front face sits at half the extrusion depth
        assert!(vertices.iter().all(|v| (v.position[2] - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_lit_material_carries_colours() {
        let m = MaterialUniforms::lit(0xff0000, 0x000080, 0.25);
        assert_eq!(m.tint, [1.0, 0.0, 0.0, 1.0]);
        assert!((m.emissive[2] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(m.emissive[3], 1.0);
        assert_eq!(m.params[0], 0.25);
    }
}
