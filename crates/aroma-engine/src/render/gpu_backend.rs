use bytemuck::{Pod, Zeroable};

use crate::device::{Gpu, SurfaceStatus, TextureRegistry};
use crate::image::TextureId;
use crate::math::Mat3;
use crate::paint::Color;

use super::pipeline::TexturedVertex;
use super::{Attribute, GraphicsBackend, Uniforms, VertexLayout};

// ── uniform block ─────────────────────────────────────────────────────────

/// std140 image of the WGSL `Uniforms` struct. `mat3x3` columns are padded
/// to `vec4`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct UniformBlock {
    transform: [[f32; 4]; 3],
    projection: [[f32; 4]; 3],
    color: [f32; 4],
    use_texture: u32,
    _pad: [u32; 3],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<UniformBlock>() as u64;

impl UniformBlock {
    fn new(u: &Uniforms) -> Self {
        Self {
            transform: padded_columns(&u.transform),
            projection: padded_columns(&u.projection),
            color: u.color.to_array(),
            use_texture: u32::from(u.use_texture),
            _pad: [0; 3],
        }
    }
}

fn padded_columns(m: &Mat3) -> [[f32; 4]; 3] {
    let c = m.to_cols_array();
    [
        [c[0], c[1], c[2], 0.0],
        [c[3], c[4], c[5], 0.0],
        [c[6], c[7], c[8], 0.0],
    ]
}

fn uniform_binding_size() -> wgpu::BufferSize {
    wgpu::BufferSize::new(UNIFORM_SIZE).expect("UniformBlock has non-zero size by construction")
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

// ── vertex layout ─────────────────────────────────────────────────────────

impl TexturedVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2  // texcoord
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TexturedVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Expands `count` fan vertices from a flat upload into full vertices.
///
/// A disabled or absent texcoord attribute reads as `(0, 0)`.
fn expand_fan_vertices(
    data: &[f32],
    layout: VertexLayout,
    texcoord_enabled: bool,
    count: usize,
) -> Vec<TexturedVertex> {
    let stride = layout.stride();
    let with_uv = texcoord_enabled && layout == VertexLayout::PositionTexCoord;
    data.chunks_exact(stride)
        .take(count)
        .map(|v| TexturedVertex {
            pos: [v[0], v[1]],
            uv: if with_uv { [v[2], v[3]] } else { [0.0, 0.0] },
        })
        .collect()
}

/// Triangle-list indices for a fan starting at `base`.
fn fan_indices(base: u32, count: u32) -> impl Iterator<Item = u32> {
    (1..count.saturating_sub(1)).flat_map(move |i| [base, base + i, base + i + 1])
}

// ── backend ───────────────────────────────────────────────────────────────

struct DrawCall {
    uniform_offset: u32,
    textures: wgpu::BindGroup,
    first_index: u32,
    index_count: u32,
}

/// [`GraphicsBackend`] on wgpu.
///
/// Calls only update emulated state and append to per-frame CPU lists;
/// [`finish_frame`](GraphicsBackend::finish_frame) uploads everything and
/// records one render pass with one `draw_indexed` per fan.
pub struct WgpuBackend {
    gpu: Gpu,
    registry: TextureRegistry,
    white: TextureId,

    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_stride: u64,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    index_buffer: wgpu::Buffer,
    index_capacity: u64,

    // Emulated program state.
    uniforms: Uniforms,
    texture: TextureId,
    layout: VertexLayout,
    staged: Vec<f32>,
    position_enabled: bool,
    texcoord_enabled: bool,

    // Current frame.
    clear: Color,
    vertices: Vec<TexturedVertex>,
    indices: Vec<u32>,
    uniform_data: Vec<u8>,
    draws: Vec<DrawCall>,

    lost: bool,
}

impl WgpuBackend {
    pub fn new(gpu: Gpu, registry: TextureRegistry) -> Self {
        let device = gpu.device().clone();

        let white = registry.create_rgba8(&device, gpu.queue(), "aroma white texture", 1, 1, &[255; 4]);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("aroma quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("aroma uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(uniform_binding_size()),
                },
                count: None,
            }],
        });

        let texture_layout = registry.layout();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("aroma pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("aroma pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[TexturedVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = align_up(UNIFORM_SIZE, alignment.max(1));

        let uniform_capacity = 64;
        let uniform_buffer = create_buffer(
            &device,
            "aroma uniform buffer",
            uniform_capacity * uniform_stride,
            wgpu::BufferUsages::UNIFORM,
        );
        let uniform_bind_group = create_uniform_bind_group(&device, &uniform_layout, &uniform_buffer);

        let vertex_capacity = 4096;
        let vertex_buffer = create_buffer(&device, "aroma vertex buffer", vertex_capacity, wgpu::BufferUsages::VERTEX);
        let index_capacity = 4096;
        let index_buffer = create_buffer(&device, "aroma index buffer", index_capacity, wgpu::BufferUsages::INDEX);

        Self {
            gpu,
            registry,
            white,
            pipeline,
            uniform_layout,
            uniform_stride,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            vertex_buffer,
            vertex_capacity,
            index_buffer,
            index_capacity,
            uniforms: Uniforms {
                transform: Mat3::IDENTITY,
                projection: Mat3::IDENTITY,
                color: Color::WHITE,
                use_texture: false,
            },
            texture: TextureId::NONE,
            layout: VertexLayout::Position,
            staged: Vec::new(),
            position_enabled: false,
            texcoord_enabled: false,
            clear: Color::BLACK,
            vertices: Vec::new(),
            indices: Vec::new(),
            uniform_data: Vec::new(),
            draws: Vec::new(),
            lost: false,
        }
    }

    fn reset_frame(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.uniform_data.clear();
        self.draws.clear();
    }

    fn texture_bind_group(&self) -> Option<wgpu::BindGroup> {
        if self.uniforms.use_texture {
            if let Some(bg) = self.registry.bind_group(self.texture) {
                return Some(bg);
            }
            log::debug!("texture {} is not resident; drawing untextured", self.texture.0);
        }
        self.registry.bind_group(self.white)
    }

    fn ensure_capacity(&mut self) {
        let device = self.gpu.device();

        let uniform_blocks = self.draws.len() as u64;
        if uniform_blocks > self.uniform_capacity {
            self.uniform_capacity = uniform_blocks.next_power_of_two();
            self.uniform_buffer = create_buffer(
                device,
                "aroma uniform buffer",
                self.uniform_capacity * self.uniform_stride,
                wgpu::BufferUsages::UNIFORM,
            );
            self.uniform_bind_group = create_uniform_bind_group(device, &self.uniform_layout, &self.uniform_buffer);
        }

        let vertex_bytes = std::mem::size_of_val(self.vertices.as_slice()) as u64;
        if vertex_bytes > self.vertex_capacity {
            self.vertex_capacity = vertex_bytes.next_power_of_two();
            self.vertex_buffer =
                create_buffer(device, "aroma vertex buffer", self.vertex_capacity, wgpu::BufferUsages::VERTEX);
        }

        let index_bytes = std::mem::size_of_val(self.indices.as_slice()) as u64;
        if index_bytes > self.index_capacity {
            self.index_capacity = index_bytes.next_power_of_two();
            self.index_buffer =
                create_buffer(device, "aroma index buffer", self.index_capacity, wgpu::BufferUsages::INDEX);
        }
    }

    fn present(&mut self) {
        self.ensure_capacity();

        let queue = self.gpu.queue();
        if !self.draws.is_empty() {
            queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_data);
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&self.indices));
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                match self.gpu.recover(&err) {
                    SurfaceStatus::Lost => {
                        log::error!("surface lost: {err}");
                        self.lost = true;
                    }
                    status => log::debug!("frame skipped ({status:?}): {err}"),
                }
                return;
            }
        };

        {
            let c = self.clear;
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("aroma frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(c.r),
                            g: f64::from(c.g),
                            b: f64::from(c.b),
                            a: f64::from(c.a),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if !self.draws.is_empty() {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for draw in &self.draws {
                    rpass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                    rpass.set_bind_group(1, &draw.textures, &[]);
                    rpass.draw_indexed(draw.first_index..draw.first_index + draw.index_count, 0, 0..1);
                }
            }
        }

        self.gpu.submit(frame);
    }
}

impl GraphicsBackend for WgpuBackend {
    fn clear(&mut self, color: Color) {
        // A clear wipes whatever was drawn before it.
        self.clear = color;
        self.reset_frame();
    }

    fn set_uniforms(&mut self, uniforms: &Uniforms) {
        self.uniforms = *uniforms;
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.texture = texture;
    }

    fn upload_vertices(&mut self, layout: VertexLayout, data: &[f32]) {
        self.layout = layout;
        self.staged.clear();
        self.staged.extend_from_slice(data);
    }

    fn set_attribute_enabled(&mut self, attribute: Attribute, enabled: bool) {
        match attribute {
            Attribute::Position => self.position_enabled = enabled,
            Attribute::TexCoord => self.texcoord_enabled = enabled,
        }
    }

    fn draw_triangle_fan(&mut self, vertex_count: u32) {
        if !self.position_enabled || vertex_count < 3 {
            return;
        }

        let fan = expand_fan_vertices(&self.staged, self.layout, self.texcoord_enabled, vertex_count as usize);
        if fan.len() < 3 {
            log::debug!("draw of {vertex_count} vertices with only {} uploaded; skipped", fan.len());
            return;
        }

        let Some(textures) = self.texture_bind_group() else { return };

        let base = self.vertices.len() as u32;
        let first_index = self.indices.len() as u32;
        self.indices.extend(fan_indices(base, fan.len() as u32));
        self.vertices.extend(fan);

        let uniform_offset = self.uniform_data.len() as u32;
        self.uniform_data.extend_from_slice(bytemuck::bytes_of(&UniformBlock::new(&self.uniforms)));
        self.uniform_data.resize(uniform_offset as usize + self.uniform_stride as usize, 0);

        self.draws.push(DrawCall {
            uniform_offset,
            textures,
            first_index,
            index_count: self.indices.len() as u32 - first_index,
        });
    }

    fn finish_frame(&mut self) {
        if !self.lost {
            self.present();
        }
        self.reset_frame();
    }

    fn device_lost(&self) -> bool {
        self.lost
    }
}

fn create_buffer(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("aroma uniforms bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: Some(uniform_binding_size()),
            }),
        }],
    })
}
