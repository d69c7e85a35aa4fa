//! GPU-instanced particle render pipeline
//!
//! Renders world-space quads via one instanced draw call per frame.
//! Instance data comes from a persistent storage buffer sized to pool
//! capacity at creation and rewritten in place each frame — no per-frame
//! buffer allocation. Three pipelines share one shader module, differing
//! only in the fragment entry point (square / circle / triangle).

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use ember_particles::{InstanceRecord, Mat4, ParticleShape, RenderSurface};

/// Frame uniforms — matches the WGSL `Uniforms` struct (16-byte padded).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub thickness: f32,
    pub _pad: [f32; 3],
}

/// The particle rendering pipeline (one variant per shape)
pub struct ParticleRenderer {
    square_pipeline: wgpu::RenderPipeline,
    circle_pipeline: wgpu::RenderPipeline,
    triangle_pipeline: wgpu::RenderPipeline,
    quad_index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_bind_group: wgpu::BindGroup,
    capacity: usize,
    instance_count: u32,
    shape: ParticleShape,
    thickness: f32,
}

impl ParticleRenderer {
    /// `capacity` fixes the instance buffer size; submissions can never
    /// write past it because the packer is bounded by the same pool capacity.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, capacity: usize) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("particle_shader.wgsl").into()),
        });

        // Group 0: frame uniforms (matrices + shape thickness)
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("Particle Uniform Bind Group Layout"),
            });

        // Group 1: instance storage buffer (read-only)
        let instance_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Particle Instance Bind Group Layout"),
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &instance_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Additive blend so overlapping particles accumulate into the
        // HDR target before the bloom pass
        let additive_blend = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let make_pipeline = |label: &str, fs_entry: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_particle"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(additive_blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
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
                multiview: None,
                cache: None,
            })
        };

        let square_pipeline = make_pipeline("Particle Square Pipeline", "fs_square");
        let circle_pipeline = make_pipeline("Particle Circle Pipeline", "fs_circle");
        let triangle_pipeline = make_pipeline("Particle Triangle Pipeline", "fs_triangle");

        // Shared quad index buffer; corners come from vertex pulling
        let quad_indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Quad Index Buffer"),
            contents: bytemuck::cast_slice(&quad_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Uniform Buffer"),
            size: std::mem::size_of::<ParticleUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("Particle Uniform Bind Group"),
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Instance Buffer"),
            size: (std::mem::size_of::<InstanceRecord>() * capacity.max(1)) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instance_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &instance_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: instance_buffer.as_entire_binding(),
            }],
            label: Some("Particle Instance Bind Group"),
        });

        Self {
            square_pipeline,
            circle_pipeline,
            triangle_pipeline,
            quad_index_buffer,
            uniform_buffer,
            uniform_bind_group,
            instance_buffer,
            instance_bind_group,
            capacity,
            instance_count: 0,
            shape: ParticleShape::default(),
            thickness: 1.0,
        }
    }

    /// Select the shape pipeline and outline thickness for the next draw
    pub fn set_shape(&mut self, shape: ParticleShape, thickness: f32) {
        self.shape = shape;
        self.thickness = thickness;
    }

    /// Upload one frame's packed records and camera matrices. The records
    /// slice is consumed here and never retained.
    pub fn upload(
        &mut self,
        queue: &wgpu::Queue,
        records: &[InstanceRecord],
        view: Mat4,
        projection: Mat4,
    ) {
        debug_assert!(records.len() <= self.capacity);
        self.instance_count = records.len() as u32;
        if !records.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(records));
        }
        let uniforms = ParticleUniforms {
            view,
            projection,
            thickness: self.thickness.clamp(0.0, 1.0),
            _pad: [0.0; 3],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Borrow this renderer as the core's render surface for one frame
    pub fn surface<'a>(&'a mut self, queue: &'a wgpu::Queue) -> ParticleSurface<'a> {
        ParticleSurface {
            renderer: self,
            queue,
        }
    }

    /// Issue the instanced draw for the last uploaded frame
    pub fn draw<'p>(&'p self, pass: &mut wgpu::RenderPass<'p>) {
        if self.instance_count == 0 {
            return;
        }
        let pipeline = match self.shape {
            ParticleShape::Square => &self.square_pipeline,
            ParticleShape::Circle => &self.circle_pipeline,
            ParticleShape::Triangle => &self.triangle_pipeline,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.instance_bind_group, &[]);
        pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..6, 0, 0..self.instance_count);
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }
}

/// Per-frame adapter binding the renderer to a queue, implementing the
/// core's `RenderSurface` seam.
pub struct ParticleSurface<'a> {
    renderer: &'a mut ParticleRenderer,
    queue: &'a wgpu::Queue,
}

impl RenderSurface for ParticleSurface<'_> {
    fn submit(&mut self, records: &[InstanceRecord], view: Mat4, projection: Mat4) {
        self.renderer.upload(self.queue, records, view, projection);
    }
}
