//! Post-processing: offscreen HDR particle layer, separable Gaussian blur,
//! additive bloom composite
//!
//! Particles render into an Rgba16Float scene target. The blur ping-pongs
//! between two same-size textures (horizontal then vertical per iteration),
//! and the composite pass adds the blurred layer back onto the scene while
//! writing to the sRGB surface.

use bytemuck::{Pod, Zeroable};

/// HDR texture format for the scene target and blur chain
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Runtime-adjustable post-processing parameters
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    pub bloom_enabled: bool,
    /// Blur iterations; each runs one horizontal and one vertical pass
    pub blur_iterations: u32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            bloom_enabled: true,
            blur_iterations: 4,
        }
    }
}

/// Uniform data for one blur direction — matches WGSL `BlurUniforms`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BlurUniforms {
    pub texel_size: [f32; 2],
    pub horizontal: u32,
    pub _pad: u32,
}

/// Pipelines and direction uniforms; created once per device.
pub struct PostProcessPipeline {
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    blur_uniform_bgl: wgpu::BindGroupLayout,
    blur_texture_bgl: wgpu::BindGroupLayout,
    composite_texture_bgl: wgpu::BindGroupLayout,
    /// One uniform buffer per blur direction so a whole blur chain can be
    /// encoded without rewriting uniforms mid-submission
    horizontal_bind_group: wgpu::BindGroup,
    vertical_bind_group: wgpu::BindGroup,
    horizontal_buffer: wgpu::Buffer,
    vertical_buffer: wgpu::Buffer,
    linear_sampler: wgpu::Sampler,
    /// 1x1 black stand-in for the bloom input when bloom is disabled
    black_view: wgpu::TextureView,
}

impl PostProcessPipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("PostProcess Linear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let texture_bgl_entries = [
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];

        // --- Blur pipeline ---
        let blur_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blur_shader.wgsl").into()),
        });

        let blur_uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Uniform BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let blur_texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Texture BGL"),
            entries: &texture_bgl_entries,
        });

        let blur_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blur Pipeline Layout"),
            bind_group_layouts: &[&blur_uniform_bgl, &blur_texture_bgl],
            push_constant_ranges: &[],
        });

        let blur_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blur Pipeline"),
            layout: Some(&blur_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blur_shader,
                entry_point: Some("vs_blur"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blur_shader,
                entry_point: Some("fs_blur"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // --- Composite pipeline ---
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("composite_shader.wgsl").into()),
        });

        let composite_texture_bgl =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Composite Texture BGL"),
                entries: &texture_bgl_entries,
            });

        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Composite Pipeline Layout"),
                bind_group_layouts: &[&composite_texture_bgl, &composite_texture_bgl],
                push_constant_ranges: &[],
            });

        let composite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&composite_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &composite_shader,
                entry_point: Some("vs_composite"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &composite_shader,
                entry_point: Some("fs_composite"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Direction uniform buffers + bind groups (texel size filled on resize)
        let horizontal_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blur Horizontal Uniform Buffer"),
            size: std::mem::size_of::<BlurUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertical_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blur Vertical Uniform Buffer"),
            size: std::mem::size_of::<BlurUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let horizontal_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &blur_uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: horizontal_buffer.as_entire_binding(),
            }],
            label: Some("Blur Horizontal Bind Group"),
        });
        let vertical_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &blur_uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: vertical_buffer.as_entire_binding(),
            }],
            label: Some("Blur Vertical Bind Group"),
        });

        let black_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Black Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let black_view = black_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            blur_pipeline,
            composite_pipeline,
            blur_uniform_bgl,
            blur_texture_bgl,
            composite_texture_bgl,
            horizontal_bind_group,
            vertical_bind_group,
            horizontal_buffer,
            vertical_buffer,
            linear_sampler,
            black_view,
        }
    }

    /// Refresh the texel size in both direction uniforms; call at startup
    /// and whenever the surface is resized.
    pub fn write_texel_size(&self, queue: &wgpu::Queue, width: u32, height: u32) {
        let texel_size = [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32];
        let horizontal = BlurUniforms {
            texel_size,
            horizontal: 1,
            _pad: 0,
        };
        let vertical = BlurUniforms {
            texel_size,
            horizontal: 0,
            _pad: 0,
        };
        queue.write_buffer(&self.horizontal_buffer, 0, bytemuck::cast_slice(&[horizontal]));
        queue.write_buffer(&self.vertical_buffer, 0, bytemuck::cast_slice(&[vertical]));
    }

    /// Run the ping-pong blur over the scene target. The blurred result
    /// lands in `resources.bloom_view()`.
    pub fn blur(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        resources: &PostProcessResources,
        iterations: u32,
    ) {
        let mut blur_pass = |target: &wgpu::TextureView,
                             direction: &wgpu::BindGroup,
                             input: &wgpu::BindGroup| {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.blur_pipeline);
            pass.set_bind_group(0, direction, &[]);
            pass.set_bind_group(1, input, &[]);
            pass.draw(0..3, 0..1);
        };

        // First pair reads the scene target, later pairs ping-pong
        blur_pass(
            &resources.blur_views[0],
            &self.horizontal_bind_group,
            &resources.scene_input_bind_group,
        );
        blur_pass(
            &resources.blur_views[1],
            &self.vertical_bind_group,
            &resources.blur_input_bind_groups[0],
        );

        for _ in 1..iterations.max(1) {
            blur_pass(
                &resources.blur_views[0],
                &self.horizontal_bind_group,
                &resources.blur_input_bind_groups[1],
            );
            blur_pass(
                &resources.blur_views[1],
                &self.vertical_bind_group,
                &resources.blur_input_bind_groups[0],
            );
        }
    }

    /// Additively combine the scene target and the blurred bloom layer
    /// into the surface. With bloom disabled the bloom input is black.
    pub fn composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        resources: &PostProcessResources,
        bloom_enabled: bool,
        target: &wgpu::TextureView,
    ) {
        let bloom_input = if bloom_enabled {
            &resources.bloom_input_bind_group
        } else {
            &resources.black_input_bind_group
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
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
        pass.set_pipeline(&self.composite_pipeline);
        pass.set_bind_group(0, &resources.composite_scene_bind_group, &[]);
        pass.set_bind_group(1, bloom_input, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Size-dependent GPU resources: the HDR scene target, the blur ping-pong
/// pair, and the bind groups reading them. Recreated on resize.
pub struct PostProcessResources {
    pub scene_view: wgpu::TextureView,
    blur_views: [wgpu::TextureView; 2],
    scene_input_bind_group: wgpu::BindGroup,
    blur_input_bind_groups: [wgpu::BindGroup; 2],
    composite_scene_bind_group: wgpu::BindGroup,
    bloom_input_bind_group: wgpu::BindGroup,
    black_input_bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl PostProcessResources {
    pub fn new(
        device: &wgpu::Device,
        pipeline: &PostProcessPipeline,
        width: u32,
        height: u32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let make_target = |label: &str| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: HDR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            texture.create_view(&wgpu::TextureViewDescriptor::default())
        };

        let scene_view = make_target("Scene HDR Target");
        let blur_views = [
            make_target("Blur Ping Target"),
            make_target("Blur Pong Target"),
        ];

        let make_input = |layout: &wgpu::BindGroupLayout, view: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&pipeline.linear_sampler),
                    },
                ],
                label: Some(label),
            })
        };

        let scene_input_bind_group =
            make_input(&pipeline.blur_texture_bgl, &scene_view, "Blur Scene Input");
        let blur_input_bind_groups = [
            make_input(&pipeline.blur_texture_bgl, &blur_views[0], "Blur Ping Input"),
            make_input(&pipeline.blur_texture_bgl, &blur_views[1], "Blur Pong Input"),
        ];
        let composite_scene_bind_group = make_input(
            &pipeline.composite_texture_bgl,
            &scene_view,
            "Composite Scene Input",
        );
        let bloom_input_bind_group = make_input(
            &pipeline.composite_texture_bgl,
            &blur_views[1],
            "Composite Bloom Input",
        );
        let black_input_bind_group = make_input(
            &pipeline.composite_texture_bgl,
            &pipeline.black_view,
            "Composite Black Input",
        );

        Self {
            scene_view,
            blur_views,
            scene_input_bind_group,
            blur_input_bind_groups,
            composite_scene_bind_group,
            bloom_input_bind_group,
            black_input_bind_group,
            width,
            height,
        }
    }

    /// Dimensions these targets were built for; rebuild when the surface
    /// no longer matches.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
