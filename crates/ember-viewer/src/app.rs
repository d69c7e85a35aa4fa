//! Main viewer application — combines the wgpu particle renderer with an
//! egui control panel. Holding the left mouse button emits particles where
//! the cursor crosses the emission plane.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use ember_particles::{EmitterConfig, ParticleEffect, ParticleShape};
use ember_render::{
    Camera, ParticleRenderer, PostProcessConfig, PostProcessPipeline, PostProcessResources,
    RenderContext, HDR_FORMAT,
};

/// Startup options for the viewer
pub struct ViewerOptions {
    /// Particle pool capacity
    pub capacity: usize,
    /// Seed for the jitter generator
    pub seed: u32,
    /// Emitter settings loaded from a preset file, if any
    pub preset: Option<EmitterConfig>,
    /// Start with bloom enabled
    pub bloom: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            seed: 1,
            preset: None,
            bloom: true,
        }
    }
}

/// Run the viewer application
pub fn run(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(options);
    event_loop.run_app(&mut app)?;

    Ok(())
}

pub struct ViewerApp {
    effect: ParticleEffect,
    post_config: PostProcessConfig,

    window: Option<Arc<Window>>,
    render_context: Option<RenderContext>,
    particle_renderer: Option<ParticleRenderer>,
    post_pipeline: Option<PostProcessPipeline>,
    post_resources: Option<PostProcessResources>,
    camera: Camera,

    // Input state
    left_mouse_pressed: bool,
    right_mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,

    // egui state
    egui_ctx: egui::Context,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    show_panel: bool,

    // Timing
    started: Instant,
    last_frame_time: Instant,
    fps_smoothed: f32,
}

impl ViewerApp {
    fn new(options: ViewerOptions) -> Self {
        let effect = match options.preset {
            Some(config) => ParticleEffect::with_config(options.capacity, options.seed, config),
            None => ParticleEffect::new(options.capacity, options.seed),
        };

        Self {
            effect,
            post_config: PostProcessConfig {
                bloom_enabled: options.bloom,
                ..Default::default()
            },
            window: None,
            render_context: None,
            particle_renderer: None,
            post_pipeline: None,
            post_resources: None,
            camera: Camera::new(),
            left_mouse_pressed: false,
            right_mouse_pressed: false,
            last_mouse_pos: None,
            egui_ctx: egui::Context::default(),
            egui_winit: None,
            egui_renderer: None,
            show_panel: true,
            started: Instant::now(),
            last_frame_time: Instant::now(),
            fps_smoothed: 0.0,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title("Ember Viewer")
            .with_inner_size(PhysicalSize::new(1600, 900));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create viewer window")?,
        );
        self.window = Some(window.clone());

        let render_context = pollster::block_on(RenderContext::new(window.clone()))
            .context("Failed to initialize viewer render context")?;

        self.camera.aspect = render_context.aspect_ratio();
        self.camera.update_orbit();

        // Initialize egui
        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &render_context.device,
            render_context.config.format,
            None,
            1,
            false,
        );

        let particle_renderer = ParticleRenderer::new(
            &render_context.device,
            HDR_FORMAT,
            self.effect.capacity(),
        );

        let post_pipeline =
            PostProcessPipeline::new(&render_context.device, render_context.config.format);
        let post_resources = PostProcessResources::new(
            &render_context.device,
            &post_pipeline,
            render_context.config.width,
            render_context.config.height,
        );
        post_pipeline.write_texel_size(
            &render_context.queue,
            render_context.config.width,
            render_context.config.height,
        );

        println!(
            "Pool capacity: {} particles (seedable jitter, bloom {})",
            self.effect.capacity(),
            if self.post_config.bloom_enabled { "on" } else { "off" }
        );

        self.render_context = Some(render_context);
        self.particle_renderer = Some(particle_renderer);
        self.post_pipeline = Some(post_pipeline);
        self.post_resources = Some(post_resources);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        Ok(())
    }

    /// Cursor position in normalized device coordinates (x right, y up)
    fn cursor_ndc(&self) -> Option<(f32, f32)> {
        let (mx, my) = self.last_mouse_pos?;
        let context = self.render_context.as_ref()?;
        let w = context.config.width.max(1) as f32;
        let h = context.config.height.max(1) as f32;
        Some(((2.0 * mx as f32 / w) - 1.0, 1.0 - (2.0 * my as f32 / h)))
    }

    fn render(&mut self) {
        if self.render_context.is_none()
            || self.particle_renderer.is_none()
            || self.post_pipeline.is_none()
            || self.post_resources.is_none()
            || self.window.is_none()
        {
            return;
        }

        let now = self.started.elapsed().as_secs_f32();

        let frame_time = Instant::now();
        let dt = (frame_time - self.last_frame_time).as_secs_f32();
        self.last_frame_time = frame_time;
        if dt > 0.0 {
            self.fps_smoothed = self.fps_smoothed * 0.95 + (1.0 / dt) * 0.05;
        }

        // Emit at the cursor while the left button is held
        if self.left_mouse_pressed {
            if let Some((ndc_x, ndc_y)) = self.cursor_ndc() {
                if let Some(hit) = self.camera.cursor_on_emission_plane(ndc_x, ndc_y) {
                    self.effect.emit(hit.to_array(), now);
                }
            }
        }

        self.effect.advance(now);

        let output = match self
            .render_context
            .as_ref()
            .unwrap()
            .surface
            .get_current_texture()
        {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if let Some(context) = &self.render_context {
                    context.reconfigure();
                }
                return;
            }
            Err(e) => {
                eprintln!("Surface error: {:?}", e);
                return;
            }
        };

        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Pack and upload this frame's instances, then draw into the HDR
        // target and composite onto the surface
        {
            let context = self.render_context.as_ref().unwrap();
            let renderer = self.particle_renderer.as_mut().unwrap();
            let pipeline = self.post_pipeline.as_ref().unwrap();
            let resources = self.post_resources.as_ref().unwrap();

            renderer.set_shape(self.effect.config.shape, self.effect.config.shape_thickness);
            let view = self.camera.view_matrix();
            let projection = self.camera.projection_matrix();
            self.effect
                .render(now, &mut renderer.surface(&context.queue), view, projection);

            let mut encoder =
                context
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("Particle Encoder"),
                    });

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Particle Scene Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &resources.scene_view,
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
                renderer.draw(&mut pass);
            }

            if self.post_config.bloom_enabled {
                pipeline.blur(&mut encoder, resources, self.post_config.blur_iterations);
            }
            pipeline.composite(
                &mut encoder,
                resources,
                self.post_config.bloom_enabled,
                &surface_view,
            );

            context.queue.submit(std::iter::once(encoder.finish()));
        }

        self.render_egui(&surface_view);

        output.present();
    }

    fn render_egui(&mut self, target_view: &wgpu::TextureView) {
        // Extract references to disjoint fields to satisfy the borrow checker
        let window = match &self.window {
            Some(w) => w.clone(),
            None => return,
        };
        let context = match &self.render_context {
            Some(c) => c,
            None => return,
        };
        let egui_winit = match &mut self.egui_winit {
            Some(e) => e,
            None => return,
        };

        let raw_input = egui_winit.take_egui_input(&window);

        let show_panel = self.show_panel;
        let alive = self.effect.alive_particles_count();
        let capacity = self.effect.capacity();
        let dropped = self.effect.dropped_particles();
        let instances = self
            .particle_renderer
            .as_ref()
            .map(|r| r.instance_count())
            .unwrap_or(0);
        let fps = self.fps_smoothed;
        let config = &mut self.effect.config;
        let post_config = &mut self.post_config;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if !show_panel {
                return;
            }

            egui::SidePanel::right("emitter_panel")
                .default_width(280.0)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.heading("Emitter");
                    ui.separator();

                    ui.horizontal(|ui| {
                        ui.label("Start color");
                        ui.color_edit_button_rgba_unmultiplied(&mut config.start_color);
                    });
                    ui.horizontal(|ui| {
                        ui.label("End color");
                        ui.color_edit_button_rgba_unmultiplied(&mut config.end_color);
                    });

                    ui.add(
                        egui::Slider::new(&mut config.lifetime, 0.1..=20.0).text("Lifetime (s)"),
                    );
                    ui.add(
                        egui::Slider::new(&mut config.spawn_count, 0..=500)
                            .text("Spawn per frame"),
                    );
                    ui.add(
                        egui::Slider::new(&mut config.scale, 0.0005..=0.05)
                            .logarithmic(true)
                            .text("Scale"),
                    );

                    egui::ComboBox::from_label("Shape")
                        .selected_text(config.shape.label())
                        .show_ui(ui, |ui| {
                            for shape in [
                                ParticleShape::Square,
                                ParticleShape::Circle,
                                ParticleShape::Triangle,
                            ] {
                                ui.selectable_value(&mut config.shape, shape, shape.label());
                            }
                        });
                    ui.add(
                        egui::Slider::new(&mut config.shape_thickness, 0.05..=1.0)
                            .text("Thickness"),
                    );

                    ui.separator();
                    ui.label("Initial velocity");
                    ui.horizontal(|ui| {
                        for component in &mut config.initial_velocity {
                            ui.add(egui::DragValue::new(component).speed(0.001));
                        }
                    });
                    ui.label("Acceleration");
                    ui.horizontal(|ui| {
                        for component in &mut config.acceleration {
                            ui.add(egui::DragValue::new(component).speed(0.0001));
                        }
                    });
                    ui.checkbox(&mut config.random_velocity, "Randomize velocity");
                    ui.checkbox(&mut config.random_acceleration, "Randomize acceleration");

                    ui.separator();
                    ui.heading("Post-processing");
                    ui.checkbox(&mut post_config.bloom_enabled, "Bloom");
                    ui.add_enabled(
                        post_config.bloom_enabled,
                        egui::Slider::new(&mut post_config.blur_iterations, 1..=10)
                            .text("Blur iterations"),
                    );

                    ui.separator();
                    ui.label(format!("Alive: {} / {}", alive, capacity));
                    ui.label(format!("Instances drawn: {}", instances));
                    ui.label(format!("Dropped: {}", dropped));
                    ui.label(format!("FPS: {:.1}", fps));
                    ui.separator();
                    ui.small("Hold left mouse to emit. Right-drag orbits, scroll zooms.");
                });
        });

        egui_winit.handle_platform_output(&window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [context.config.width, context.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut egui_renderer = match self.egui_renderer.take() {
            Some(r) => r,
            None => return,
        };

        let mut encoder =
            context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("egui Encoder"),
                });

        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(&context.device, &context.queue, *id, image_delta);
        }

        egui_renderer.update_buffers(
            &context.device,
            &context.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        context.queue.submit(std::iter::once(encoder.finish()));

        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        self.egui_renderer = Some(egui_renderer);
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.initialize(event_loop) {
                eprintln!("Failed to initialize viewer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle the event first
        if let Some(egui_winit) = &mut self.egui_winit {
            if let Some(window) = &self.window {
                let response = egui_winit.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(context) = &mut self.render_context {
                    context.resize(new_size);
                    self.camera.aspect = context.aspect_ratio();
                    let target = (context.config.width, context.config.height);
                    let stale = self
                        .post_resources
                        .as_ref()
                        .map(|r| r.size() != target)
                        .unwrap_or(true);
                    if stale {
                        if let Some(pipeline) = &self.post_pipeline {
                            self.post_resources = Some(PostProcessResources::new(
                                &context.device,
                                pipeline,
                                target.0,
                                target.1,
                            ));
                            pipeline.write_texel_size(&context.queue, target.0, target.1);
                        }
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            event_loop.exit();
                        }
                        PhysicalKey::Code(KeyCode::Tab) => {
                            self.show_panel = !self.show_panel;
                        }
                        PhysicalKey::Code(KeyCode::Space) => {
                            // Reset camera to the default orbit
                            self.camera.yaw = 0.0;
                            self.camera.pitch = 0.0;
                            self.camera.distance = 3.0;
                            self.camera.update_orbit();
                        }
                        _ => {}
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => match button {
                MouseButton::Left => {
                    self.left_mouse_pressed = state == ElementState::Pressed;
                }
                MouseButton::Right => {
                    self.right_mouse_pressed = state == ElementState::Pressed;
                }
                _ => {}
            },

            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = self.last_mouse_pos {
                    if self.right_mouse_pressed {
                        let dx = (position.x - last_x) as f32;
                        let dy = (position.y - last_y) as f32;
                        self.camera.orbit_horizontal(-dx * 0.01);
                        self.camera.orbit_vertical(-dy * 0.01);
                    }
                }
                self.last_mouse_pos = Some((position.x, position.y));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.camera.zoom(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.render();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
