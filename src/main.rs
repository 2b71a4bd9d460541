// Isometric room viewer with INSTANCED rendering
// Every room part is one unit-box instance; a single bevy_ecs schedule per
// frame drives door clicks, clip playback and wall/floor/ceiling visibility.

mod engine;

use anyhow::{Context, Result};
use bevy_ecs::prelude::*;
use clap::Parser;
use glam::Mat4;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::animation::ClipPlayer;
use engine::camera::OrbitCamera;
use engine::config::{LightingConfig, RoomConfig};
use engine::debug_overlay::{DebugOverlay, DebugStats, DoorStatus, PerfStats, RenderTweaks};
use engine::doors::{DoorClicked, DoorController, DoorId, DoorStateChanged};
use engine::input::InputState;
use engine::mesh::{GpuVertex, unit_box};
use engine::picking::{self, Ray};
use engine::room::{Room, spawn_room};
use engine::systems::{self, DoorHistory};
use engine::visibility::{CameraDirection, SurfaceKind, SurfaceMaterial};
use engine::{FrameTime, Visible};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MAX_INSTANCES: usize = 64;
/// Long stalls (window drag, breakpoint) are clamped so clips don't jump.
const MAX_FRAME_DT: f32 = 0.1;

#[derive(Parser, Debug)]
#[command(name = "isometric_room")]
#[command(about = "Isometric room with camera-driven wall visibility and clickable doors")]
struct Args {
    /// RON room config; built-in defaults when omitted
    config: Option<PathBuf>,

    /// Show the debug panel at startup (F3 toggles it)
    #[arg(long)]
    debug: bool,

    /// Track frame timing and log FPS once per second
    #[arg(long)]
    perf: bool,
}

// ============================================================================
// INSTANCE DATA (per-mesh)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,  // One per instance, not per vertex
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// ============================================================================
// UNIFORM DATA (camera + lights)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    /// ambient, directional, exposure, tone-mapping operator
    params: [f32; 4],
}

impl Uniforms {
    fn new(view_proj: Mat4, lighting: &LightingConfig) -> Self {
        let light = lighting.directional_position.normalize_or_zero();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: light.extend(0.0).to_array(),
            params: [
                lighting.ambient_intensity,
                lighting.directional_intensity,
                lighting.exposure,
                lighting.tone_mapping.shader_index(),
            ],
        }
    }
}

// ============================================================================
// FRAME TIMING (--perf)
// ============================================================================

struct FrameTimer {
    window_start: Instant,
    frames: u32,
    sum_ms: f32,
    min_ms: f32,
    max_ms: f32,
    /// Numbers from the last completed one-second window.
    fps: u32,
    avg_ms: f32,
    last_min_ms: f32,
    last_max_ms: f32,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            sum_ms: 0.0,
            min_ms: f32::MAX,
            max_ms: 0.0,
            fps: 0,
            avg_ms: 0.0,
            last_min_ms: 0.0,
            last_max_ms: 0.0,
        }
    }

    fn record(&mut self, dt: f32) {
        let ms = dt * 1000.0;
        self.frames += 1;
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);

        let now = Instant::now();
        if (now - self.window_start).as_secs_f32() >= 1.0 {
            self.fps = self.frames;
            self.avg_ms = self.sum_ms / self.frames as f32;
            self.last_min_ms = self.min_ms;
            self.last_max_ms = self.max_ms;
            log::info!(
                "FPS: {} | frame {:.2} ms (min {:.1} | max {:.1})",
                self.fps, self.avg_ms, self.last_min_ms, self.last_max_ms
            );
            self.window_start = now;
            self.frames = 0;
            self.sum_ms = 0.0;
            self.min_ms = f32::MAX;
            self.max_ms = 0.0;
        }
    }

    fn snapshot(&self, draw_calls: u32, instances: usize) -> PerfStats {
        PerfStats {
            fps: self.fps,
            frame_time_avg_ms: self.avg_ms,
            frame_time_min_ms: self.last_min_ms,
            frame_time_max_ms: self.last_max_ms,
            draw_calls,
            instances,
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    opaque_pipeline: wgpu::RenderPipeline,
    blend_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    clear_color: wgpu::Color,
    lighting: LightingConfig,

    // ECS World
    world: World,
    schedule: Schedule,
    room: Room,
    last_update: Instant,

    camera: OrbitCamera,
    input: InputState,
    overlay: DebugOverlay,
    timer: Option<FrameTimer>,
    last_draw: (u32, usize),
}

impl State {
    async fn new(window: Arc<Window>, room_config: RoomConfig, args: &Args) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter compatible with the window surface")?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        let camera = OrbitCamera::new(&room_config.camera);
        let aspect = config.width as f32 / config.height as f32;
        let uniforms = Uniforms::new(camera.view_projection(aspect), &room_config.lighting);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        // Opaque pass writes depth; the translucent pass only tests against it.
        let opaque_pipeline = create_pipeline(
            &device,
            &render_pipeline_layout,
            &shader,
            config.format,
            wgpu::BlendState::REPLACE,
            true,
            "Opaque Pipeline",
        );
        let blend_pipeline = create_pipeline(
            &device,
            &render_pipeline_layout,
            &shader,
            config.format,
            wgpu::BlendState::ALPHA_BLENDING,
            false,
            "Blend Pipeline",
        );

        let cube = unit_box();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: cube.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: cube.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let num_indices = cube.index_count() as u32;

        // ECS world: events, the room itself, and the initial camera direction
        // so the first frame computes visibility.
        let mut world = World::new();
        systems::init_events(&mut world);
        world.insert_resource(CameraDirection::new(camera.forward()));
        let room = spawn_room(&mut world, &room_config);

        let [r, g, b] = room_config.lighting.background.map(|c| srgb_to_linear(c) as f64);
        let clear_color = wgpu::Color { r, g, b, a: 1.0 };

        let overlay = DebugOverlay::new(&window, &device, config.format, args.debug);

        let mut input = InputState::new();
        input.window_size = (config.width, config.height);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            opaque_pipeline,
            blend_pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_indices,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            clear_color,
            lighting: room_config.lighting,
            world,
            schedule: systems::frame_schedule(),
            room,
            last_update: Instant::now(),
            camera,
            input,
            overlay,
            timer: args.perf.then(FrameTimer::new),
            last_draw: (0, 0),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
            self.input.window_size = (new_size.width, new_size.height);
        }
    }

    fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32().min(MAX_FRAME_DT);
        self.last_update = now;

        if let Some(timer) = &mut self.timer {
            timer.record(dt);
        }

        // Only write the direction when the camera moved: the write itself
        // is what schedules a visibility pass.
        if self.camera.update(&self.input, dt) {
            let forward = self.camera.forward();
            self.world.resource_mut::<CameraDirection>().set(forward);
        }

        if let Some(cursor) = self.input.click {
            self.pick_door(cursor);
        }

        self.world.resource_mut::<FrameTime>().delta = dt;
        self.schedule.run(&mut self.world);
        systems::end_frame(&mut self.world);

        self.input.end_frame();
    }

    /// Send a DoorClicked for the nearest visible door under `cursor`.
    fn pick_door(&mut self, cursor: (f32, f32)) {
        let view_proj = self.camera.view_projection(self.aspect());
        let Some(ray) = Ray::from_screen(cursor, (self.config.width, self.config.height), view_proj) else {
            return;
        };

        match picking::pick_door(&mut self.world, &ray) {
            Some(door) => {
                log::debug!("click hit {}", door.label());
                self.world.send_event(DoorClicked { door });
            }
            None => log::debug!("click at {cursor:?} hit no door"),
        }
    }

    /// Force both doors closed (R key).
    fn reset_doors(&mut self) {
        let changes: Vec<DoorStateChanged> =
            self.world.resource_scope(|world, mut player: Mut<ClipPlayer>| {
                let mut doors = world.resource_mut::<DoorController>();
                let changes: Vec<_> = DoorId::ALL
                    .into_iter()
                    .filter_map(|door| doors.reset(door, &mut *player))
                    .collect();
                changes
            });
        for change in changes {
            self.world.send_event(change);
        }
    }

    fn debug_stats(&self) -> DebugStats {
        let surface_opacity = SurfaceKind::ALL
            .iter()
            .filter_map(|&kind| {
                let material = self.world.get::<SurfaceMaterial>(self.room.surface(kind)?)?;
                Some((kind.label(), material.opacity))
            })
            .collect();

        let controller = self.world.resource::<DoorController>();
        let player = self.world.resource::<ClipPlayer>();
        let doors = DoorId::ALL
            .iter()
            .map(|&door| DoorStatus {
                door,
                state: controller.state(door),
                visible: self
                    .room
                    .door(door)
                    .and_then(|entity| self.world.get::<Visible>(entity))
                    .is_some_and(|visible| visible.0),
                in_flight: controller
                    .in_flight(door)
                    .and_then(|clip| player.name(clip))
                    .map(str::to_owned),
            })
            .collect();

        DebugStats {
            perf: self.timer.as_ref().map(|t| t.snapshot(self.last_draw.0, self.last_draw.1)),
            resolution: (self.size.width, self.size.height),
            camera_position: self.camera.camera_position().to_array(),
            camera_target: self.camera.target().to_array(),
            camera_direction: self.world.resource::<CameraDirection>().get().to_array(),
            camera_distance: self.camera.distance(),
            camera_polar: self.camera.polar(),
            surface_opacity,
            doors,
            door_history: self.world.resource::<DoorHistory>().entries.iter().copied().collect(),
            running_clips: player.running().map(str::to_owned).collect(),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Collect instance data from ECS BEFORE creating render pass
        let (draws, opaque_count) = systems::collect_instances(&mut self.world, self.camera.camera_position());
        let instances: Vec<InstanceData> = draws
            .into_iter()
            .map(|(model, color)| InstanceData {
                model: model.to_cols_array_2d(),
                color,
            })
            .collect();
        if instances.len() > MAX_INSTANCES {
            log::warn!("{} instances, drawing the first {MAX_INSTANCES}", instances.len());
        }
        let instance_count = instances.len().min(MAX_INSTANCES) as u32;
        let opaque_count = (opaque_count as u32).min(instance_count);

        if instance_count > 0 {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&instances[..instance_count as usize]),
            );
        }

        let uniforms = Uniforms::new(self.camera.view_projection(self.aspect()), &self.lighting);
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut draw_calls = 0;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));  // Instance data
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            if opaque_count > 0 {
                render_pass.set_pipeline(&self.opaque_pipeline);
                render_pass.draw_indexed(0..self.num_indices, 0, 0..opaque_count);
                draw_calls += 1;
            }
            if instance_count > opaque_count {
                render_pass.set_pipeline(&self.blend_pipeline);
                render_pass.draw_indexed(0..self.num_indices, 0, opaque_count..instance_count);
                draw_calls += 1;
            }
        }
        self.last_draw = (draw_calls, instance_count as usize);

        let stats = self.overlay.visible.then(|| self.debug_stats());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let mut fov = self.camera.fov_degrees();
        let tweaked = self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            stats.as_ref(),
            RenderTweaks {
                lighting: &mut self.lighting,
                fov_degrees: &mut fov,
            },
        );
        if tweaked {
            self.camera.set_fov_degrees(fov);
            log::debug!(
                "render settings: {} exposure {:.1} fov {fov:.0}",
                self.lighting.tone_mapping.label(),
                self.lighting.exposure
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
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

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
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
            buffers: &[GpuVertex::desc(), InstanceData::desc()],  // Vertex + Instance buffers
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
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
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn load_config(args: &Args) -> Result<RoomConfig> {
    match &args.config {
        Some(path) => RoomConfig::load(path)
            .with_context(|| format!("failed to load room config {}", path.display())),
        None => {
            log::info!("No config given, using built-in room defaults");
            Ok(RoomConfig::default())
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let room_config = load_config(&args)?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;

    let window_attributes = Window::default_attributes()
        .with_title("Isometric Room")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(
        event_loop
            .create_window(window_attributes)
            .context("failed to create window")?,
    );

    let mut state = pollster::block_on(State::new(window.clone(), room_config, &args))?;
    log::info!("Controls: drag to orbit, scroll to zoom, click a door, R resets doors, F3 debug panel");

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                // Pointer input over the debug panel stays with the panel.
                let response = state.overlay.handle_window_event(&window, event);
                if !response.consumed {
                    state.input.process_event(event);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(code),
                                repeat: false,
                                ..
                            },
                        ..
                    } => match code {
                        KeyCode::F3 => state.overlay.toggle(),
                        KeyCode::KeyR => state.reset_doors(),
                        _ => {}
                    },
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                state.resize(state.size)
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory");
                                control_flow.exit()
                            }
                            Err(e) => log::warn!("{e:?}"),
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })
    .context("event loop terminated with an error")?;

    Ok(())
}
