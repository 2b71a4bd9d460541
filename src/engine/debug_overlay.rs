use egui::epaint::Shadow;

use super::camera::{MAX_FOV_DEGREES, MIN_FOV_DEGREES};
use super::config::{LightingConfig, MAX_EXPOSURE, MAX_LIGHT_INTENSITY, ToneMapping};
use super::doors::{DoorId, DoorState, DoorStateChanged};

const FOOTER: &str = "Isometric Room";
const PANEL_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);

pub struct DebugStats {
    /// `None` unless the app was started with `--perf`.
    pub perf: Option<PerfStats>,
    pub resolution: (u32, u32),
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub camera_direction: [f32; 3],
    pub camera_distance: f32,
    pub camera_polar: f32,
    /// (surface label, current material opacity)
    pub surface_opacity: Vec<(&'static str, f32)>,
    pub doors: Vec<DoorStatus>,
    pub running_clips: Vec<String>,
    /// Most recent transitions, oldest first.
    pub door_history: Vec<DoorStateChanged>,
}

pub struct DoorStatus {
    pub door: DoorId,
    pub state: DoorState,
    /// Drawn, and therefore clickable.
    pub visible: bool,
    pub in_flight: Option<String>,
}

pub struct PerfStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    pub draw_calls: u32,
    pub instances: usize,
}

/// Render settings the panel edits in place. None of them reach door or
/// visibility state.
pub struct RenderTweaks<'a> {
    pub lighting: &'a mut LightingConfig,
    pub fov_degrees: &'a mut f32,
}

pub struct DebugOverlay {
    pub visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        visible: bool,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        apply_style(&egui_ctx);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        // Drawn on top of the finished scene: no depth, no MSAA, no dithering.
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            visible,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("debug panel {}", if self.visible { "shown" } else { "hidden" });
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Build and paint one egui frame: the footer always, the panel when `stats` is `Some`.
    /// Returns true if a panel control changed `tweaks`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        stats: Option<&DebugStats>,
        mut tweaks: RenderTweaks<'_>,
    ) -> bool {
        let mut changed = false;
        let raw_input = self.egui_state.take_egui_input(window);
        let output = self.egui_ctx.run(raw_input, |ctx| {
            footer(ctx);
            if let Some(stats) = stats {
                changed |= panel(ctx, stats, &mut tweaks);
            }
        });

        self.egui_state.handle_platform_output(window, output.platform_output);
        let primitives = self.egui_ctx.tessellate(output.shapes, output.pixels_per_point);

        for (id, delta) in &output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, &primitives, screen_descriptor);

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        // egui-wgpu 0.30 renders into a RenderPass<'static>.
        self.egui_renderer
            .render(&mut pass.forget_lifetime(), &primitives, screen_descriptor);

        for id in &output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        changed
    }
}

/// Dark translucent panel, small white monospace text.
fn apply_style(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.window_fill = PANEL_FILL;
    visuals.window_stroke = egui::Stroke::NONE;
    visuals.window_shadow = Shadow::NONE;
    visuals.override_text_color = Some(egui::Color32::WHITE);
    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.override_font_id = Some(egui::FontId::monospace(13.0));
    ctx.set_style(style);
}

fn footer(ctx: &egui::Context) {
    egui::Area::new(egui::Id::new("footer"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -12.0))
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(FOOTER).color(egui::Color32::from_white_alpha(200)));
        });
}

fn panel(ctx: &egui::Context, stats: &DebugStats, tweaks: &mut RenderTweaks) -> bool {
    egui::Area::new(egui::Id::new("debug_panel"))
        .fixed_pos(egui::pos2(10.0, 10.0))
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(PANEL_FILL)
                .inner_margin(egui::Margin::same(8.0))
                .rounding(4.0)
                .show(ui, |ui| {
                    stats_panel(ui, stats);
                    ui.separator();
                    controls(ui, tweaks)
                })
                .inner
        })
        .inner
}

fn controls(ui: &mut egui::Ui, tweaks: &mut RenderTweaks) -> bool {
    let mut changed = false;
    let lighting = &mut *tweaks.lighting;

    ui.horizontal(|ui| {
        ui.label("Tone:");
        egui::ComboBox::from_id_salt("tone_mapping")
            .selected_text(lighting.tone_mapping.label())
            .show_ui(ui, |ui| {
                for mode in ToneMapping::ALL {
                    changed |= ui
                        .selectable_value(&mut lighting.tone_mapping, mode, mode.label())
                        .changed();
                }
            });
    });

    let sliders = [
        (&mut lighting.exposure, MAX_EXPOSURE, "exposure"),
        (&mut lighting.ambient_intensity, MAX_LIGHT_INTENSITY, "ambient"),
        (&mut lighting.directional_intensity, MAX_LIGHT_INTENSITY, "directional"),
    ];
    for (value, max, label) in sliders {
        changed |= ui
            .add(egui::Slider::new(value, 0.0..=max).step_by(0.1).text(label))
            .changed();
    }
    changed |= ui
        .add(
            egui::Slider::new(&mut *tweaks.fov_degrees, MIN_FOV_DEGREES..=MAX_FOV_DEGREES)
                .step_by(1.0)
                .text("fov"),
        )
        .changed();

    changed
}

fn stats_panel(ui: &mut egui::Ui, stats: &DebugStats) {
    if let Some(perf) = &stats.perf {
        ui.label(format!("FPS: {}", perf.fps));
        ui.label(format!(
            "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
            perf.frame_time_avg_ms, perf.frame_time_min_ms, perf.frame_time_max_ms
        ));
        ui.label(format!("Draw calls: {}  Instances: {}", perf.draw_calls, perf.instances));
    }
    ui.label(format!("Resolution: {} x {}", stats.resolution.0, stats.resolution.1));

    let [px, py, pz] = stats.camera_position;
    let [tx, ty, tz] = stats.camera_target;
    let [dx, dy, dz] = stats.camera_direction;
    ui.label(format!(
        "Camera: ({px:.2}, {py:.2}, {pz:.2})  dist {:.2}  polar {:.1}°",
        stats.camera_distance,
        stats.camera_polar.to_degrees()
    ));
    ui.label(format!("Target: ({tx:.2}, {ty:.2}, {tz:.2})"));
    ui.label(format!("Facing: ({dx:+.3}, {dy:+.3}, {dz:+.3})"));

    ui.separator();
    for (label, opacity) in &stats.surface_opacity {
        ui.label(format!("{label:<8} {opacity:.2}"));
    }

    ui.separator();
    for status in &stats.doors {
        let hidden = if status.visible { "" } else { " (hidden)" };
        ui.label(format!("{:<8} {}{hidden}", status.door.label(), status.state.label()));
        if let (true, Some(clip)) = (status.state.is_transient(), &status.in_flight) {
            ui.label(format!("         playing {clip}"));
        }
    }
    for change in &stats.door_history {
        ui.label(format!("  {} -> {}", change.door.label(), change.state.label()));
    }

    ui.separator();
    ui.label(format!("Clips: {}", stats.running_clips.join(", ")));
}
