// Orbit camera rig
//
// Camera model (same conventions as three.js OrbitControls):
//   - A fixed look-at target; the eye sits on a sphere around it
//   - Spherical coords: radius, polar angle phi from +Y, azimuth theta around Y
//     measured from +Z toward +X
//   - Left-drag rotates, mouse wheel dollies, no panning
//   - Optional auto-rotate; rotation is damped: each frame applies
//     `damping_factor` of the pending delta and keeps the rest
//   - update() reports whether the eye actually moved, which is the
//     "orientation changed" signal the visibility pass listens to

use glam::{Mat4, Vec3};
use std::f32::consts::TAU;

use super::config::CameraConfig;
use super::input::InputState;

/// Below this squared movement a frame counts as "no change".
const CHANGE_EPSILON: f32 = 1e-6;

pub const MIN_FOV_DEGREES: f32 = 1.0;
pub const MAX_FOV_DEGREES: f32 = 120.0;

pub struct OrbitCamera {
    target: Vec3,

    /// Private: always clamped in update(). Use distance() to read.
    radius: f32,
    /// Private: always clamped to [min_polar, max_polar] in update().
    polar: f32,
    azimuth: f32,

    // Rotation/zoom requested but not yet applied (damping keeps a remainder).
    pending_azimuth: f32,
    pending_polar: f32,
    pending_zoom: f32,

    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    pub auto_rotate: bool,
    /// three.js units: 1.0 = one revolution per minute
    pub auto_rotate_speed: f32,
    pub damping_factor: f32,

    /// Drag across the full window height = this many full turns.
    pub rotate_speed: f32,
    /// Dolly scale per scroll line.
    pub zoom_step: f32,

    last_eye: Vec3,
    last_forward: Vec3,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig) -> Self {
        let offset = config.position - config.look_at;
        let radius = offset.length().max(f32::EPSILON);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        let azimuth = offset.x.atan2(offset.z);

        let mut camera = Self {
            target: config.look_at,
            radius,
            polar,
            azimuth,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_zoom: 1.0,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar: config.min_polar_angle,
            max_polar: config.max_polar_angle,
            fov: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
            auto_rotate: config.auto_rotate,
            auto_rotate_speed: config.auto_rotate_speed,
            damping_factor: config.damping_factor,
            rotate_speed: 1.0,
            zoom_step: 0.95,
            last_eye: Vec3::ZERO,
            last_forward: Vec3::ZERO,
        };
        camera.clamp();
        camera.last_eye = camera.camera_position();
        camera.last_forward = camera.forward();
        camera
    }

    /// Queue a rotation in radians. Positive azimuth turns the eye toward +X.
    pub fn rotate(&mut self, azimuth: f32, polar: f32) {
        self.pending_azimuth += azimuth;
        self.pending_polar += polar;
    }

    /// Queue a dolly. `factor < 1` moves closer.
    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 {
            self.pending_zoom *= factor;
        }
    }

    /// Apply input, auto-rotate and damping. Call once per frame.
    /// Returns true if the camera moved or turned this frame.
    pub fn update(&mut self, input: &InputState, dt: f32) -> bool {
        let height = input.window_size.1 as f32;
        if input.is_dragging() && height > 0.0 {
            let (dx, dy) = input.mouse_delta;
            self.rotate(
                -TAU * dx / height * self.rotate_speed,
                -TAU * dy / height * self.rotate_speed,
            );
        }

        if input.scroll_delta != 0.0 {
            // Scroll up (positive) moves closer.
            self.zoom(self.zoom_step.powf(input.scroll_delta));
        }

        if self.auto_rotate && !input.is_dragging() {
            self.rotate(-TAU / 60.0 * self.auto_rotate_speed * dt, 0.0);
        }

        let step = self.damping_factor.clamp(f32::EPSILON, 1.0);
        self.azimuth += self.pending_azimuth * step;
        self.polar += self.pending_polar * step;
        self.pending_azimuth *= 1.0 - step;
        self.pending_polar *= 1.0 - step;

        self.radius *= self.pending_zoom;
        self.pending_zoom = 1.0;

        self.clamp();

        let eye = self.camera_position();
        let forward = self.forward();
        let moved = eye.distance_squared(self.last_eye) > CHANGE_EPSILON
            || 1.0 - forward.dot(self.last_forward) > CHANGE_EPSILON;
        if moved {
            self.last_eye = eye;
            self.last_forward = forward;
        }
        moved
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + Vec3::new(
                self.radius * sin_polar * self.azimuth.sin(),
                self.radius * self.polar.cos(),
                self.radius * sin_polar * self.azimuth.cos(),
            )
    }

    /// Normalized view direction (what `camera.getWorldDirection` returns).
    pub fn forward(&self) -> Vec3 {
        (self.target - self.camera_position()).normalize_or_zero()
    }

    /// View matrix: looks from the camera eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn fov_degrees(&self) -> f32 { self.fov.to_degrees() }

    /// Vertical field of view, kept within the debug panel's 1..=120 degree range.
    pub fn set_fov_degrees(&mut self, degrees: f32) {
        self.fov = degrees.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES).to_radians();
    }

    pub fn target(&self) -> Vec3 { self.target }
    pub fn distance(&self) -> f32 { self.radius }
    pub fn polar(&self) -> f32 { self.polar }

    fn clamp(&mut self) {
        self.polar = self.polar.clamp(self.min_polar, self.max_polar);
        self.radius = self.radius.clamp(self.min_distance.max(f32::EPSILON), self.max_distance);
    }
}
