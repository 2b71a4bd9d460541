// Core ECS components and resources for the room scene.
// Surface-specific components (SurfaceBinding, SurfaceMaterial) live in visibility.rs.

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};

use super::animation::ClipId;
use super::doors::DoorId;

/// Pose of a room mesh.
///
/// The unit box is scaled by `scale`, shifted by `offset` (so doors can swing
/// around their hinge), turned by `rotation * animated` and placed at `position`.
#[derive(Component, Debug, Clone, Copy)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Quat,
    /// Driven every frame by `pose_system`; identity for static meshes.
    pub animated: Quat,
    pub offset: Vec3,
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            animated: Quat::IDENTITY,
            offset: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Placement {
    pub fn from_position(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            ..Default::default()
        }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.rotation = Quat::from_rotation_y(yaw);
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Model matrix mapping the unit box onto this mesh.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_quat(self.rotation * self.animated)
            * Mat4::from_translation(self.offset)
            * Mat4::from_scale(self.scale)
    }
}

/// RGB color for rendering
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// `0xRRGGBB` → linear-ish floats in [0, 1].
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as f32 / 255.0,
            g: ((rgb >> 8) & 0xff) as f32 / 255.0,
            b: (rgb & 0xff) as f32 / 255.0,
        }
    }

    pub fn with_alpha(self, a: f32) -> [f32; 4] {
        [self.r, self.g, self.b, a]
    }
}

/// Named scene mesh (wall_N, door_W, paw, ...).
#[derive(Component, Debug, Clone, Copy)]
pub struct RoomMesh {
    pub name: &'static str,
}

/// Render gate. Binary: a mesh is either drawn or skipped.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Self(true)
    }
}

/// Entity holding the `SurfaceMaterial` this mesh blends with.
#[derive(Component, Debug, Clone, Copy)]
pub struct MaterialBinding(pub Entity);

/// Clickable door mesh.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Door(pub DoorId);

/// Rotation channel driven by animation clips.
///
/// The first active clip in `clips` wins; with none active the mesh sits at
/// its rest pose. Doors list both their open and close clip.
#[derive(Component, Debug, Clone)]
pub struct DrivenBy {
    pub clips: Vec<ClipId>,
    pub axis: Vec3,
}

/// Seconds since the previous frame.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameTime {
    pub delta: f32,
}
