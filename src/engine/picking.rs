// Ray casting for door clicks.
//
// Every room mesh is the unit box [-0.5, 0.5]^3 pushed through its model
// matrix, so a hit test moves the ray into box space and runs a slab test there.

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

use super::components::{Door, Placement, Visible};
use super::doors::DoorId;

const PARALLEL_EPSILON: f32 = 1e-8;

/// A 3D ray with origin and direction
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3, // Normalized
}

impl Ray {
    /// Create a new ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Ray through a cursor position (pixels, origin top-left) for a camera
    /// whose view-projection matrix is `view_proj`. wgpu depth runs 0..1.
    pub fn from_screen(cursor: (f32, f32), window: (u32, u32), view_proj: Mat4) -> Option<Self> {
        let (w, h) = (window.0 as f32, window.1 as f32);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }

        let ndc_x = 2.0 * cursor.0 / w - 1.0;
        let ndc_y = 1.0 - 2.0 * cursor.1 / h;

        let inverse = view_proj.inverse();
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        let direction = far - near;

        if !direction.is_finite() || direction.length_squared() < PARALLEL_EPSILON {
            return None;
        }
        Some(Self::new(near, direction))
    }
}

/// Distance along `ray` to the first hit on the unit box transformed by `model`.
pub fn ray_box_distance(ray: &Ray, model: Mat4) -> Option<f32> {
    let inverse = model.inverse();
    // Affine map: the ray parameter t is the same in both spaces.
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);

    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];

        if d.abs() < PARALLEL_EPSILON {
            if !(-0.5..=0.5).contains(&o) {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((-0.5 - o) * inv, (0.5 - o) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}

/// Nearest candidate hit by `ray`.
pub fn pick_nearest<T>(ray: &Ray, candidates: impl IntoIterator<Item = (T, Mat4)>) -> Option<T> {
    candidates
        .into_iter()
        .filter_map(|(item, model)| ray_box_distance(ray, model).map(|t| (item, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item)
}

/// Doors that can take a click, with their current model matrices.
/// A door hidden with its wall is not a candidate, so clicks pass through it.
pub fn door_candidates(world: &mut World) -> Vec<(DoorId, Mat4)> {
    let mut doors = world.query::<(&Door, &Visible, &Placement)>();
    doors
        .iter(world)
        .filter(|(_, visible, _)| visible.0)
        .map(|(door, _, placement)| (door.0, placement.matrix()))
        .collect()
}

/// Nearest clickable door under `ray`.
pub fn pick_door(world: &mut World, ray: &Ray) -> Option<DoorId> {
    pick_nearest(ray, door_candidates(world))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::RoomConfig;
    use crate::engine::room::spawn_room;
    use crate::engine::systems::{end_frame, frame_schedule, init_events};
    use crate::engine::visibility::CameraDirection;
    use glam::Quat;

    fn boxed(centre: Vec3, size: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(size, Quat::IDENTITY, centre)
    }

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(ray.direction, Vec3::Z);
    }

    #[test]
    fn hits_box_in_front() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let t = ray_box_distance(&ray, boxed(Vec3::ZERO, Vec3::splat(2.0))).unwrap();
        assert!((t - 9.0).abs() < 1e-5);
    }

    #[test]
    fn misses_box_to_the_side() {
        let ray = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        assert_eq!(ray_box_distance(&ray, boxed(Vec3::ZERO, Vec3::ONE)), None);
    }

    #[test]
    fn box_behind_the_ray_is_not_hit() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert_eq!(ray_box_distance(&ray, boxed(Vec3::ZERO, Vec3::ONE)), None);
    }

    #[test]
    fn rotated_thin_panel() {
        // Door-like panel turned 90° about Y: thin along X after rotation.
        let model = Mat4::from_scale_rotation_translation(
            Vec3::new(0.9, 2.0, 0.05),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(2.0, 1.0, 0.0),
        );
        let head_on = Ray::new(Vec3::new(0.0, 1.0, 0.3), Vec3::X);
        assert!(ray_box_distance(&head_on, model).is_some());

        let past_edge = Ray::new(Vec3::new(0.0, 1.0, 0.6), Vec3::X);
        assert_eq!(ray_box_distance(&past_edge, model), None);
    }

    #[test]
    fn nearest_candidate_wins() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let picked = pick_nearest(
            &ray,
            [
                ("far", boxed(Vec3::new(0.0, 0.0, -3.0), Vec3::ONE)),
                ("near", boxed(Vec3::new(0.0, 0.0, 3.0), Vec3::ONE)),
                ("off", boxed(Vec3::new(4.0, 0.0, 5.0), Vec3::ONE)),
            ],
        );
        assert_eq!(picked, Some("near"));
    }

    #[test]
    fn screen_centre_ray_follows_camera_forward() {
        let eye = Vec3::new(5.0, 2.0, 5.0);
        let target = Vec3::new(0.0, 1.0, 0.0);
        let view_proj = Mat4::perspective_rh(45f32.to_radians(), 16.0 / 9.0, 0.5, 60.0)
            * Mat4::look_at_rh(eye, target, Vec3::Y);

        let ray = Ray::from_screen((640.0, 360.0), (1280, 720), view_proj).unwrap();
        let forward = (target - eye).normalize();
        assert!(ray.direction.abs_diff_eq(forward, 1e-4));

        // Hits a box sitting on the look-at target.
        assert!(ray_box_distance(&ray, boxed(target, Vec3::splat(0.5))).is_some());
    }

    #[test]
    fn empty_window_gives_no_ray() {
        assert!(Ray::from_screen((0.0, 0.0), (0, 0), Mat4::IDENTITY).is_none());
    }

    fn room_world(camera: Vec3) -> World {
        let mut world = World::new();
        init_events(&mut world);
        world.insert_resource(CameraDirection::new(camera));
        spawn_room(&mut world, &RoomConfig::default());
        frame_schedule().run(&mut world);
        end_frame(&mut world);
        world
    }

    /// Ray from the middle of the room straight at a door's panel centre.
    fn ray_at_door(world: &mut World, door: DoorId) -> Ray {
        let (_, model) = door_candidates(world)
            .into_iter()
            .find(|(id, _)| *id == door)
            .unwrap();
        let centre = model.transform_point3(Vec3::ZERO);
        let origin = Vec3::new(0.0, centre.y, 0.0);
        Ray::new(origin, centre - origin)
    }

    #[test]
    fn ray_through_door_centre_picks_that_door() {
        // Looking toward the north-west corner: both door walls face the camera.
        let mut world = room_world(Vec3::new(1.0, -0.5, -1.0));
        assert_eq!(door_candidates(&mut world).len(), 2);

        let west = ray_at_door(&mut world, DoorId::West);
        assert_eq!(pick_door(&mut world, &west), Some(DoorId::West));

        let north = ray_at_door(&mut world, DoorId::North);
        assert_eq!(pick_door(&mut world, &north), Some(DoorId::North));

        let up = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        assert_eq!(pick_door(&mut world, &up), None);
    }

    #[test]
    fn hidden_door_is_not_clickable() {
        let mut world = room_world(Vec3::new(1.0, -0.5, -1.0));
        let ray = ray_at_door(&mut world, DoorId::West);

        // Facing +Z puts the west wall (normal -Z) behind the camera.
        world.resource_mut::<CameraDirection>().set(Vec3::Z);
        frame_schedule().run(&mut world);
        end_frame(&mut world);

        let candidates: Vec<DoorId> = door_candidates(&mut world).into_iter().map(|(id, _)| id).collect();
        assert_eq!(candidates, vec![DoorId::North]);
        assert_eq!(pick_door(&mut world, &ray), None);
    }
}
