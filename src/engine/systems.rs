// ECS systems for the room scene
// One schedule per frame, single-threaded, in this order:
//
//   door clicks → clip playback → door completions → poses → visibility
//
// The visibility pass only runs on frames where CameraDirection was written.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::{Mat4, Quat, Vec3};
use std::collections::VecDeque;

use super::animation::{ClipFinished, ClipPlayer};
use super::components::*;
use super::doors::{DoorClicked, DoorController, DoorStateChanged};
use super::visibility::{CameraDirection, SurfaceBinding, SurfaceMaterial};

/// How many door transitions the debug panel remembers.
const HISTORY_LEN: usize = 6;

/// Recent door transitions, newest last. Display only.
#[derive(Resource, Debug, Default)]
pub struct DoorHistory {
    pub entries: VecDeque<DoorStateChanged>,
}

/// Register every event type the frame schedule reads or writes.
pub fn init_events(world: &mut World) {
    world.init_resource::<Events<DoorClicked>>();
    world.init_resource::<Events<ClipFinished>>();
    world.init_resource::<Events<DoorStateChanged>>();
    world.init_resource::<DoorHistory>();
    world.init_resource::<FrameTime>();
}

/// Swap event buffers. Call once after each schedule run.
pub fn end_frame(world: &mut World) {
    world.resource_mut::<Events<DoorClicked>>().update();
    world.resource_mut::<Events<ClipFinished>>().update();
    world.resource_mut::<Events<DoorStateChanged>>().update();
}

pub fn frame_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            door_click_system,
            animation_system,
            door_completion_system,
            door_history_system,
            pose_system,
            visibility_system.run_if(resource_changed::<CameraDirection>),
        )
            .chain(),
    );
    schedule
}

/// Recompute every surface's opacity from the current camera direction and
/// gate the bound meshes on `opacity > 0`.
pub fn visibility_system(
    camera: Res<CameraDirection>,
    mut surfaces: Query<(&SurfaceBinding, &mut SurfaceMaterial)>,
    mut targets: Query<(&RoomMesh, &mut Visible)>,
) {
    let direction = camera.get();

    for (binding, mut material) in surfaces.iter_mut() {
        let opacity = binding.opacity(direction);
        if opacity != material.opacity {
            log::debug!("{} opacity {:.2} -> {:.2}", binding.kind.label(), material.opacity, opacity);
        }
        material.opacity = opacity;

        let shown = opacity > 0.0;
        for &target in &binding.targets {
            if let Ok((mesh, mut visible)) = targets.get_mut(target) {
                if visible.0 != shown {
                    log::debug!("{} {}", mesh.name, if shown { "shown" } else { "hidden" });
                }
                visible.0 = shown;
            }
        }
    }
}

pub fn door_click_system(
    mut clicks: EventReader<DoorClicked>,
    mut doors: ResMut<DoorController>,
    mut player: ResMut<ClipPlayer>,
    mut changed: EventWriter<DoorStateChanged>,
) {
    for click in clicks.read() {
        if let Some(change) = doors.on_door_clicked(click.door, &mut *player) {
            changed.send(change);
        }
    }
}

pub fn animation_system(
    time: Res<FrameTime>,
    mut player: ResMut<ClipPlayer>,
    mut finished: EventWriter<ClipFinished>,
) {
    player.advance(time.delta, |clip| {
        finished.send(ClipFinished { clip });
    });
}

pub fn door_completion_system(
    mut finished: EventReader<ClipFinished>,
    mut doors: ResMut<DoorController>,
    mut changed: EventWriter<DoorStateChanged>,
) {
    for event in finished.read() {
        if let Some(change) = doors.on_animation_completed(event.clip) {
            changed.send(change);
        }
    }
}

pub fn door_history_system(mut changed: EventReader<DoorStateChanged>, mut history: ResMut<DoorHistory>) {
    for change in changed.read() {
        if history.entries.len() == HISTORY_LEN {
            history.entries.pop_front();
        }
        history.entries.push_back(*change);
    }
}

/// Copy clip values onto the meshes they drive; inactive clips leave the rest pose.
pub fn pose_system(player: Res<ClipPlayer>, mut query: Query<(&DrivenBy, &mut Placement)>) {
    for (driven, mut placement) in query.iter_mut() {
        let angle = driven
            .clips
            .iter()
            .find_map(|&clip| player.value(clip))
            .unwrap_or(0.0);
        placement.animated = Quat::from_axis_angle(driven.axis, angle);
    }
}

/// Visible meshes as (model, rgba) pairs: opaque first, then translucent
/// far-to-near from `eye`. Alpha is the bound surface's opacity.
/// Returns the list and how many leading entries are opaque.
pub fn collect_instances(world: &mut World, eye: Vec3) -> (Vec<(Mat4, [f32; 4])>, usize) {
    let mut opaque = Vec::new();
    let mut translucent: Vec<(f32, (Mat4, [f32; 4]))> = Vec::new();

    let mut meshes = world.query_filtered::<(&Visible, &Placement, &Color, &MaterialBinding), With<RoomMesh>>();
    for (visible, placement, color, binding) in meshes.iter(world) {
        if !visible.0 {
            continue;
        }
        let alpha = world
            .get::<SurfaceMaterial>(binding.0)
            .map_or(1.0, |material| material.opacity);

        let model = placement.matrix();
        let instance = (model, color.with_alpha(alpha));
        if alpha >= 1.0 {
            opaque.push(instance);
        } else {
            let depth = model.transform_point3(Vec3::ZERO).distance_squared(eye);
            translucent.push((depth, instance));
        }
    }

    translucent.sort_by(|a, b| b.0.total_cmp(&a.0));
    let opaque_count = opaque.len();
    opaque.extend(translucent.into_iter().map(|(_, instance)| instance));
    (opaque, opaque_count)
}
