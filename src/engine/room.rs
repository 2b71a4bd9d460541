// Isometric room layout and scene wiring.
//
// Spawns the six surfaces, the meshes bound to them, the two clickable doors
// and three animated props, registers every clip and starts the continuous
// ones. Surface normals are captured here, once, from the hidden reference
// planes; nothing rewrites them afterwards.
//
// Axes: north = +X, east = +Z, up = +Y. The room interior spans roughly
// [-2.5, 2.5] on X/Z and [0, 2.44] on Y.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use std::f32::consts::TAU;

use super::animation::{AnimationClip, ClipPlayer};
use super::components::*;
use super::config::RoomConfig;
use super::doors::{DoorClips, DoorController, DoorId};
use super::visibility::{SurfaceBinding, SurfaceKind, SurfaceMaterial, SurfaceNormal};

pub const PC_FAN_CLIP: &str = "action_fan";
pub const CEILING_FAN_CLIP: &str = "action_fan_blades";
pub const LUCKY_CAT_CLIP: &str = "action_paw";

const WALL_CENTRE: f32 = 2.515;
const WALL_THICKNESS: f32 = 0.1;
const WALL_HEIGHT: f32 = 2.438;
const ROOM_SPAN: f32 = 5.13;

const DOOR_WIDTH: f32 = 0.9;
const DOOR_HEIGHT: f32 = 2.0;
const DOOR_THICKNESS: f32 = 0.05;

/// What rotates a mesh, if anything.
#[derive(Debug, Clone, Copy)]
enum Channel {
    Static,
    Door(DoorId),
    Prop { clip: &'static str, axis: Vec3 },
}

#[derive(Debug, Clone, Copy)]
struct MeshSpec {
    name: &'static str,
    surface: SurfaceKind,
    placement: Placement,
    color: Color,
    channel: Channel,
}

/// Entity handles for the spawned scene.
#[derive(Debug, Clone)]
pub struct Room {
    pub surfaces: Vec<(SurfaceKind, Entity)>,
    pub doors: Vec<(DoorId, Entity)>,
}

impl Room {
    pub fn surface(&self, kind: SurfaceKind) -> Option<Entity> {
        self.surfaces.iter().find(|(k, _)| *k == kind).map(|(_, e)| *e)
    }

    pub fn door(&self, door: DoorId) -> Option<Entity> {
        self.doors.iter().find(|(d, _)| *d == door).map(|(_, e)| *e)
    }
}

fn layout() -> Vec<MeshSpec> {
    let wall_x = Vec3::new(WALL_THICKNESS, WALL_HEIGHT, ROOM_SPAN);
    let wall_z = Vec3::new(ROOM_SPAN, WALL_HEIGHT, WALL_THICKNESS);
    let slab = Vec3::new(ROOM_SPAN, 0.1, ROOM_SPAN);
    let wall_y = WALL_HEIGHT * 0.5;

    let wall_color = Color::hex(0xd9cbb5);
    let door_color = Color::hex(0x7a5434);

    vec![
        // floor
        MeshSpec {
            name: "floor",
            surface: SurfaceKind::Floor,
            placement: Placement::from_position(Vec3::new(0.0, -0.05, 0.0), slab),
            color: Color::hex(0xa0764f),
            channel: Channel::Static,
        },
        MeshSpec {
            name: "pc_fan",
            surface: SurfaceKind::Floor,
            placement: Placement::from_position(Vec3::new(1.627, 1.411, -2.177), Vec3::new(0.14, 0.14, 0.025))
                .with_yaw(0.827),
            color: Color::hex(0x2f3542),
            channel: Channel::Prop { clip: PC_FAN_CLIP, axis: Vec3::Z },
        },
        // ceiling
        MeshSpec {
            name: "ceiling",
            surface: SurfaceKind::Ceiling,
            placement: Placement::from_position(Vec3::new(0.0, WALL_HEIGHT + 0.05, 0.0), slab),
            color: Color::hex(0xe8e4da),
            channel: Channel::Static,
        },
        MeshSpec {
            name: "fan_blades",
            surface: SurfaceKind::Ceiling,
            placement: Placement::from_position(Vec3::new(0.0, 2.3, 0.0), Vec3::new(1.1, 0.02, 0.14))
                .with_yaw(TAU / 10.0),
            color: Color::hex(0x8a6a4a),
            channel: Channel::Prop { clip: CEILING_FAN_CLIP, axis: Vec3::Y },
        },
        // north (+X)
        MeshSpec {
            name: "wall_N",
            surface: SurfaceKind::WallNorth,
            placement: Placement::from_position(Vec3::new(WALL_CENTRE, wall_y, 0.0), wall_x),
            color: wall_color,
            channel: Channel::Static,
        },
        MeshSpec {
            name: "door_N",
            surface: SurfaceKind::WallNorth,
            placement: door_placement(DoorId::North),
            color: door_color,
            channel: Channel::Door(DoorId::North),
        },
        // south (-X)
        MeshSpec {
            name: "wall_S",
            surface: SurfaceKind::WallSouth,
            placement: Placement::from_position(Vec3::new(-WALL_CENTRE, wall_y, 0.0), wall_x),
            color: wall_color,
            channel: Channel::Static,
        },
        // east (+Z)
        MeshSpec {
            name: "wall_E",
            surface: SurfaceKind::WallEast,
            placement: Placement::from_position(Vec3::new(0.0, wall_y, WALL_CENTRE), wall_z),
            color: wall_color,
            channel: Channel::Static,
        },
        MeshSpec {
            name: "paw",
            surface: SurfaceKind::WallEast,
            placement: Placement::from_position(Vec3::new(1.863, 1.855, 2.295), Vec3::new(0.07, 0.18, 0.07))
                .with_offset(Vec3::new(0.0, 0.09, 0.0)),
            color: Color::hex(0xf2c14e),
            channel: Channel::Prop { clip: LUCKY_CAT_CLIP, axis: Vec3::X },
        },
        // west (-Z)
        MeshSpec {
            name: "wall_W",
            surface: SurfaceKind::WallWest,
            placement: Placement::from_position(Vec3::new(0.0, wall_y, -WALL_CENTRE), wall_z),
            color: wall_color,
            channel: Channel::Static,
        },
        MeshSpec {
            name: "door_W",
            surface: SurfaceKind::WallWest,
            placement: door_placement(DoorId::West),
            color: door_color,
            channel: Channel::Door(DoorId::West),
        },
    ]
}

/// Door panel hanging from its hinge; the offset puts the hinge on the panel's edge.
fn door_placement(door: DoorId) -> Placement {
    let hinge = match door {
        DoorId::West => Vec3::new(-2.021, 0.0, -2.433),
        DoorId::North => Vec3::new(2.433, 0.0, 0.381),
    };
    Placement {
        rotation: door_rest_rotation(door),
        ..Placement::from_position(hinge, Vec3::new(DOOR_WIDTH, DOOR_HEIGHT, DOOR_THICKNESS))
            .with_offset(Vec3::new(DOOR_WIDTH * 0.5, DOOR_HEIGHT * 0.5, 0.0))
    }
}

/// Hinge direction that swings a door into the room.
fn door_swing(door: DoorId) -> f32 {
    match door {
        DoorId::West => -1.0,
        DoorId::North => 1.0,
    }
}

fn register_clips(player: &mut ClipPlayer, config: &RoomConfig) -> (DoorClips, DoorClips) {
    player.add_clip(AnimationClip::linear(PC_FAN_CLIP, 0.5, 0.0, TAU));
    player.add_clip(AnimationClip::linear(CEILING_FAN_CLIP, 1.5, 0.0, TAU));
    player.add_clip(AnimationClip::new(LUCKY_CAT_CLIP, 1.2, &[(0.0, 0.0), (0.6, 0.7), (1.2, 0.0)]));

    let duration = config.doors.clip_duration;
    let mut door_clips = |door: DoorId| {
        let angle = config.doors.open_angle * door_swing(door);
        let (open, close) = door.clip_names();
        DoorClips {
            open: player.add_clip(AnimationClip::linear(open, duration, 0.0, angle)),
            close: player.add_clip(AnimationClip::linear(close, duration, angle, 0.0)),
        }
    };
    let west = door_clips(DoorId::West);
    let north = door_clips(DoorId::North);
    (west, north)
}

/// Spawn the room into `world` and insert the clip player and door controller.
pub fn spawn_room(world: &mut World, config: &RoomConfig) -> Room {
    let mut player = ClipPlayer::new();
    let (west, north) = register_clips(&mut player, config);
    let doors = DoorController::new(west, north);

    let surfaces: Vec<(SurfaceKind, Entity)> = SurfaceKind::ALL
        .iter()
        .map(|&kind| (kind, world.spawn(SurfaceMaterial::default()).id()))
        .collect();
    let surface_entity = |kind: SurfaceKind| {
        surfaces
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, e)| *e)
            .unwrap_or(Entity::PLACEHOLDER)
    };

    let mut targets: Vec<(SurfaceKind, Entity)> = Vec::new();
    let mut door_entities = Vec::new();

    for spec in layout() {
        let mut mesh = world.spawn((
            RoomMesh { name: spec.name },
            spec.placement,
            spec.color,
            Visible(true),
            MaterialBinding(surface_entity(spec.surface)),
        ));

        match spec.channel {
            Channel::Static => {}
            Channel::Door(door) => {
                let clips = doors.clips(door);
                mesh.insert((
                    Door(door),
                    DrivenBy { clips: vec![clips.open, clips.close], axis: Vec3::Y },
                ));
                door_entities.push((door, mesh.id()));
            }
            Channel::Prop { clip, axis } => {
                if let Some(id) = player.find(clip) {
                    mesh.insert(DrivenBy { clips: vec![id], axis });
                }
            }
        }

        targets.push((spec.surface, mesh.id()));
    }

    for &(kind, entity) in &surfaces {
        let binding = SurfaceBinding::new(
            kind,
            SurfaceNormal::from_reference(&kind.reference_plane()),
            config.thresholds.for_category(kind.category()),
            targets.iter().filter(|(k, _)| *k == kind).map(|(_, e)| *e).collect(),
        );
        world.entity_mut(entity).insert(binding);
    }

    // Continuous animations: started once, never stopped.
    for name in [PC_FAN_CLIP, CEILING_FAN_CLIP, LUCKY_CAT_CLIP] {
        if let Some(clip) = player.find(name) {
            player.play_looped(clip);
        }
    }

    world.insert_resource(player);
    world.insert_resource(doors);

    log::info!("Spawned room: {} surfaces, {} meshes", surfaces.len(), targets.len());

    Room {
        surfaces,
        doors: door_entities,
    }
}

/// Rest rotation of a door mesh, before any clip is applied.
pub fn door_rest_rotation(door: DoorId) -> Quat {
    match door {
        DoorId::West => Quat::IDENTITY,
        DoorId::North => Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::visibility::VisibilityThreshold;

    fn spawned() -> (World, Room) {
        let mut world = World::new();
        let room = spawn_room(&mut world, &RoomConfig::default());
        (world, room)
    }

    fn mesh_names(world: &World, entities: &[Entity]) -> Vec<&'static str> {
        entities
            .iter()
            .map(|&e| world.get::<RoomMesh>(e).map(|m| m.name).unwrap_or("?"))
            .collect()
    }

    #[test]
    fn surfaces_bind_their_meshes() {
        let (world, room) = spawned();
        let expected = [
            (SurfaceKind::WallNorth, vec!["wall_N", "door_N"]),
            (SurfaceKind::WallSouth, vec!["wall_S"]),
            (SurfaceKind::WallEast, vec!["wall_E", "paw"]),
            (SurfaceKind::WallWest, vec!["wall_W", "door_W"]),
            (SurfaceKind::Floor, vec!["floor", "pc_fan"]),
            (SurfaceKind::Ceiling, vec!["ceiling", "fan_blades"]),
        ];

        for (kind, names) in expected {
            let entity = room.surface(kind).unwrap();
            let binding = world.get::<SurfaceBinding>(entity).unwrap();
            assert_eq!(mesh_names(&world, &binding.targets), names, "{kind:?}");

            for target in &binding.targets {
                assert_eq!(world.get::<MaterialBinding>(*target).unwrap().0, entity);
            }
        }
    }

    #[test]
    fn thresholds_follow_category() {
        let (world, room) = spawned();
        let threshold = |kind| world.get::<SurfaceBinding>(room.surface(kind).unwrap()).unwrap().threshold();

        assert_eq!(threshold(SurfaceKind::WallEast), VisibilityThreshold::WALLS);
        assert_eq!(threshold(SurfaceKind::Floor), VisibilityThreshold::FLOOR);
        assert_eq!(threshold(SurfaceKind::Ceiling), VisibilityThreshold::CEILING);
    }

    #[test]
    fn props_loop_from_mount_and_doors_rest() {
        let (world, _) = spawned();
        let player = world.resource::<ClipPlayer>();

        for name in [PC_FAN_CLIP, CEILING_FAN_CLIP, LUCKY_CAT_CLIP] {
            assert!(player.is_running(player.find(name).unwrap()), "{name} not started");
        }
        for door in DoorId::ALL {
            let (open, close) = door.clip_names();
            assert!(!player.is_running(player.find(open).unwrap()));
            assert!(!player.is_running(player.find(close).unwrap()));
        }
    }

    #[test]
    fn doors_are_tagged_and_driven() {
        let (world, room) = spawned();
        let controller = world.resource::<DoorController>();

        for door in DoorId::ALL {
            let entity = room.door(door).unwrap();
            assert_eq!(world.get::<Door>(entity), Some(&Door(door)));

            let clips = controller.clips(door);
            let driven = world.get::<DrivenBy>(entity).unwrap();
            assert_eq!(driven.clips, vec![clips.open, clips.close]);

            let placement = world.get::<Placement>(entity).unwrap();
            assert!(placement.rotation.abs_diff_eq(door_rest_rotation(door), 1e-6));
        }
    }

    #[test]
    fn doors_swing_into_the_room() {
        let config = RoomConfig::default();
        let (world, room) = spawned();

        for door in DoorId::ALL {
            let entity = room.door(door).unwrap();
            let mut placement = *world.get::<Placement>(entity).unwrap();
            placement.animated = Quat::from_rotation_y(config.doors.open_angle * door_swing(door));

            let centre = placement.matrix().transform_point3(Vec3::ZERO);
            assert!(centre.x.abs() < WALL_CENTRE - 0.2 && centre.z.abs() < WALL_CENTRE - 0.2,
                "{door:?} swings outside: {centre}");
        }
    }
}
