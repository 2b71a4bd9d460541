// Door animation state machine, one per hinged door.
//
//   Closed  --click-->            Opening   (stop close clip, play open clip once)
//   Opening --open clip done-->   Open
//   Open    --click-->            Closing   (stop open clip, play close clip once)
//   Closing --close clip done-->  Closed
//
// Clicks while Opening/Closing are ignored, so a door never has more than one
// clip in flight. Each start records a one-shot InFlight entry; the matching
// completion (by exact clip identity) takes it, so it resolves exactly once.
//
// DoorController is the only writer of door state.

use bevy_ecs::prelude::*;

use super::animation::{ClipId, ClipPlayback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorId {
    West,
    North,
}

impl DoorId {
    pub const ALL: [DoorId; 2] = [DoorId::West, DoorId::North];

    pub fn label(self) -> &'static str {
        match self {
            DoorId::West => "door_west",
            DoorId::North => "door_north",
        }
    }

    /// Names of the open/close clips baked for this door.
    pub fn clip_names(self) -> (&'static str, &'static str) {
        match self {
            DoorId::West => ("door_W_open", "door_W_close"),
            DoorId::North => ("door_N_open", "door_N_close"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoorState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl DoorState {
    /// Opening or Closing: an animation is in flight and clicks are ignored.
    pub fn is_transient(self) -> bool {
        matches!(self, DoorState::Opening | DoorState::Closing)
    }

    pub fn label(self) -> &'static str {
        match self {
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Open => "open",
            DoorState::Closing => "closing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorClips {
    pub open: ClipId,
    pub close: ClipId,
}

/// A door mesh was clicked.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorClicked {
    pub door: DoorId,
}

/// Published on every door state transition.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorStateChanged {
    pub door: DoorId,
    pub state: DoorState,
}

/// One-shot completion subscription for the clip currently playing on a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    clip: ClipId,
    settles_to: DoorState,
}

#[derive(Debug)]
struct Door {
    clips: DoorClips,
    state: DoorState,
    in_flight: Option<InFlight>,
}

impl Door {
    fn new(clips: DoorClips) -> Self {
        Self {
            clips,
            state: DoorState::Closed,
            in_flight: None,
        }
    }
}

#[derive(Resource, Debug)]
pub struct DoorController {
    west: Door,
    north: Door,
}

impl DoorController {
    pub fn new(west: DoorClips, north: DoorClips) -> Self {
        Self {
            west: Door::new(west),
            north: Door::new(north),
        }
    }

    pub fn state(&self, door: DoorId) -> DoorState {
        self.door(door).state
    }

    pub fn clips(&self, door: DoorId) -> DoorClips {
        self.door(door).clips
    }

    /// Clip currently in flight on `door`, if any.
    pub fn in_flight(&self, door: DoorId) -> Option<ClipId> {
        self.door(door).in_flight.map(|flight| flight.clip)
    }

    /// Start the next transition for `door` unless one is already running.
    pub fn on_door_clicked(
        &mut self,
        door: DoorId,
        player: &mut impl ClipPlayback,
    ) -> Option<DoorStateChanged> {
        let entry = self.door_mut(door);

        let (stale, clip, transient, settles_to) = match entry.state {
            DoorState::Closed => (entry.clips.close, entry.clips.open, DoorState::Opening, DoorState::Open),
            DoorState::Open => (entry.clips.open, entry.clips.close, DoorState::Closing, DoorState::Closed),
            DoorState::Opening | DoorState::Closing => {
                log::debug!("{} is {}, click ignored", door.label(), entry.state.label());
                return None;
            }
        };
        debug_assert!(entry.in_flight.is_none(), "stable door with a pending completion");

        player.stop(stale);
        player.play_once(clip, true);

        entry.in_flight = Some(InFlight { clip, settles_to });
        entry.state = transient;

        log::info!("{} -> {}", door.label(), transient.label());
        Some(DoorStateChanged { door, state: transient })
    }

    /// Settle whichever door was waiting on `clip`. Unrelated clips are ignored.
    pub fn on_animation_completed(&mut self, clip: ClipId) -> Option<DoorStateChanged> {
        for door in DoorId::ALL {
            let entry = self.door_mut(door);
            if let Some(flight) = entry.in_flight.take_if(|flight| flight.clip == clip) {
                entry.state = flight.settles_to;
                log::info!("{} -> {}", door.label(), flight.settles_to.label());
                return Some(DoorStateChanged { door, state: flight.settles_to });
            }
        }

        log::debug!("no door waiting on {clip:?}");
        None
    }

    /// Force `door` back to Closed, dropping any pending completion.
    pub fn reset(&mut self, door: DoorId, player: &mut impl ClipPlayback) -> Option<DoorStateChanged> {
        let entry = self.door_mut(door);
        if let Some(flight) = entry.in_flight.take() {
            player.stop(flight.clip);
        }
        player.stop(entry.clips.open);

        if entry.state == DoorState::Closed {
            return None;
        }
        entry.state = DoorState::Closed;
        log::info!("{} reset", door.label());
        Some(DoorStateChanged { door, state: DoorState::Closed })
    }

    fn door(&self, door: DoorId) -> &Door {
        match door {
            DoorId::West => &self.west,
            DoorId::North => &self.north,
        }
    }

    fn door_mut(&mut self, door: DoorId) -> &mut Door {
        match door {
            DoorId::West => &mut self.west,
            DoorId::North => &mut self.north,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::{AnimationClip, ClipPlayer};

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Play(ClipId),
        Stop(ClipId),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Recorder {
        fn plays(&self) -> Vec<ClipId> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Play(clip) => Some(*clip),
                    Call::Stop(_) => None,
                })
                .collect()
        }
    }

    impl ClipPlayback for Recorder {
        fn play_once(&mut self, clip: ClipId, clamp_when_finished: bool) {
            assert!(clamp_when_finished);
            self.calls.push(Call::Play(clip));
        }

        fn stop(&mut self, clip: ClipId) {
            self.calls.push(Call::Stop(clip));
        }
    }

    fn controller() -> (DoorController, ClipPlayer) {
        let mut player = ClipPlayer::new();
        let mut clips = |door: DoorId| {
            let (open, close) = door.clip_names();
            DoorClips {
                open: player.add_clip(AnimationClip::linear(open, 1.0, 0.0, 1.0)),
                close: player.add_clip(AnimationClip::linear(close, 1.0, 1.0, 0.0)),
            }
        };
        let west = clips(DoorId::West);
        let north = clips(DoorId::North);
        (DoorController::new(west, north), player)
    }

    #[test]
    fn open_then_close_cycle() {
        let (mut doors, _) = controller();
        let clips = doors.clips(DoorId::West);
        let mut rec = Recorder::default();

        let change = doors.on_door_clicked(DoorId::West, &mut rec);
        assert_eq!(change, Some(DoorStateChanged { door: DoorId::West, state: DoorState::Opening }));
        assert_eq!(rec.calls, vec![Call::Stop(clips.close), Call::Play(clips.open)]);

        doors.on_animation_completed(clips.open);
        assert_eq!(doors.state(DoorId::West), DoorState::Open);

        doors.on_door_clicked(DoorId::West, &mut rec);
        assert_eq!(doors.state(DoorId::West), DoorState::Closing);
        assert_eq!(rec.plays(), vec![clips.open, clips.close]);

        let change = doors.on_animation_completed(clips.close);
        assert_eq!(change, Some(DoorStateChanged { door: DoorId::West, state: DoorState::Closed }));
        assert_eq!(doors.in_flight(DoorId::West), None);
    }

    #[test]
    fn clicks_while_in_flight_are_ignored() {
        let (mut doors, _) = controller();
        let mut rec = Recorder::default();

        doors.on_door_clicked(DoorId::North, &mut rec);
        let before = rec.calls.len();

        for _ in 0..5 {
            assert_eq!(doors.on_door_clicked(DoorId::North, &mut rec), None);
        }
        assert_eq!(rec.calls.len(), before);
        assert_eq!(rec.plays().len(), 1);
        assert_eq!(doors.state(DoorId::North), DoorState::Opening);
    }

    #[test]
    fn completion_re_enables_clicks() {
        let (mut doors, _) = controller();
        let clips = doors.clips(DoorId::North);
        let mut rec = Recorder::default();

        doors.on_door_clicked(DoorId::North, &mut rec);
        doors.on_animation_completed(clips.open);

        assert!(doors.on_door_clicked(DoorId::North, &mut rec).is_some());
        assert_eq!(rec.plays(), vec![clips.open, clips.close]);
    }

    #[test]
    fn completion_for_one_door_leaves_the_other_alone() {
        let (mut doors, _) = controller();
        let west = doors.clips(DoorId::West);
        let mut rec = Recorder::default();

        doors.on_door_clicked(DoorId::West, &mut rec);
        doors.on_door_clicked(DoorId::North, &mut rec);

        let change = doors.on_animation_completed(west.open);
        assert_eq!(change.map(|c| c.door), Some(DoorId::West));
        assert_eq!(doors.state(DoorId::West), DoorState::Open);
        assert_eq!(doors.state(DoorId::North), DoorState::Opening);
    }

    #[test]
    fn duplicate_or_foreign_completions_are_ignored() {
        let (mut doors, _) = controller();
        let west = doors.clips(DoorId::West);
        let north = doors.clips(DoorId::North);
        let mut rec = Recorder::default();

        doors.on_door_clicked(DoorId::West, &mut rec);

        // Wrong direction for the in-flight clip.
        assert_eq!(doors.on_animation_completed(west.close), None);
        // Other door never started.
        assert_eq!(doors.on_animation_completed(north.open), None);
        assert_eq!(doors.state(DoorId::West), DoorState::Opening);

        assert!(doors.on_animation_completed(west.open).is_some());
        assert_eq!(doors.on_animation_completed(west.open), None);
        assert_eq!(doors.state(DoorId::West), DoorState::Open);
    }

    #[test]
    fn reset_discards_pending_completion() {
        let (mut doors, _) = controller();
        let west = doors.clips(DoorId::West);
        let mut rec = Recorder::default();

        doors.on_door_clicked(DoorId::West, &mut rec);
        let change = doors.reset(DoorId::West, &mut rec);

        assert_eq!(change, Some(DoorStateChanged { door: DoorId::West, state: DoorState::Closed }));
        assert!(rec.calls.contains(&Call::Stop(west.open)));
        assert_eq!(doors.on_animation_completed(west.open), None);
        assert_eq!(doors.state(DoorId::West), DoorState::Closed);
    }

    #[test]
    fn drives_a_real_player_to_completion() {
        let (mut doors, mut player) = controller();
        let north = doors.clips(DoorId::North);

        doors.on_door_clicked(DoorId::North, &mut player);
        assert!(player.is_running(north.open));

        let mut finished = Vec::new();
        for _ in 0..20 {
            player.advance(0.1, |clip| finished.push(clip));
        }
        assert_eq!(finished, vec![north.open]);

        for clip in finished {
            doors.on_animation_completed(clip);
        }
        assert_eq!(doors.state(DoorId::North), DoorState::Open);
        assert_eq!(player.value(north.open), Some(1.0));
    }

    #[test]
    fn transient_view() {
        assert!(DoorState::Opening.is_transient());
        assert!(DoorState::Closing.is_transient());
        assert!(!DoorState::Open.is_transient());
        assert!(!DoorState::Closed.is_transient());
    }
}
