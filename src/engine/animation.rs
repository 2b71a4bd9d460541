// Minimal animation-clip player.
//
// A clip is a single keyframed scalar channel (hinge yaw, fan spin, paw wave).
// The player keeps one action per registered clip, the way an
// AnimationMixer keeps one action per clip:
//
//   play_once   → restart from t=0, finish once, optionally clamp on the last frame
//   play_looped → restart from t=0, wrap forever, never finishes
//   stop        → deactivate; the bound value falls back to its rest pose
//
// advance() reports every once-clip that reached its end through a single
// global "finished" callback carrying the clip's identity.

use bevy_ecs::prelude::*;

/// Identity of a registered clip. Finished events are dispatched on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

/// Named, time-bounded keyframe track.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    keyframes: Vec<Keyframe>,
}

impl AnimationClip {
    /// Keyframes are `(time, value)` pairs; they are sorted by time here.
    pub fn new(name: impl Into<String>, duration: f32, keyframes: &[(f32, f32)]) -> Self {
        let mut keyframes: Vec<Keyframe> = keyframes
            .iter()
            .map(|&(time, value)| Keyframe { time, value })
            .collect();
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self {
            name: name.into(),
            duration: duration.max(0.0),
            keyframes,
        }
    }

    /// Two-key clip going linearly from `from` to `to` over `duration`.
    pub fn linear(name: impl Into<String>, duration: f32, from: f32, to: f32) -> Self {
        Self::new(name, duration, &[(0.0, from), (duration, to)])
    }

    /// Linear interpolation between the surrounding keyframes, held flat
    /// outside the keyed range.
    pub fn sample(&self, time: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return 0.0;
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let next = self.keyframes.partition_point(|k| k.time <= time);
        let a = self.keyframes[next - 1];
        let b = self.keyframes[next];
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return b.value;
        }
        a.value + (b.value - a.value) * (time - a.time) / span
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Repeat,
}

#[derive(Debug)]
struct Action {
    clip: AnimationClip,
    time: f32,
    loop_mode: LoopMode,
    clamp_when_finished: bool,
    /// Contributes a value to its target.
    active: bool,
    /// Time is advancing.
    running: bool,
}

/// Emitted once per once-clip that ran to its end.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFinished {
    pub clip: ClipId,
}

/// What the door controller needs from a clip player.
pub trait ClipPlayback {
    fn play_once(&mut self, clip: ClipId, clamp_when_finished: bool);
    fn stop(&mut self, clip: ClipId);
}

#[derive(Resource, Debug, Default)]
pub struct ClipPlayer {
    actions: Vec<Action>,
}

impl ClipPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, clip: AnimationClip) -> ClipId {
        let id = ClipId(self.actions.len());
        self.actions.push(Action {
            clip,
            time: 0.0,
            loop_mode: LoopMode::Once,
            clamp_when_finished: false,
            active: false,
            running: false,
        });
        id
    }

    pub fn find(&self, name: &str) -> Option<ClipId> {
        self.actions
            .iter()
            .position(|action| action.clip.name == name)
            .map(ClipId)
    }

    pub fn name(&self, clip: ClipId) -> Option<&str> {
        self.actions.get(clip.0).map(|action| action.clip.name.as_str())
    }

    pub fn play_once(&mut self, clip: ClipId, clamp_when_finished: bool) {
        self.start(clip, LoopMode::Once, clamp_when_finished);
    }

    pub fn play_looped(&mut self, clip: ClipId) {
        self.start(clip, LoopMode::Repeat, false);
    }

    pub fn stop(&mut self, clip: ClipId) {
        if let Some(action) = self.actions.get_mut(clip.0) {
            action.active = false;
            action.running = false;
            action.time = 0.0;
        }
    }

    pub fn is_running(&self, clip: ClipId) -> bool {
        self.actions.get(clip.0).is_some_and(|action| action.running)
    }

    /// Names of clips that are still advancing.
    pub fn running(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.actions.len())
            .map(ClipId)
            .filter(|&clip| self.is_running(clip))
            .filter_map(|clip| self.name(clip))
    }

    /// Current value of the clip's channel, `None` while the clip is inactive.
    pub fn value(&self, clip: ClipId) -> Option<f32> {
        let action = self.actions.get(clip.0)?;
        action.active.then(|| action.clip.sample(action.time))
    }

    /// Advance every running action by `dt` seconds.
    pub fn advance(&mut self, dt: f32, mut on_finished: impl FnMut(ClipId)) {
        for (index, action) in self.actions.iter_mut().enumerate() {
            if !action.running {
                continue;
            }
            action.time += dt;

            let duration = action.clip.duration;
            match action.loop_mode {
                LoopMode::Repeat => {
                    action.time = if duration > 0.0 { action.time.rem_euclid(duration) } else { 0.0 };
                }
                LoopMode::Once => {
                    if action.time >= duration {
                        action.time = duration;
                        action.running = false;
                        action.active = action.clamp_when_finished;
                        on_finished(ClipId(index));
                    }
                }
            }
        }
    }

    fn start(&mut self, clip: ClipId, loop_mode: LoopMode, clamp_when_finished: bool) {
        let Some(action) = self.actions.get_mut(clip.0) else {
            log::warn!("play requested for unknown clip {clip:?}");
            return;
        };
        action.time = 0.0;
        action.loop_mode = loop_mode;
        action.clamp_when_finished = clamp_when_finished;
        action.active = true;
        action.running = true;
    }
}

impl ClipPlayback for ClipPlayer {
    fn play_once(&mut self, clip: ClipId, clamp_when_finished: bool) {
        ClipPlayer::play_once(self, clip, clamp_when_finished);
    }

    fn stop(&mut self, clip: ClipId) {
        ClipPlayer::stop(self, clip);
    }
}
