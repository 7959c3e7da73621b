//! Completion animation state machine for tasks and rooms.
//!
//! Each task and room carries an [`AnimationTrack`]. Timers are plain
//! [`TimerAction`] values tagged with the track's epoch at scheduling time;
//! cancelling a track bumps the epoch so any timer already queued for it
//! becomes a no-op when it fires.

use std::f32::consts::TAU;
use std::time::Duration;

use rand::Rng;

use super::reducer::BoardEffect;
use super::state::Board;
use super::state::BoardState;
use super::state::Progress;
use super::state::RoomKey;
use super::state::TaskKey;

pub const EXPLODE_DELAY: Duration = Duration::from_millis(200);
pub const ROOM_CHECK_DELAY: Duration = Duration::from_millis(300);
pub const TASK_SHAKE: Duration = Duration::from_millis(600);
pub const ROOM_SHAKE: Duration = Duration::from_millis(800);
pub const EXPLOSION: Duration = Duration::from_millis(1500);

pub const TASK_BURST: BurstSpec = BurstSpec {
    count: 15,
    min_radius: 40.0,
    max_radius: 90.0,
};

pub const ROOM_BURST: BurstSpec = BurstSpec {
    count: 30,
    min_radius: 90.0,
    max_radius: 180.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationPhase {
    #[default]
    Idle,
    Shaking,
    Exploding,
    Hidden,
}

impl AnimationPhase {
    pub fn is_animating(self) -> bool {
        matches!(self, Self::Shaking | Self::Exploding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationTrack {
    pub phase: AnimationPhase,
    pub epoch: u64,
}

impl AnimationTrack {
    /// Returns to idle and invalidates every timer scheduled so far.
    pub fn cancel(&mut self) {
        self.phase = AnimationPhase::Idle;
        self.epoch += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnimationTarget {
    Task(TaskKey),
    Room(RoomKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Progress,
    Complete,
    RoomComplete,
}

impl Cue {
    pub fn label(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Complete => "complete",
            Self::RoomComplete => "room-complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstSpec {
    pub count: usize,
    pub min_radius: f32,
    pub max_radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub angle: f32,
    pub distance: f32,
}

impl Particle {
    pub fn offset(&self) -> (f32, f32) {
        (self.angle.cos() * self.distance, self.angle.sin() * self.distance)
    }
}

impl BurstSpec {
    pub fn scatter<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Particle> {
        (0..self.count)
            .map(|_| Particle {
                angle: rng.gen_range(0.0..TAU),
                distance: rng.gen_range(self.min_radius..=self.max_radius),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    Explode { target: AnimationTarget, epoch: u64 },
    CheckRoom { room: RoomKey, epoch: u64 },
    Settle { target: AnimationTarget, epoch: u64 },
}

fn track_mut<'a>(board: &'a mut Board, target: &AnimationTarget) -> Option<&'a mut AnimationTrack> {
    match target {
        AnimationTarget::Task(key) => board.task_mut(key).map(|task| &mut task.animation),
        AnimationTarget::Room(key) => board.room_mut(key).map(|room| &mut room.animation),
    }
}

/// Runs after a task's stored progress changed from `previous`.
pub(crate) fn on_task_progress(
    state: &mut BoardState,
    key: &TaskKey,
    previous: Progress,
    effects: &mut Vec<BoardEffect>,
) {
    let Some(task) = state.board.task_mut(key) else {
        return;
    };
    let current = task.progress;
    if current == previous {
        return;
    }

    if current.is_complete() {
        if task.animation.phase != AnimationPhase::Idle {
            return;
        }
        task.animation.phase = AnimationPhase::Shaking;
        let epoch = task.animation.epoch;
        let target = AnimationTarget::Task(key.clone());
        effects.push(BoardEffect::PlayCue(Cue::Progress));
        effects.push(BoardEffect::Shake {
            target: target.clone(),
            duration: TASK_SHAKE,
        });
        effects.push(BoardEffect::Schedule {
            delay: EXPLODE_DELAY,
            timer: TimerAction::Explode { target, epoch },
        });
        return;
    }

    if task.animation.phase != AnimationPhase::Idle {
        task.animation.cancel();
    }
    if let Some(room) = state.board.room_mut(&key.room_key()) {
        if room.animation.phase != AnimationPhase::Idle {
            room.animation.cancel();
        }
    }
    if current != Progress::ZERO {
        effects.push(BoardEffect::PlayCue(Cue::Progress));
    }
}

pub(crate) fn on_timer(state: &mut BoardState, timer: TimerAction, effects: &mut Vec<BoardEffect>) {
    match timer {
        TimerAction::Explode { target, epoch } => explode(state, target, epoch, effects),
        TimerAction::CheckRoom { room, epoch } => check_room(state, room, epoch, effects),
        TimerAction::Settle { target, epoch } => settle(state, target, epoch, effects),
    }
}

fn explode(
    state: &mut BoardState,
    target: AnimationTarget,
    epoch: u64,
    effects: &mut Vec<BoardEffect>,
) {
    let Some(track) = track_mut(&mut state.board, &target) else {
        return;
    };
    if track.epoch != epoch || track.phase != AnimationPhase::Shaking {
        return;
    }
    track.phase = AnimationPhase::Exploding;

    let spec = match &target {
        AnimationTarget::Task(_) => {
            effects.push(BoardEffect::PlayCue(Cue::Complete));
            TASK_BURST
        }
        AnimationTarget::Room(_) => ROOM_BURST,
    };
    effects.push(BoardEffect::Burst {
        target: target.clone(),
        spec,
    });
    effects.push(BoardEffect::Schedule {
        delay: EXPLOSION,
        timer: TimerAction::Settle {
            target: target.clone(),
            epoch,
        },
    });

    if let AnimationTarget::Task(key) = &target {
        let room_key = key.room_key();
        if let Some(room) = state.board.room(&room_key) {
            if room.is_complete() && room.animation.phase == AnimationPhase::Idle {
                effects.push(BoardEffect::Schedule {
                    delay: ROOM_CHECK_DELAY,
                    timer: TimerAction::CheckRoom {
                        room: room_key,
                        epoch: room.animation.epoch,
                    },
                });
            }
        }
    }
    effects.push(BoardEffect::RequestFrame);
}

fn check_room(state: &mut BoardState, key: RoomKey, epoch: u64, effects: &mut Vec<BoardEffect>) {
    let Some(room) = state.board.room_mut(&key) else {
        return;
    };
    if room.animation.epoch != epoch
        || room.animation.phase != AnimationPhase::Idle
        || !room.is_complete()
    {
        return;
    }
    room.animation.phase = AnimationPhase::Shaking;
    let target = AnimationTarget::Room(key);
    effects.push(BoardEffect::PlayCue(Cue::RoomComplete));
    effects.push(BoardEffect::Shake {
        target: target.clone(),
        duration: ROOM_SHAKE,
    });
    effects.push(BoardEffect::Schedule {
        delay: EXPLODE_DELAY,
        timer: TimerAction::Explode { target, epoch },
    });
    effects.push(BoardEffect::RequestFrame);
}

fn settle(state: &mut BoardState, target: AnimationTarget, epoch: u64, effects: &mut Vec<BoardEffect>) {
    let show_completed = state.preferences.show_completed;
    let Some(track) = track_mut(&mut state.board, &target) else {
        return;
    };
    if track.epoch != epoch || track.phase != AnimationPhase::Exploding {
        return;
    }
    track.phase = if show_completed {
        AnimationPhase::Idle
    } else {
        AnimationPhase::Hidden
    };
    effects.push(BoardEffect::RequestFrame);
}

/// Resets tracks of tasks and rooms that are no longer complete.
pub(crate) fn cancel_incomplete(board: &mut Board) {
    for floor in board.floors.values_mut() {
        for room in floor.rooms.values_mut() {
            for task in room.tasks.values_mut() {
                if !task.progress.is_complete() && task.animation.phase != AnimationPhase::Idle {
                    task.animation.cancel();
                }
            }
            if !room.is_complete() && room.animation.phase != AnimationPhase::Idle {
                room.animation.cancel();
            }
        }
    }
}

/// Moves settled tracks between `Idle` and `Hidden` when the show-completed
/// preference flips. In-flight sequences are left to finish on their own.
pub(crate) fn apply_show_completed(board: &mut Board, show_completed: bool) {
    let settle = |track: &mut AnimationTrack, complete: bool| {
        match (track.phase, show_completed) {
            (AnimationPhase::Hidden, true) => track.phase = AnimationPhase::Idle,
            (AnimationPhase::Idle, false) if complete => track.phase = AnimationPhase::Hidden,
            _ => {}
        }
    };
    for floor in board.floors.values_mut() {
        for room in floor.rooms.values_mut() {
            let room_complete = room.is_complete();
            for task in room.tasks.values_mut() {
                settle(&mut task.animation, task.progress.is_complete());
            }
            settle(&mut room.animation, room_complete);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn scatter_respects_count_and_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        for spec in [TASK_BURST, ROOM_BURST] {
            let particles = spec.scatter(&mut rng);
            assert_eq!(particles.len(), spec.count);
            for particle in particles {
                assert!(particle.distance >= spec.min_radius && particle.distance <= spec.max_radius);
                assert!((0.0..TAU).contains(&particle.angle));
                let (dx, dy) = particle.offset();
                let radius = (dx * dx + dy * dy).sqrt();
                assert!((radius - particle.distance).abs() < 0.01);
            }
        }
    }

    #[test]
    fn cancel_bumps_epoch_and_returns_to_idle() {
        let mut track = AnimationTrack {
            phase: AnimationPhase::Exploding,
            epoch: 3,
        };
        track.cancel();
        assert_eq!(track.phase, AnimationPhase::Idle);
        assert_eq!(track.epoch, 4);
        assert!(!track.phase.is_animating());
    }
}
