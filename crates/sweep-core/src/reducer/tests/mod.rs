use std::time::Duration;

use serde_json::json;

pub(super) use super::reduce;
pub(super) use super::BoardEffect;
pub(super) use crate::actions::BoardAction;
pub(super) use crate::actions::RemoteAction;
pub(super) use crate::actions::RemoteCall;
pub(super) use crate::actions::UserAction;
pub(super) use crate::animation::AnimationPhase;
pub(super) use crate::animation::AnimationTarget;
pub(super) use crate::animation::Cue;
pub(super) use crate::animation::TimerAction;
pub(super) use crate::animation::EXPLOSION;
pub(super) use crate::animation::ROOM_BURST;
pub(super) use crate::animation::ROOM_SHAKE;
pub(super) use crate::animation::TASK_BURST;
pub(super) use crate::animation::TASK_SHAKE;
pub(super) use crate::protocol::ChannelMessage;
pub(super) use crate::protocol::ProgressTree;
pub(super) use crate::scheduler::TimerQueue;
pub(super) use crate::state::ActiveFilters;
pub(super) use crate::state::Assignment;
pub(super) use crate::state::Board;
pub(super) use crate::state::BoardState;
pub(super) use crate::state::FilterChip;
pub(super) use crate::state::LogLevel;
pub(super) use crate::state::Preferences;
pub(super) use crate::state::Progress;
pub(super) use crate::state::ProgressOverflow;
pub(super) use crate::state::ProgressPolicy;
pub(super) use crate::state::RoomKey;
pub(super) use crate::state::TaskKey;
pub(super) use crate::state::View;
pub(super) use crate::visibility;

mod assignment;
mod filters;

/// Kitchen is one click from complete: Counters is done, Sink sits at 80.
fn tree() -> ProgressTree {
    serde_json::from_value(json!({
        "downstairs": {
            "Kitchen": {
                "hidden": 0,
                "tasks": {
                    "Sink": { "progress": 80, "assignment": 0 },
                    "Counters": { "progress": 100, "assignment": 2 }
                }
            },
            "Pantry": {
                "hidden": 1,
                "tasks": {
                    "Shelves": { "progress": 0, "assignment": 0 }
                }
            }
        },
        "upstairs": {
            "Bathroom": {
                "hidden": 0,
                "tasks": {
                    "Tub": { "progress": 50, "assignment": 3 },
                    "Mirror": { "progress": 0, "assignment": 0 }
                }
            }
        }
    }))
    .expect("tree")
}

fn state() -> BoardState {
    BoardState::new(
        Board::from_snapshot(&tree()),
        Preferences::default(),
        ProgressPolicy {
            step: 20,
            overflow: ProgressOverflow::Wrap,
        },
    )
}

fn sink() -> TaskKey {
    TaskKey::new("downstairs", "Kitchen", "Sink")
}

fn counters() -> TaskKey {
    TaskKey::new("downstairs", "Kitchen", "Counters")
}

fn tub() -> TaskKey {
    TaskKey::new("upstairs", "Bathroom", "Tub")
}

fn kitchen() -> RoomKey {
    RoomKey::new("downstairs", "Kitchen")
}

fn pantry() -> RoomKey {
    RoomKey::new("downstairs", "Pantry")
}

fn bathroom() -> RoomKey {
    RoomKey::new("upstairs", "Bathroom")
}

/// Drives the reducer with a virtual clock, firing scheduled timers in order.
struct Harness {
    state: BoardState,
    timers: TimerQueue,
    now: Duration,
    effects: Vec<BoardEffect>,
}

impl Harness {
    fn new() -> Self {
        Self::with_state(state())
    }

    fn with_state(state: BoardState) -> Self {
        Self {
            state,
            timers: TimerQueue::new(),
            now: Duration::ZERO,
            effects: Vec::new(),
        }
    }

    fn dispatch(&mut self, action: BoardAction) -> Vec<BoardEffect> {
        let effects = reduce(&mut self.state, action);
        for effect in &effects {
            if let BoardEffect::Schedule { delay, timer } = effect {
                self.timers.schedule(self.now + *delay, timer.clone());
            }
        }
        self.effects.extend(effects.iter().cloned());
        effects
    }

    fn user(&mut self, action: UserAction) -> Vec<BoardEffect> {
        self.dispatch(BoardAction::User(action))
    }

    fn inbound(&mut self, message: ChannelMessage) -> Vec<BoardEffect> {
        self.dispatch(BoardAction::Inbound(message))
    }

    fn remote(&mut self, action: RemoteAction) -> Vec<BoardEffect> {
        self.dispatch(BoardAction::Remote(action))
    }

    fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        while let Some((at, timer)) = self.timers.pop_due(target) {
            self.now = at;
            self.dispatch(BoardAction::Timer(timer));
        }
        self.now = target;
    }

    fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    fn settle(&mut self) {
        self.advance(Duration::from_secs(10));
        assert!(self.timers.is_empty());
    }

    fn progress(&self, key: &TaskKey) -> Progress {
        self.state.board.task(key).expect("task").progress
    }

    fn assignment(&self, key: &TaskKey) -> Assignment {
        self.state.board.task(key).expect("task").assignment
    }

    fn phase(&self, key: &TaskKey) -> AnimationPhase {
        self.state.board.task(key).expect("task").animation.phase
    }

    fn room_phase(&self, key: &RoomKey) -> AnimationPhase {
        self.state.board.room(key).expect("room").animation.phase
    }

    fn cues(&self) -> Vec<Cue> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                BoardEffect::PlayCue(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&BoardEffect) -> bool) -> usize {
        self.effects.iter().filter(|effect| predicate(effect)).count()
    }
}

fn outbound(effects: &[BoardEffect]) -> Vec<&BoardEffect> {
    effects
        .iter()
        .filter(|effect| matches!(effect, BoardEffect::Remote(_) | BoardEffect::Broadcast(_)))
        .collect()
}

fn broadcasts(effects: &[BoardEffect]) -> Vec<ChannelMessage> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            BoardEffect::Broadcast(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}
