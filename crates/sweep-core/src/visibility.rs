//! Pure projection from board values and preferences to what is shown.

use std::collections::BTreeSet;

use super::state::Board;
use super::state::BoardState;
use super::state::Preferences;
use super::state::Room;
use super::state::RoomKey;
use super::state::Task;
use super::state::TaskKey;
use super::state::View;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    tasks: BTreeSet<TaskKey>,
    rooms: BTreeSet<RoomKey>,
}

impl VisibleSet {
    pub fn task_visible(&self, key: &TaskKey) -> bool {
        self.tasks.contains(key)
    }

    pub fn room_visible(&self, key: &RoomKey) -> bool {
        self.rooms.contains(key)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskKey> {
        self.tasks.iter()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomKey> {
        self.rooms.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.rooms.is_empty()
    }
}

pub fn task_passes(task: &Task, prefs: &Preferences) -> bool {
    prefs.active_filters.allows(task.assignment)
        && (prefs.show_completed || !task.progress.is_complete())
}

pub fn room_passes(room: &Room, prefs: &Preferences) -> bool {
    prefs.show_hidden || !room.hidden
}

/// A room is shown when it passes the hidden rule and at least one of its
/// tasks passes the task rule. Depends only on current values, never on
/// the order in which they arrived.
pub fn compute(board: &Board, prefs: &Preferences) -> VisibleSet {
    let mut visible = VisibleSet::default();
    for (room_key, room) in board.rooms() {
        if !room_passes(room, prefs) {
            continue;
        }
        let before = visible.tasks.len();
        for (name, task) in &room.tasks {
            if task_passes(task, prefs) {
                visible.tasks.insert(room_key.task(name.as_str()));
            }
        }
        if visible.tasks.len() > before {
            visible.rooms.insert(room_key);
        }
    }
    visible
}

pub fn floor_visible(view: &View, floor: &str) -> bool {
    match view {
        View::All => true,
        View::Floor(name) => name == floor,
    }
}

/// [`compute`] plus entities still mid-animation, so a completion sequence
/// plays out before the filter rule removes its target.
pub fn displayed(state: &BoardState) -> VisibleSet {
    let prefs = &state.preferences;
    let mut visible = compute(&state.board, prefs);
    for (room_key, room) in state.board.rooms() {
        if !room_passes(room, prefs) {
            continue;
        }
        let mut pinned = room.animation.phase.is_animating();
        for (name, task) in &room.tasks {
            if task.animation.phase.is_animating() {
                visible.tasks.insert(room_key.task(name.as_str()));
                pinned = true;
            }
        }
        if pinned {
            visible.rooms.insert(room_key);
        }
    }
    visible
}
