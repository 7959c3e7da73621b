use std::time::Duration;

use super::actions::BoardAction;
use super::actions::Origin;
use super::actions::RemoteAction;
use super::actions::RemoteCall;
use super::actions::UserAction;
use super::animation;
use super::animation::AnimationTarget;
use super::animation::BurstSpec;
use super::animation::Cue;
use super::animation::TimerAction;
use super::protocol::ChannelMessage;
use super::state::Assignment;
use super::state::BoardState;
use super::state::ChannelStatus;
use super::state::Delta;
use super::state::DeltaOutcome;
use super::state::LogLevel;
use super::state::Progress;
use super::state::RoomKey;
use super::state::TaskKey;
use super::state::View;

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEffect {
    Remote(RemoteCall),
    Broadcast(ChannelMessage),
    Schedule {
        delay: Duration,
        timer: TimerAction,
    },
    PlayCue(Cue),
    Shake {
        target: AnimationTarget,
        duration: Duration,
    },
    Burst {
        target: AnimationTarget,
        spec: BurstSpec,
    },
    SavePreferences,
    RequestFrame,
}

pub fn reduce(state: &mut BoardState, action: BoardAction) -> Vec<BoardEffect> {
    match action {
        BoardAction::User(user) => reduce_user(state, user),
        BoardAction::Inbound(message) => reduce_inbound(state, message),
        BoardAction::Remote(remote) => reduce_remote(state, remote),
        BoardAction::Timer(timer) => {
            let mut effects = Vec::new();
            animation::on_timer(state, timer, &mut effects);
            effects
        }
    }
}

fn reduce_user(state: &mut BoardState, action: UserAction) -> Vec<BoardEffect> {
    let mut effects = Vec::new();
    match action {
        UserAction::AdvanceProgress(key) => {
            let Some(task) = state.board.task(&key) else {
                return Vec::new();
            };
            let next = state.policy.next(task.progress);
            state
                .activity
                .append(LogLevel::Info, format!("{key} -> {next}"));
            set_progress(state, key, next, Origin::Local, &mut effects);
        }
        UserAction::CycleAssignment(key) => {
            let Some(task) = state.board.task(&key) else {
                return Vec::new();
            };
            let assignment = task.assignment.next();
            request(state, RemoteCall::UpdateAssignment { key, assignment }, &mut effects);
        }
        UserAction::ToggleFilter(chip) => {
            state.preferences.active_filters.toggle(&chip);
            effects.push(BoardEffect::SavePreferences);
            effects.push(BoardEffect::RequestFrame);
        }
        UserAction::SetView(view) => set_view(state, view, Origin::Local, &mut effects),
        UserAction::CycleView => {
            let view = state.next_view();
            set_view(state, view, Origin::Local, &mut effects);
        }
        UserAction::NavigateToRoom(room) => navigate(state, room, Origin::Local, &mut effects),
        UserAction::ToggleShowCompleted => {
            let value = !state.preferences.show_completed;
            set_show_completed(state, value, Origin::Local, &mut effects);
        }
        UserAction::ToggleShowHidden => {
            let value = !state.preferences.show_hidden;
            set_show_hidden(state, value, Origin::Local, &mut effects);
        }
        UserAction::ToggleRoomHidden(room) => {
            let Some(current) = state.board.room(&room) else {
                return Vec::new();
            };
            let hidden = !current.hidden;
            request(state, RemoteCall::SetRoomHidden { room, hidden }, &mut effects);
        }
        UserAction::ResetRoom(room) => {
            if state.board.room(&room).is_none() {
                return Vec::new();
            }
            let message = ChannelMessage::reset_room(&room);
            request(state, RemoteCall::ResetRoom(room), &mut effects);
            effects.push(BoardEffect::Broadcast(message));
        }
        UserAction::ResetTasks => {
            request(state, RemoteCall::ResetTasks, &mut effects);
            effects.push(BoardEffect::Broadcast(ChannelMessage::ResetTasks));
        }
        UserAction::ResetHidden => {
            request(state, RemoteCall::ResetHidden, &mut effects);
            effects.push(BoardEffect::Broadcast(ChannelMessage::ResetHidden));
        }
        UserAction::SetLabel { chip, label } => {
            let label = label.trim();
            if label.is_empty() {
                state.preferences.custom_labels.remove(&chip.key());
            } else {
                state
                    .preferences
                    .custom_labels
                    .insert(chip.key(), label.to_string());
            }
            effects.push(BoardEffect::SavePreferences);
            effects.push(BoardEffect::RequestFrame);
        }
        UserAction::ResetLabel(chip) => {
            state.preferences.custom_labels.remove(&chip.key());
            effects.push(BoardEffect::SavePreferences);
            effects.push(BoardEffect::RequestFrame);
        }
        UserAction::SetTitle(title) => {
            let title = title.trim();
            state.preferences.dashboard_title = (!title.is_empty()).then(|| title.to_string());
            effects.push(BoardEffect::SavePreferences);
            effects.push(BoardEffect::RequestFrame);
        }
        UserAction::ResetTitle => {
            state.preferences.dashboard_title = None;
            effects.push(BoardEffect::SavePreferences);
            effects.push(BoardEffect::RequestFrame);
        }
        UserAction::Refresh => effects.push(BoardEffect::Remote(RemoteCall::FetchProgress)),
    }
    effects
}

/// Applies a peer's message. Nothing here is ever relayed or persisted again.
fn reduce_inbound(state: &mut BoardState, message: ChannelMessage) -> Vec<BoardEffect> {
    let mut effects = Vec::new();
    match message {
        ChannelMessage::UpdateProgress {
            floor,
            room,
            task,
            progress,
        } => {
            let key = TaskKey::new(floor, room, task);
            set_progress(state, key, progress, Origin::Broadcast, &mut effects);
        }
        ChannelMessage::UpdateAssignment {
            floor,
            room,
            task,
            assignment,
        } => {
            let key = TaskKey::new(floor, room, task);
            set_assignment(state, key, assignment, Origin::Broadcast, &mut effects);
        }
        ChannelMessage::NavigateToRoom { floor, room } => {
            navigate(state, RoomKey::new(floor, room), Origin::Broadcast, &mut effects);
        }
        ChannelMessage::SetView { view } => set_view(state, view, Origin::Broadcast, &mut effects),
        ChannelMessage::ToggleShowCompleted { value } => {
            let value = value.unwrap_or(!state.preferences.show_completed);
            set_show_completed(state, value, Origin::Broadcast, &mut effects);
        }
        ChannelMessage::ToggleShowHidden { value } => {
            let value = value.unwrap_or(!state.preferences.show_hidden);
            set_show_hidden(state, value, Origin::Broadcast, &mut effects);
        }
        ChannelMessage::SetRoomHidden {
            floor,
            room,
            hidden,
        } => {
            let room = RoomKey::new(floor, room);
            set_room_hidden(state, room, hidden, Origin::Broadcast, &mut effects);
        }
        ChannelMessage::ResetRoom { floor, room } => {
            let room = RoomKey::new(floor, room);
            for key in state.board.task_keys_in(&room) {
                set_progress(state, key, Progress::ZERO, Origin::Broadcast, &mut effects);
            }
        }
        ChannelMessage::ResetTasks => {
            let keys: Vec<TaskKey> = state.board.tasks().map(|(key, _)| key).collect();
            for key in keys {
                set_progress(state, key.clone(), Progress::ZERO, Origin::Broadcast, &mut effects);
                set_assignment(
                    state,
                    key,
                    Assignment::UNASSIGNED,
                    Origin::Broadcast,
                    &mut effects,
                );
            }
        }
        ChannelMessage::ResetHidden => {
            let rooms: Vec<RoomKey> = state.board.rooms().map(|(key, _)| key).collect();
            for room in rooms {
                set_room_hidden(state, room, false, Origin::Broadcast, &mut effects);
            }
        }
    }
    effects
}

fn reduce_remote(state: &mut BoardState, action: RemoteAction) -> Vec<BoardEffect> {
    let mut effects = Vec::new();
    match action {
        RemoteAction::SnapshotLoaded(tree) => {
            state.board.apply_remote_snapshot(&tree);
            animation::cancel_incomplete(&mut state.board);
            state.sync.last_reconciled_ms = Some(chrono::Utc::now().timestamp_millis());
            effects.push(BoardEffect::RequestFrame);
        }
        RemoteAction::AssignmentConfirmed { key, assignment } => {
            settle_write(state);
            set_assignment(state, key, assignment, Origin::Local, &mut effects);
        }
        RemoteAction::Acknowledged(call) => {
            if call.is_write() {
                settle_write(state);
            }
            match call {
                RemoteCall::ResetTasks | RemoteCall::ResetRoom(_) | RemoteCall::ResetHidden => {
                    state
                        .activity
                        .append(LogLevel::Info, format!("{} acknowledged", call.label()));
                    effects.push(BoardEffect::Remote(RemoteCall::FetchProgress));
                }
                RemoteCall::SetRoomHidden { room, hidden } => {
                    set_room_hidden(state, room, hidden, Origin::Local, &mut effects);
                    effects.push(BoardEffect::Remote(RemoteCall::FetchProgress));
                }
                RemoteCall::FetchProgress
                | RemoteCall::UpdateProgress { .. }
                | RemoteCall::UpdateAssignment { .. } => {}
            }
        }
        RemoteAction::Failed { call, error } => {
            if call.is_write() {
                settle_write(state);
            }
            state
                .activity
                .append(LogLevel::Error, format!("{} failed: {error}", call.label()));
            effects.push(BoardEffect::RequestFrame);
        }
        RemoteAction::ChannelChanged(status) => {
            if state.sync.channel == status {
                return Vec::new();
            }
            state.sync.channel = status;
            let level = match status {
                ChannelStatus::Closed => LogLevel::Warn,
                ChannelStatus::Connecting | ChannelStatus::Open => LogLevel::Info,
            };
            state
                .activity
                .append(level, format!("channel {}", status.label()));
            effects.push(BoardEffect::RequestFrame);
        }
    }
    effects
}

fn request(state: &mut BoardState, call: RemoteCall, effects: &mut Vec<BoardEffect>) {
    if call.is_write() {
        state.sync.pending_writes += 1;
    }
    effects.push(BoardEffect::Remote(call));
}

fn settle_write(state: &mut BoardState) {
    state.sync.pending_writes = state.sync.pending_writes.saturating_sub(1);
}

/// Progress is optimistic: the local value changes before the store write.
fn set_progress(
    state: &mut BoardState,
    key: TaskKey,
    progress: Progress,
    origin: Origin,
    effects: &mut Vec<BoardEffect>,
) {
    let Some(previous) = state.board.task(&key).map(|task| task.progress) else {
        return;
    };
    let delta = Delta::Progress {
        key: key.clone(),
        progress,
    };
    if state.board.apply_delta(&delta) == DeltaOutcome::Changed {
        animation::on_task_progress(state, &key, previous, effects);
        effects.push(BoardEffect::RequestFrame);
    }
    if origin.is_local() {
        let message = ChannelMessage::progress(&key, progress);
        request(state, RemoteCall::UpdateProgress { key, progress }, effects);
        effects.push(BoardEffect::Broadcast(message));
    }
}

/// Assignment is confirmed-first: a local change only lands here after the
/// store acknowledged it.
fn set_assignment(
    state: &mut BoardState,
    key: TaskKey,
    assignment: Assignment,
    origin: Origin,
    effects: &mut Vec<BoardEffect>,
) {
    let delta = Delta::Assignment {
        key: key.clone(),
        assignment,
    };
    match state.board.apply_delta(&delta) {
        DeltaOutcome::Missing => return,
        DeltaOutcome::Changed => effects.push(BoardEffect::RequestFrame),
        DeltaOutcome::Unchanged => {}
    }
    if origin.is_local() {
        effects.push(BoardEffect::Broadcast(ChannelMessage::assignment(&key, assignment)));
    }
}

fn set_room_hidden(
    state: &mut BoardState,
    room: RoomKey,
    hidden: bool,
    origin: Origin,
    effects: &mut Vec<BoardEffect>,
) {
    let delta = Delta::RoomHidden {
        room: room.clone(),
        hidden,
    };
    match state.board.apply_delta(&delta) {
        DeltaOutcome::Missing => return,
        DeltaOutcome::Changed => effects.push(BoardEffect::RequestFrame),
        DeltaOutcome::Unchanged => {}
    }
    if origin.is_local() {
        effects.push(BoardEffect::Broadcast(ChannelMessage::room_hidden(&room, hidden)));
    }
}

fn set_view(state: &mut BoardState, view: View, origin: Origin, effects: &mut Vec<BoardEffect>) {
    state.navigation.view = view.clone();
    state.navigation.focused_room = None;
    effects.push(BoardEffect::RequestFrame);
    if origin.is_local() {
        effects.push(BoardEffect::Broadcast(ChannelMessage::SetView { view }));
    }
}

fn navigate(state: &mut BoardState, room: RoomKey, origin: Origin, effects: &mut Vec<BoardEffect>) {
    if state.board.room(&room).is_none() {
        return;
    }
    state.navigation.view = View::Floor(room.floor.clone());
    effects.push(BoardEffect::RequestFrame);
    if origin.is_local() {
        effects.push(BoardEffect::Broadcast(ChannelMessage::navigate(&room)));
    }
    state.navigation.focused_room = Some(room);
}

fn set_show_completed(
    state: &mut BoardState,
    value: bool,
    origin: Origin,
    effects: &mut Vec<BoardEffect>,
) {
    state.preferences.show_completed = value;
    animation::apply_show_completed(&mut state.board, value);
    effects.push(BoardEffect::SavePreferences);
    effects.push(BoardEffect::RequestFrame);
    if origin.is_local() {
        effects.push(BoardEffect::Broadcast(ChannelMessage::ToggleShowCompleted {
            value: Some(value),
        }));
    }
}

fn set_show_hidden(
    state: &mut BoardState,
    value: bool,
    origin: Origin,
    effects: &mut Vec<BoardEffect>,
) {
    state.preferences.show_hidden = value;
    effects.push(BoardEffect::SavePreferences);
    effects.push(BoardEffect::RequestFrame);
    if origin.is_local() {
        effects.push(BoardEffect::Broadcast(ChannelMessage::ToggleShowHidden {
            value: Some(value),
        }));
    }
}

#[cfg(test)]
mod tests;
