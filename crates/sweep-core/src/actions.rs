use super::animation::TimerAction;
use super::protocol::ChannelMessage;
use super::protocol::ProgressTree;
use super::state::Assignment;
use super::state::ChannelStatus;
use super::state::FilterChip;
use super::state::Progress;
use super::state::RoomKey;
use super::state::TaskKey;
use super::state::View;

#[derive(Debug, Clone)]
pub enum BoardAction {
    User(UserAction),
    Inbound(ChannelMessage),
    Remote(RemoteAction),
    Timer(TimerAction),
}

/// Where a state change came from. Only local changes are relayed to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Broadcast,
}

impl Origin {
    pub fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }
}

#[derive(Debug, Clone)]
pub enum UserAction {
    AdvanceProgress(TaskKey),
    CycleAssignment(TaskKey),
    ToggleFilter(FilterChip),
    SetView(View),
    CycleView,
    NavigateToRoom(RoomKey),
    ToggleShowCompleted,
    ToggleShowHidden,
    ToggleRoomHidden(RoomKey),
    ResetRoom(RoomKey),
    ResetTasks,
    ResetHidden,
    SetLabel { chip: FilterChip, label: String },
    ResetLabel(FilterChip),
    SetTitle(String),
    ResetTitle,
    Refresh,
}

/// Request to the authoritative store, executed outside the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FetchProgress,
    UpdateProgress { key: TaskKey, progress: Progress },
    UpdateAssignment { key: TaskKey, assignment: Assignment },
    ResetTasks,
    ResetRoom(RoomKey),
    ResetHidden,
    SetRoomHidden { room: RoomKey, hidden: bool },
}

impl RemoteCall {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FetchProgress => "fetch progress",
            Self::UpdateProgress { .. } => "update progress",
            Self::UpdateAssignment { .. } => "update assignment",
            Self::ResetTasks => "reset tasks",
            Self::ResetRoom(_) => "reset room",
            Self::ResetHidden => "reset hidden",
            Self::SetRoomHidden { .. } => "toggle room hidden",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::FetchProgress)
    }
}

/// Results of [`RemoteCall`]s and channel lifecycle changes, fed back in.
#[derive(Debug, Clone)]
pub enum RemoteAction {
    SnapshotLoaded(ProgressTree),
    AssignmentConfirmed { key: TaskKey, assignment: Assignment },
    Acknowledged(RemoteCall),
    Failed { call: RemoteCall, error: String },
    ChannelChanged(ChannelStatus),
}
