//! Wire formats shared by the HTTP store and the realtime channel.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use super::state::Assignment;
use super::state::Progress;
use super::state::RoomKey;
use super::state::TaskKey;
use super::state::View;

pub const GET_PROGRESS_PATH: &str = "/api/get_progress";
pub const UPDATE_PROGRESS_PATH: &str = "/api/update_progress";
pub const UPDATE_ASSIGNMENT_PATH: &str = "/api/update_assignment";
pub const RESET_TASKS_PATH: &str = "/api/reset_tasks";
pub const RESET_ROOM_PATH: &str = "/api/reset_room";
pub const RESET_HIDDEN_PATH: &str = "/api/reset_hidden";
pub const TOGGLE_ROOM_HIDDEN_PATH: &str = "/api/toggle_room_hidden";

/// Authoritative progress tree keyed floor → room.
pub type ProgressTree = BTreeMap<String, BTreeMap<String, RoomSnapshot>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    #[serde(
        default,
        serialize_with = "hidden_as_flag",
        deserialize_with = "hidden_from_flag"
    )]
    pub hidden: bool,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub assignment: Assignment,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

fn hidden_from_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}

fn hidden_as_flag<S>(hidden: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*hidden))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub floor: String,
    pub room: String,
    pub task: String,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentUpdate {
    pub floor: String,
    pub room: String,
    pub task: String,
    pub assignment: Assignment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    pub floor: String,
    pub room: String,
}

impl From<&RoomKey> for RoomRef {
    fn from(key: &RoomKey) -> Self {
        Self {
            floor: key.floor.clone(),
            room: key.room.clone(),
        }
    }
}

/// Generic `{ "success": bool, ... }` acknowledgement returned by writes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Ack {
    pub fn assignment(&self) -> Option<Assignment> {
        let value = self.data.as_ref()?.get("assignment")?.as_f64()?;
        Some(Assignment::from(value))
    }
}

/// Peer-to-peer relay message. The relay never interprets these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ChannelMessage {
    UpdateProgress {
        floor: String,
        room: String,
        task: String,
        progress: Progress,
    },
    UpdateAssignment {
        floor: String,
        room: String,
        task: String,
        assignment: Assignment,
    },
    NavigateToRoom {
        floor: String,
        room: String,
    },
    SetView {
        view: View,
    },
    /// `value` absent means flip the receiver's current setting.
    ToggleShowCompleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<bool>,
    },
    ToggleShowHidden {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<bool>,
    },
    SetRoomHidden {
        floor: String,
        room: String,
        hidden: bool,
    },
    ResetRoom {
        floor: String,
        room: String,
    },
    ResetTasks,
    ResetHidden,
}

impl ChannelMessage {
    /// Unknown actions and malformed payloads yield `None`.
    pub fn decode(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn progress(key: &TaskKey, progress: Progress) -> Self {
        Self::UpdateProgress {
            floor: key.floor.clone(),
            room: key.room.clone(),
            task: key.task.clone(),
            progress,
        }
    }

    pub fn assignment(key: &TaskKey, assignment: Assignment) -> Self {
        Self::UpdateAssignment {
            floor: key.floor.clone(),
            room: key.room.clone(),
            task: key.task.clone(),
            assignment,
        }
    }

    pub fn navigate(room: &RoomKey) -> Self {
        Self::NavigateToRoom {
            floor: room.floor.clone(),
            room: room.room.clone(),
        }
    }

    pub fn room_hidden(room: &RoomKey, hidden: bool) -> Self {
        Self::SetRoomHidden {
            floor: room.floor.clone(),
            room: room.room.clone(),
            hidden,
        }
    }

    pub fn reset_room(room: &RoomKey) -> Self {
        Self::ResetRoom {
            floor: room.floor.clone(),
            room: room.room.clone(),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::UpdateProgress { .. } => "updateProgress",
            Self::UpdateAssignment { .. } => "updateAssignment",
            Self::NavigateToRoom { .. } => "navigateToRoom",
            Self::SetView { .. } => "setView",
            Self::ToggleShowCompleted { .. } => "toggleShowCompleted",
            Self::ToggleShowHidden { .. } => "toggleShowHidden",
            Self::SetRoomHidden { .. } => "setRoomHidden",
            Self::ResetRoom { .. } => "resetRoom",
            Self::ResetTasks => "resetTasks",
            Self::ResetHidden => "resetHidden",
        }
    }
}
