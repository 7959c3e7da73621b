use async_trait::async_trait;
use sweep_core::protocol::ProgressTree;
use sweep_core::Assignment;
use sweep_core::Progress;
use sweep_core::RemoteAction;
use sweep_core::RemoteCall;
use sweep_core::RoomKey;
use sweep_core::TaskKey;
use tracing::debug;
use tracing::warn;

use crate::error::SyncResult;

/// Authoritative store behind the dashboard. Every call is a single
/// request/response; failures surface as [`crate::SyncError`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_progress(&self) -> SyncResult<ProgressTree>;

    async fn update_progress(&self, key: &TaskKey, progress: Progress) -> SyncResult<()>;

    /// Returns the value the store recorded.
    async fn update_assignment(&self, key: &TaskKey, assignment: Assignment)
        -> SyncResult<Assignment>;

    async fn reset_tasks(&self) -> SyncResult<()>;

    async fn reset_room(&self, room: &RoomKey) -> SyncResult<()>;

    async fn reset_hidden(&self) -> SyncResult<()>;

    async fn toggle_room_hidden(&self, room: &RoomKey) -> SyncResult<()>;
}

/// Runs `call` against `store` and turns the outcome into the action the
/// reducer expects back.
pub async fn execute(store: &dyn RemoteStore, call: RemoteCall) -> RemoteAction {
    debug!(call = call.label(), "remote call issued");
    let outcome = match &call {
        RemoteCall::FetchProgress => store
            .fetch_progress()
            .await
            .map(RemoteAction::SnapshotLoaded),
        RemoteCall::UpdateProgress { key, progress } => store
            .update_progress(key, *progress)
            .await
            .map(|()| RemoteAction::Acknowledged(call.clone())),
        RemoteCall::UpdateAssignment { key, assignment } => store
            .update_assignment(key, *assignment)
            .await
            .map(|assignment| RemoteAction::AssignmentConfirmed {
                key: key.clone(),
                assignment,
            }),
        RemoteCall::ResetTasks => store
            .reset_tasks()
            .await
            .map(|()| RemoteAction::Acknowledged(call.clone())),
        RemoteCall::ResetRoom(room) => store
            .reset_room(room)
            .await
            .map(|()| RemoteAction::Acknowledged(call.clone())),
        RemoteCall::ResetHidden => store
            .reset_hidden()
            .await
            .map(|()| RemoteAction::Acknowledged(call.clone())),
        RemoteCall::SetRoomHidden { room, .. } => store
            .toggle_room_hidden(room)
            .await
            .map(|()| RemoteAction::Acknowledged(call.clone())),
    };
    outcome.unwrap_or_else(|err| {
        warn!(call = call.label(), error = %err, "remote call failed");
        RemoteAction::Failed {
            call,
            error: err.to_string(),
        }
    })
}
