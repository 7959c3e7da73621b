use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sweep_core::protocol;
use sweep_core::protocol::Ack;
use sweep_core::protocol::AssignmentUpdate;
use sweep_core::protocol::ProgressTree;
use sweep_core::protocol::ProgressUpdate;
use sweep_core::protocol::RoomRef;
use sweep_core::Assignment;
use sweep_core::Progress;
use sweep_core::RoomKey;
use sweep_core::TaskKey;
use tracing::debug;
use url::Url;

use crate::error::SyncError;
use crate::error::SyncResult;
use crate::remote::RemoteStore;

/// [`RemoteStore`] backed by the dashboard's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn post<B>(&self, path: &'static str, body: &B) -> SyncResult<Ack>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        self.submit(path, self.client.post(url).json(body)).await
    }

    /// For endpoints that take no request body.
    async fn post_empty(&self, path: &'static str) -> SyncResult<Ack> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        self.submit(path, self.client.post(url)).await
    }

    async fn submit(&self, path: &'static str, request: reqwest::RequestBuilder) -> SyncResult<Ack> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                endpoint: path,
                status: status.as_u16(),
            });
        }
        let ack: Ack = response.json().await?;
        if !ack.success {
            let reason = ack.error.unwrap_or_else(|| "success=false".to_string());
            return Err(SyncError::rejected(path, reason));
        }
        Ok(ack)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_progress(&self) -> SyncResult<ProgressTree> {
        let url = self.endpoint(protocol::GET_PROGRESS_PATH)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                endpoint: protocol::GET_PROGRESS_PATH,
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn update_progress(&self, key: &TaskKey, progress: Progress) -> SyncResult<()> {
        let body = ProgressUpdate {
            floor: key.floor.clone(),
            room: key.room.clone(),
            task: key.task.clone(),
            progress,
        };
        self.post(protocol::UPDATE_PROGRESS_PATH, &body).await?;
        Ok(())
    }

    async fn update_assignment(
        &self,
        key: &TaskKey,
        assignment: Assignment,
    ) -> SyncResult<Assignment> {
        let body = AssignmentUpdate {
            floor: key.floor.clone(),
            room: key.room.clone(),
            task: key.task.clone(),
            assignment,
        };
        let ack = self.post(protocol::UPDATE_ASSIGNMENT_PATH, &body).await?;
        Ok(ack.assignment().unwrap_or(assignment))
    }

    async fn reset_tasks(&self) -> SyncResult<()> {
        self.post_empty(protocol::RESET_TASKS_PATH).await?;
        Ok(())
    }

    async fn reset_room(&self, room: &RoomKey) -> SyncResult<()> {
        self.post(protocol::RESET_ROOM_PATH, &RoomRef::from(room))
            .await?;
        Ok(())
    }

    async fn reset_hidden(&self) -> SyncResult<()> {
        self.post_empty(protocol::RESET_HIDDEN_PATH).await?;
        Ok(())
    }

    async fn toggle_room_hidden(&self, room: &RoomKey) -> SyncResult<()> {
        self.post(protocol::TOGGLE_ROOM_HIDDEN_PATH, &RoomRef::from(room))
            .await?;
        Ok(())
    }
}
