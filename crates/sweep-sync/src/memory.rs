use async_trait::async_trait;
use sweep_core::layout::BoardLayout;
use sweep_core::protocol::ProgressTree;
use sweep_core::protocol::RoomSnapshot;
use sweep_core::protocol::TaskSnapshot;
use sweep_core::Assignment;
use sweep_core::Board;
use sweep_core::Progress;
use sweep_core::RoomKey;
use sweep_core::TaskKey;
use tokio::sync::Mutex;

use crate::error::SyncError;
use crate::error::SyncResult;
use crate::remote::RemoteStore;

/// In-process store with the same write semantics as the HTTP backend.
/// Used for `--offline` sessions and in tests.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    tree: Mutex<ProgressTree>,
}

impl MemoryRemoteStore {
    pub fn new(tree: ProgressTree) -> Self {
        Self {
            tree: Mutex::new(tree),
        }
    }

    pub fn from_layout(layout: &BoardLayout) -> Self {
        Self::new(Board::from_layout(layout).snapshot())
    }

    pub async fn snapshot(&self) -> ProgressTree {
        self.tree.lock().await.clone()
    }
}

fn room_entry<'a>(tree: &'a mut ProgressTree, key: &RoomKey) -> SyncResult<&'a mut RoomSnapshot> {
    tree.get_mut(&key.floor)
        .and_then(|rooms| rooms.get_mut(&key.room))
        .ok_or_else(|| SyncError::rejected("memory", format!("unknown room {key}")))
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_progress(&self) -> SyncResult<ProgressTree> {
        Ok(self.snapshot().await)
    }

    async fn update_progress(&self, key: &TaskKey, progress: Progress) -> SyncResult<()> {
        let mut tree = self.tree.lock().await;
        let room = tree
            .entry(key.floor.clone())
            .or_default()
            .entry(key.room.clone())
            .or_default();
        room.tasks.entry(key.task.clone()).or_default().progress = progress;
        Ok(())
    }

    async fn update_assignment(
        &self,
        key: &TaskKey,
        assignment: Assignment,
    ) -> SyncResult<Assignment> {
        let mut tree = self.tree.lock().await;
        let room = room_entry(&mut tree, &key.room_key())?;
        let task = room
            .tasks
            .get_mut(&key.task)
            .ok_or_else(|| SyncError::rejected("memory", format!("unknown task {key}")))?;
        task.assignment = assignment;
        Ok(assignment)
    }

    async fn reset_tasks(&self) -> SyncResult<()> {
        let mut tree = self.tree.lock().await;
        for room in tree.values_mut().flat_map(|rooms| rooms.values_mut()) {
            for task in room.tasks.values_mut() {
                *task = TaskSnapshot::default();
            }
        }
        Ok(())
    }

    async fn reset_room(&self, room: &RoomKey) -> SyncResult<()> {
        let mut tree = self.tree.lock().await;
        for task in room_entry(&mut tree, room)?.tasks.values_mut() {
            task.progress = Progress::ZERO;
        }
        Ok(())
    }

    async fn reset_hidden(&self) -> SyncResult<()> {
        let mut tree = self.tree.lock().await;
        for room in tree.values_mut().flat_map(|rooms| rooms.values_mut()) {
            room.hidden = false;
        }
        Ok(())
    }

    async fn toggle_room_hidden(&self, room: &RoomKey) -> SyncResult<()> {
        let mut tree = self.tree.lock().await;
        let entry = room_entry(&mut tree, room)?;
        entry.hidden = !entry.hidden;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn seeded() -> MemoryRemoteStore {
        let tree: ProgressTree = serde_json::from_value(json!({
            "downstairs": {
                "Kitchen": {
                    "hidden": 0,
                    "tasks": {
                        "Sink": { "progress": 80, "assignment": 2 },
                        "Counters": { "progress": 100, "assignment": 1 }
                    }
                },
                "Pantry": { "hidden": 1, "tasks": { "Shelves": { "progress": 25 } } }
            }
        }))
        .expect("tree");
        MemoryRemoteStore::new(tree)
    }

    #[tokio::test]
    async fn reset_room_zeroes_progress_but_keeps_assignments() {
        let store = seeded();
        store
            .reset_room(&RoomKey::new("downstairs", "Kitchen"))
            .await
            .expect("reset");

        let tree = store.fetch_progress().await.expect("tree");
        let kitchen = &tree["downstairs"]["Kitchen"];
        assert_eq!(kitchen.tasks["Sink"].progress, Progress::ZERO);
        assert_eq!(kitchen.tasks["Sink"].assignment.index(), 2);
        assert_eq!(tree["downstairs"]["Pantry"].tasks["Shelves"].progress, Progress::new(25));
    }

    #[tokio::test]
    async fn reset_tasks_clears_progress_and_assignment_everywhere() {
        let store = seeded();
        store.reset_tasks().await.expect("reset");

        let tree = store.fetch_progress().await.expect("tree");
        for room in tree["downstairs"].values() {
            for task in room.tasks.values() {
                assert_eq!(*task, TaskSnapshot::default());
            }
        }
        assert!(tree["downstairs"]["Pantry"].hidden);
    }

    #[tokio::test]
    async fn hidden_flags_toggle_and_reset() {
        let store = seeded();
        let kitchen = RoomKey::new("downstairs", "Kitchen");
        store.toggle_room_hidden(&kitchen).await.expect("toggle");
        assert!(store.snapshot().await["downstairs"]["Kitchen"].hidden);

        store.reset_hidden().await.expect("reset");
        let tree = store.snapshot().await;
        assert!(tree["downstairs"].values().all(|room| !room.hidden));
    }

    #[tokio::test]
    async fn progress_update_inserts_unknown_task() {
        let store = MemoryRemoteStore::default();
        let key = TaskKey::new("attic", "Storage", "Boxes");
        store
            .update_progress(&key, Progress::new(50))
            .await
            .expect("update");
        assert_eq!(
            store.snapshot().await["attic"]["Storage"].tasks["Boxes"].progress,
            Progress::new(50)
        );
    }

    #[tokio::test]
    async fn unknown_room_is_rejected() {
        let store = seeded();
        let err = store
            .toggle_room_hidden(&RoomKey::new("roof", "Gutter"))
            .await
            .expect_err("unknown");
        assert!(matches!(err, SyncError::Rejected { .. }));
    }
}
