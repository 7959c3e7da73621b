//! Board layout: `<dir>/<floor>/<room>.yaml`, each listing the room's tasks.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::error::LayoutError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomLayout {
    #[serde(default)]
    pub tasks: Vec<TaskLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskLayout {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardLayout {
    pub floors: BTreeMap<String, BTreeMap<String, RoomLayout>>,
}

impl BoardLayout {
    pub fn task_count(&self) -> usize {
        self.floors
            .values()
            .flat_map(BTreeMap::values)
            .map(|room| room.tasks.len())
            .sum()
    }
}

/// `living_room` → `Living Room`.
pub fn display_name(stem: &str) -> String {
    stem.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn load_layout(dir: &Path) -> Result<BoardLayout, LayoutError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| LayoutError::Io { path, source }
    };

    let mut layout = BoardLayout::default();
    for floor_entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let floor_path = floor_entry.map_err(io_err(dir))?.path();
        if !floor_path.is_dir() {
            continue;
        }
        let Some(floor_name) = floor_path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        let mut rooms = BTreeMap::new();
        for room_entry in std::fs::read_dir(&floor_path).map_err(io_err(&floor_path))? {
            let room_path = room_entry.map_err(io_err(&floor_path))?.path();
            let is_yaml = matches!(
                room_path.extension().and_then(|ext| ext.to_str()),
                Some("yaml" | "yml")
            );
            if !is_yaml {
                continue;
            }
            let Some(stem) = room_path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&room_path).map_err(io_err(&room_path))?;
            let room: RoomLayout = if raw.trim().is_empty() {
                RoomLayout::default()
            } else {
                serde_yaml::from_str(&raw).map_err(|source| LayoutError::Parse {
                    path: room_path.clone(),
                    source,
                })?
            };
            rooms.insert(display_name(stem), room);
        }
        layout.floors.insert(floor_name.to_string(), rooms);
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::Board;
    use crate::state::Progress;
    use crate::state::TaskKey;

    #[test]
    fn display_name_title_cases_stems() {
        assert_eq!(display_name("living_room"), "Living Room");
        assert_eq!(display_name("KITCHEN"), "Kitchen");
        assert_eq!(display_name("kids_bath_2"), "Kids Bath 2");
    }

    #[test]
    fn loads_floors_rooms_and_tasks() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let upstairs = dir.path().join("upstairs");
        std::fs::create_dir_all(&upstairs).expect("mkdir");
        std::fs::write(
            upstairs.join("master_bath.yaml"),
            "tasks:\n  - name: Tub\n  - name: Mirror\n",
        )
        .expect("write");
        std::fs::write(upstairs.join("notes.txt"), "ignored").expect("write");
        let downstairs = dir.path().join("downstairs");
        std::fs::create_dir_all(&downstairs).expect("mkdir");
        std::fs::write(downstairs.join("kitchen.yml"), "").expect("write");

        let layout = load_layout(dir.path()).expect("layout");
        assert_eq!(layout.task_count(), 2);
        assert_eq!(
            layout.floors["upstairs"]["Master Bath"]
                .tasks
                .iter()
                .map(|task| task.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Tub", "Mirror"]
        );
        assert!(layout.floors["downstairs"]["Kitchen"].tasks.is_empty());

        let board = Board::from_layout(&layout);
        let tub = board
            .task(&TaskKey::new("upstairs", "Master Bath", "Tub"))
            .expect("tub");
        assert_eq!(tub.progress, Progress::ZERO);
    }

    #[test]
    fn malformed_room_file_names_its_path() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let floor = dir.path().join("upstairs");
        std::fs::create_dir_all(&floor).expect("mkdir");
        std::fs::write(floor.join("office.yaml"), "tasks: [name: {").expect("write");

        let err = load_layout(dir.path()).expect_err("malformed");
        assert!(err.to_string().contains("office.yaml"));
    }
}
