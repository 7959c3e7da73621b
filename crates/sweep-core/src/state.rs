use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::animation::AnimationTrack;
use super::layout::BoardLayout;
use super::protocol::ProgressTree;
use super::protocol::RoomSnapshot;
use super::protocol::TaskSnapshot;

pub const DEFAULT_TITLE: &str = "Cleaning Dashboard";

/// Task completion percentage, always within `0..=100`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "f64", into = "u8")]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

impl From<f64> for Progress {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.round().clamp(0.0, 100.0) as u8)
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Colour category of a task. `0` is unassigned, `1..=6` are user-labelled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "f64", into = "u8")]
pub struct Assignment(u8);

const DEFAULT_ASSIGNMENT_LABELS: [&str; 7] = [
    "Unassigned",
    "Magenta",
    "Orange",
    "Red",
    "Blue",
    "Green",
    "Cyan",
];

impl Assignment {
    pub const UNASSIGNED: Self = Self(0);
    pub const COUNT: u8 = 7;

    pub fn new(index: u8) -> Option<Self> {
        (index < Self::COUNT).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % Self::COUNT)
    }

    pub fn key(self) -> String {
        self.0.to_string()
    }

    pub fn default_label(self) -> &'static str {
        DEFAULT_ASSIGNMENT_LABELS[usize::from(self.0)]
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Self)
    }
}

impl From<f64> for Assignment {
    fn from(value: f64) -> Self {
        if value.is_nan() || value.fract() != 0.0 || !(0.0..7.0).contains(&value) {
            return Self::UNASSIGNED;
        }
        Self(value as u8)
    }
}

impl From<Assignment> for u8 {
    fn from(assignment: Assignment) -> Self {
        assignment.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressOverflow {
    /// Advance by `step`, stopping at 100; a click at 100 resets to 0.
    #[default]
    Clamp,
    /// Advance by `step`; a sum past 100 wraps straight to 0.
    Wrap,
}

impl ProgressOverflow {
    pub fn label(self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Wrap => "wrap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPolicy {
    pub step: u8,
    pub overflow: ProgressOverflow,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            step: 25,
            overflow: ProgressOverflow::Clamp,
        }
    }
}

impl ProgressPolicy {
    pub fn next(self, current: Progress) -> Progress {
        if current.is_complete() {
            return Progress::ZERO;
        }
        let sum = u16::from(current.value()) + u16::from(self.step.clamp(1, 100));
        match self.overflow {
            ProgressOverflow::Clamp => Progress::new(sum.min(100) as u8),
            ProgressOverflow::Wrap if sum > 100 => Progress::ZERO,
            ProgressOverflow::Wrap => Progress::new(sum as u8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomKey {
    pub floor: String,
    pub room: String,
}

impl RoomKey {
    pub fn new(floor: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            floor: floor.into(),
            room: room.into(),
        }
    }

    pub fn task(&self, task: impl Into<String>) -> TaskKey {
        TaskKey {
            floor: self.floor.clone(),
            room: self.room.clone(),
            task: task.into(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.floor, self.room)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey {
    pub floor: String,
    pub room: String,
    pub task: String,
}

impl TaskKey {
    pub fn new(floor: impl Into<String>, room: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            floor: floor.into(),
            room: room.into(),
            task: task.into(),
        }
    }

    pub fn room_key(&self) -> RoomKey {
        RoomKey::new(self.floor.clone(), self.room.clone())
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.floor, self.room, self.task)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub progress: Progress,
    pub assignment: Assignment,
    pub animation: AnimationTrack,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    pub hidden: bool,
    pub tasks: BTreeMap<String, Task>,
    pub animation: AnimationTrack,
}

impl Room {
    pub fn progress(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .tasks
            .values()
            .map(|task| f64::from(task.progress.value()))
            .sum();
        total / self.tasks.len() as f64
    }

    /// A room with no tasks is never complete, so it can never fire a completion.
    pub fn is_complete(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.values().all(|task| task.progress.is_complete())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Floor {
    pub rooms: BTreeMap<String, Room>,
}

impl Floor {
    pub fn progress(&self) -> f64 {
        if self.rooms.is_empty() {
            return 0.0;
        }
        let total: f64 = self.rooms.values().map(Room::progress).sum();
        total / self.rooms.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Progress { key: TaskKey, progress: Progress },
    Assignment { key: TaskKey, assignment: Assignment },
    RoomHidden { room: RoomKey, hidden: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    Missing,
    Unchanged,
    Changed,
}

/// Client-local cache of the floor → room → task tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    pub floors: BTreeMap<String, Floor>,
}

impl Board {
    pub fn from_layout(layout: &BoardLayout) -> Self {
        let floors = layout
            .floors
            .iter()
            .map(|(floor_name, rooms)| {
                let rooms = rooms
                    .iter()
                    .map(|(room_name, room_layout)| {
                        let tasks = room_layout
                            .tasks
                            .iter()
                            .map(|task| (task.name.clone(), Task::default()))
                            .collect();
                        (
                            room_name.clone(),
                            Room {
                                tasks,
                                ..Room::default()
                            },
                        )
                    })
                    .collect();
                (floor_name.clone(), Floor { rooms })
            })
            .collect();
        Self { floors }
    }

    pub fn from_snapshot(tree: &ProgressTree) -> Self {
        let mut board = Self::default();
        board.apply_remote_snapshot(tree);
        board
    }

    pub fn room(&self, key: &RoomKey) -> Option<&Room> {
        self.floors.get(&key.floor)?.rooms.get(&key.room)
    }

    pub fn room_mut(&mut self, key: &RoomKey) -> Option<&mut Room> {
        self.floors.get_mut(&key.floor)?.rooms.get_mut(&key.room)
    }

    pub fn task(&self, key: &TaskKey) -> Option<&Task> {
        self.floors
            .get(&key.floor)?
            .rooms
            .get(&key.room)?
            .tasks
            .get(&key.task)
    }

    pub fn task_mut(&mut self, key: &TaskKey) -> Option<&mut Task> {
        self.floors
            .get_mut(&key.floor)?
            .rooms
            .get_mut(&key.room)?
            .tasks
            .get_mut(&key.task)
    }

    pub fn rooms(&self) -> impl Iterator<Item = (RoomKey, &Room)> + '_ {
        self.floors.iter().flat_map(|(floor_name, floor)| {
            floor
                .rooms
                .iter()
                .map(move |(room_name, room)| (RoomKey::new(floor_name.as_str(), room_name.as_str()), room))
        })
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskKey, &Task)> + '_ {
        self.rooms().flat_map(|(room_key, room)| {
            room.tasks
                .iter()
                .map(move |(task_name, task)| (room_key.task(task_name.as_str()), task))
        })
    }

    pub fn task_keys_in(&self, room: &RoomKey) -> Vec<TaskKey> {
        self.room(room)
            .map(|r| r.tasks.keys().map(|name| room.task(name.as_str())).collect())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> ProgressTree {
        self.floors
            .iter()
            .map(|(floor_name, floor)| {
                let rooms = floor
                    .rooms
                    .iter()
                    .map(|(room_name, room)| {
                        let tasks = room
                            .tasks
                            .iter()
                            .map(|(task_name, task)| {
                                (
                                    task_name.clone(),
                                    TaskSnapshot {
                                        progress: task.progress,
                                        assignment: task.assignment,
                                    },
                                )
                            })
                            .collect();
                        (
                            room_name.clone(),
                            RoomSnapshot {
                                hidden: room.hidden,
                                tasks,
                            },
                        )
                    })
                    .collect();
                (floor_name.clone(), rooms)
            })
            .collect()
    }

    /// Overwrites cached values with an authoritative fetch. Entries missing
    /// locally are inserted; local entries absent from `tree` are left alone.
    pub fn apply_remote_snapshot(&mut self, tree: &ProgressTree) {
        for (floor_name, rooms) in tree {
            let floor = self.floors.entry(floor_name.clone()).or_default();
            for (room_name, snapshot) in rooms {
                let room = floor.rooms.entry(room_name.clone()).or_default();
                room.hidden = snapshot.hidden;
                for (task_name, task_snapshot) in &snapshot.tasks {
                    let task = room.tasks.entry(task_name.clone()).or_default();
                    task.progress = task_snapshot.progress;
                    task.assignment = task_snapshot.assignment;
                }
            }
        }
    }

    pub fn apply_delta(&mut self, delta: &Delta) -> DeltaOutcome {
        match delta {
            Delta::Progress { key, progress } => match self.task_mut(key) {
                None => DeltaOutcome::Missing,
                Some(task) if task.progress == *progress => DeltaOutcome::Unchanged,
                Some(task) => {
                    task.progress = *progress;
                    DeltaOutcome::Changed
                }
            },
            Delta::Assignment { key, assignment } => match self.task_mut(key) {
                None => DeltaOutcome::Missing,
                Some(task) if task.assignment == *assignment => DeltaOutcome::Unchanged,
                Some(task) => {
                    task.assignment = *assignment;
                    DeltaOutcome::Changed
                }
            },
            Delta::RoomHidden { room, hidden } => match self.room_mut(room) {
                None => DeltaOutcome::Missing,
                Some(r) if r.hidden == *hidden => DeltaOutcome::Unchanged,
                Some(r) => {
                    r.hidden = *hidden;
                    DeltaOutcome::Changed
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterChip {
    All,
    Assignment(Assignment),
}

impl FilterChip {
    pub fn key(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Assignment(assignment) => assignment.key(),
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        if key == "all" {
            return Some(Self::All);
        }
        key.parse::<u8>()
            .ok()
            .and_then(Assignment::new)
            .map(Self::Assignment)
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Assignment(assignment) => assignment.default_label(),
        }
    }

    pub fn chips() -> impl Iterator<Item = Self> {
        std::iter::once(Self::All).chain(Assignment::all().map(Self::Assignment))
    }
}

/// Active colour filters. `Only` is never empty and never mixes with `All`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveFilters {
    #[default]
    All,
    Only(BTreeSet<Assignment>),
}

impl ActiveFilters {
    pub fn allows(&self, assignment: Assignment) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&assignment),
        }
    }

    pub fn is_active(&self, chip: &FilterChip) -> bool {
        match (self, chip) {
            (Self::All, FilterChip::All) => true,
            (Self::Only(set), FilterChip::Assignment(assignment)) => set.contains(assignment),
            _ => false,
        }
    }

    pub fn toggle(&mut self, chip: &FilterChip) {
        let assignment = match chip {
            FilterChip::All => {
                *self = Self::All;
                return;
            }
            FilterChip::Assignment(assignment) => *assignment,
        };

        let mut set = match std::mem::take(self) {
            Self::All => BTreeSet::new(),
            Self::Only(set) => set,
        };
        if !set.remove(&assignment) {
            set.insert(assignment);
        }
        *self = Self::from_set(set);
    }

    pub fn to_keys(&self) -> Vec<String> {
        match self {
            Self::All => vec!["all".to_string()],
            Self::Only(set) => set.iter().map(|assignment| assignment.key()).collect(),
        }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for key in keys {
            match FilterChip::parse(key.as_ref()) {
                Some(FilterChip::All) => return Self::All,
                Some(FilterChip::Assignment(assignment)) => {
                    set.insert(assignment);
                }
                None => {}
            }
        }
        Self::from_set(set)
    }

    fn from_set(set: BTreeSet<Assignment>) -> Self {
        if set.is_empty() {
            Self::All
        } else {
            Self::Only(set)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preferences {
    pub custom_labels: BTreeMap<String, String>,
    pub dashboard_title: Option<String>,
    pub active_filters: ActiveFilters,
    pub show_completed: bool,
    pub show_hidden: bool,
}

impl Preferences {
    pub fn chip_label(&self, chip: &FilterChip) -> &str {
        self.custom_labels
            .get(&chip.key())
            .map(String::as_str)
            .unwrap_or_else(|| chip.default_label())
    }

    pub fn assignment_label(&self, assignment: Assignment) -> &str {
        self.chip_label(&FilterChip::Assignment(assignment))
    }

    pub fn title(&self) -> &str {
        self.dashboard_title.as_deref().unwrap_or(DEFAULT_TITLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum View {
    #[default]
    All,
    Floor(String),
}

impl View {
    pub fn label(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Floor(name) => name,
        }
    }
}

impl From<String> for View {
    fn from(value: String) -> Self {
        if value == "all" {
            Self::All
        } else {
            Self::Floor(value)
        }
    }
}

impl From<View> for String {
    fn from(view: View) -> Self {
        match view {
            View::All => "all".to_string(),
            View::Floor(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    pub view: View,
    pub focused_room: Option<RoomKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ChannelStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "live",
            Self::Closed => "offline",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    pub channel: ChannelStatus,
    pub pending_writes: usize,
    pub last_reconciled_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub seq: u64,
    pub level: LogLevel,
    pub ts_ms: i64,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn append(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = ActivityEntry {
            seq: self.next_seq,
            level,
            ts_ms: chrono::Utc::now().timestamp_millis(),
            message: message.into(),
        };
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(entry);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ActivityEntry> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BoardState {
    pub board: Board,
    pub preferences: Preferences,
    pub navigation: Navigation,
    pub policy: ProgressPolicy,
    pub sync: SyncStatus,
    pub activity: ActivityLog,
}

impl BoardState {
    pub fn new(board: Board, preferences: Preferences, policy: ProgressPolicy) -> Self {
        Self {
            board,
            preferences,
            navigation: Navigation::default(),
            policy,
            sync: SyncStatus::default(),
            activity: ActivityLog::new(200),
        }
    }

    pub fn floor_names(&self) -> impl Iterator<Item = &str> {
        self.board.floors.keys().map(String::as_str)
    }

    pub fn next_view(&self) -> View {
        let floors: Vec<&str> = self.floor_names().collect();
        match &self.navigation.view {
            View::All => floors
                .first()
                .map(|name| View::Floor((*name).to_string()))
                .unwrap_or(View::All),
            View::Floor(current) => floors
                .iter()
                .position(|name| *name == current.as_str())
                .and_then(|idx| floors.get(idx + 1))
                .map(|name| View::Floor((*name).to_string()))
                .unwrap_or(View::All),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clamp_policy_stops_at_complete_then_resets() {
        let policy = ProgressPolicy {
            step: 25,
            overflow: ProgressOverflow::Clamp,
        };
        let mut seen = Vec::new();
        let mut progress = Progress::ZERO;
        for _ in 0..6 {
            progress = policy.next(progress);
            seen.push(progress.value());
        }
        assert_eq!(seen, vec![25, 50, 75, 100, 0, 25]);
        assert_eq!(policy.next(Progress::new(90)), Progress::COMPLETE);
    }

    #[test]
    fn wrap_policy_skips_complete_when_step_overshoots() {
        let policy = ProgressPolicy {
            step: 25,
            overflow: ProgressOverflow::Wrap,
        };
        assert_eq!(policy.next(Progress::new(90)), Progress::ZERO);
        assert_eq!(policy.next(Progress::new(75)), Progress::COMPLETE);

        let twenty = ProgressPolicy {
            step: 20,
            overflow: ProgressOverflow::Wrap,
        };
        assert_eq!(twenty.next(Progress::new(80)), Progress::COMPLETE);
    }

    #[test]
    fn wire_values_are_clamped_into_range() {
        assert_eq!(Progress::from(140.0), Progress::COMPLETE);
        assert_eq!(Progress::from(-3.0), Progress::ZERO);
        assert_eq!(Progress::from(37.6).value(), 38);
        assert_eq!(Assignment::from(9.0), Assignment::UNASSIGNED);
        assert_eq!(Assignment::from(3.0).index(), 3);
    }

    #[test]
    fn assignment_cycles_through_seven_slots() {
        let mut assignment = Assignment::UNASSIGNED;
        for _ in 0..7 {
            assignment = assignment.next();
        }
        assert_eq!(assignment, Assignment::UNASSIGNED);
        assert_eq!(Assignment::new(6).map(Assignment::next), Some(Assignment::UNASSIGNED));
    }

    #[test]
    fn room_aggregates_follow_task_progress() {
        let mut room = Room::default();
        assert_eq!(room.progress(), 0.0);
        assert!(!room.is_complete());

        room.tasks.insert(
            "Sink".to_string(),
            Task {
                progress: Progress::COMPLETE,
                ..Task::default()
            },
        );
        room.tasks.insert(
            "Counters".to_string(),
            Task {
                progress: Progress::new(50),
                ..Task::default()
            },
        );
        assert_eq!(room.progress(), 75.0);
        assert!(!room.is_complete());

        room.tasks.get_mut("Counters").expect("task").progress = Progress::COMPLETE;
        assert!(room.is_complete());
    }

    #[test]
    fn delta_reports_missing_unchanged_and_changed() {
        let mut board = Board::default();
        board
            .floors
            .entry("Floor1".to_string())
            .or_default()
            .rooms
            .entry("Kitchen".to_string())
            .or_default()
            .tasks
            .insert("Sink".to_string(), Task::default());

        let key = TaskKey::new("Floor1", "Kitchen", "Sink");
        let set_half = Delta::Progress {
            key: key.clone(),
            progress: Progress::new(50),
        };
        assert_eq!(board.apply_delta(&set_half), DeltaOutcome::Changed);
        assert_eq!(board.apply_delta(&set_half), DeltaOutcome::Unchanged);
        assert_eq!(
            board.apply_delta(&Delta::Progress {
                key: TaskKey::new("Floor1", "Kitchen", "Oven"),
                progress: Progress::COMPLETE,
            }),
            DeltaOutcome::Missing
        );
        assert_eq!(board.task(&key).map(|t| t.progress), Some(Progress::new(50)));
    }

    #[test]
    fn filters_never_become_empty() {
        let red = FilterChip::Assignment(Assignment::new(3).expect("red"));
        let blue = FilterChip::Assignment(Assignment::new(4).expect("blue"));
        let mut filters = ActiveFilters::All;

        filters.toggle(&red);
        assert!(filters.is_active(&red));
        assert!(!filters.is_active(&FilterChip::All));

        filters.toggle(&blue);
        filters.toggle(&red);
        filters.toggle(&blue);
        assert_eq!(filters, ActiveFilters::All);

        filters.toggle(&FilterChip::All);
        assert_eq!(filters, ActiveFilters::All);
    }

    #[test]
    fn filters_from_keys_prefers_all_and_skips_garbage() {
        assert_eq!(ActiveFilters::from_keys(["2", "all"]), ActiveFilters::All);
        assert_eq!(ActiveFilters::from_keys(Vec::<String>::new()), ActiveFilters::All);
        assert_eq!(ActiveFilters::from_keys(["x", "9"]), ActiveFilters::All);
        assert_eq!(
            ActiveFilters::from_keys(["5", "1"]).to_keys(),
            vec!["1".to_string(), "5".to_string()]
        );
    }

    #[test]
    fn next_view_walks_floors_then_back_to_all() {
        let mut board = Board::default();
        board.floors.insert("downstairs".to_string(), Floor::default());
        board.floors.insert("upstairs".to_string(), Floor::default());
        let mut state = BoardState::new(board, Preferences::default(), ProgressPolicy::default());

        let mut views = Vec::new();
        for _ in 0..3 {
            let next = state.next_view();
            views.push(next.label().to_string());
            state.navigation.view = next;
        }
        assert_eq!(views, vec!["downstairs", "upstairs", "all"]);
    }
}
