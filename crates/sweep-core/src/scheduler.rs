use std::collections::BTreeMap;
use std::time::Duration;

use super::animation::TimerAction;

/// Deadline-ordered timer queue. Deadlines are offsets from an arbitrary
/// epoch chosen by the driver; ties fire in scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_seq: u64,
    entries: BTreeMap<(Duration, u64), TimerAction>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Duration, timer: TimerAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((deadline, seq), timer);
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, TimerAction)> {
        let (deadline, _) = *self.entries.keys().next()?;
        if deadline > now {
            return None;
        }
        self.entries
            .pop_first()
            .map(|((deadline, _), timer)| (deadline, timer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
