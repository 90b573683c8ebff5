//! Named one-shot timers.
//!
//! The controller only ever waits on a handful of named delays, so the table
//! is a short list keyed by `TimerId` rather than a general timer heap.
//! Scheduling an id that is already pending replaces its deadline; this is
//! what coalesces bouncing trough switches into a single count.

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Settle window on the trough position switches.
    CheckSwitches,
    /// Next attempt to feed the shooter lane.
    Launch,
    /// Eject watchdog.
    EjectErrorWatch,
    /// Periodic status log.
    Status,
    /// Outhole auto-kick after the ball settles.
    OutholeKick,
    /// Shooter lane held active long enough to count the ball as fed.
    LaneSettle,
    /// Jam switch held active; index into the resolved jam switch list.
    JamSettle(usize),
}

impl TimerId {
    pub fn name(self) -> &'static str {
        match self {
            TimerId::CheckSwitches => "check_switches",
            TimerId::Launch => "launch",
            TimerId::EjectErrorWatch => "ejectErrorWatch",
            TimerId::Status => "status",
            TimerId::OutholeKick => "auto",
            TimerId::LaneSettle => "shooter_settle",
            TimerId::JamSettle(_) => "jam",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: TimerId,
    deadline: Instant,
    // tie-breaker so equal deadlines fire in scheduling order
    seq: u64,
}

#[derive(Debug, Default)]
pub struct TimerTable {
    entries: Vec<Entry>,
    seq: u64,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `id` for `deadline`, replacing any pending deadline for the same id.
    pub fn schedule(&mut self, id: TimerId, deadline: Instant) {
        self.seq = self.seq.wrapping_add(1);
        let seq = self.seq;
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(e) => {
                e.deadline = deadline;
                e.seq = seq;
            }
            None => self.entries.push(Entry { id, deadline, seq }),
        }
    }

    /// Cancel `id`. Returns whether it was pending; cancelling twice is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.deadline)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerId> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(idx).id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reschedule_replaces_deadline() {
        let t0 = Instant::now();
        let mut t = TimerTable::new();
        t.schedule(TimerId::CheckSwitches, t0 + Duration::from_millis(500));
        t.schedule(TimerId::CheckSwitches, t0 + Duration::from_millis(800));
        assert_eq!(t.len(), 1);
        assert_eq!(t.pop_due(t0 + Duration::from_millis(600)), None);
        assert_eq!(
            t.pop_due(t0 + Duration::from_millis(800)),
            Some(TimerId::CheckSwitches)
        );
        assert!(t.is_empty());
    }

    #[test]
    fn fires_in_deadline_order() {
        let t0 = Instant::now();
        let mut t = TimerTable::new();
        t.schedule(TimerId::EjectErrorWatch, t0 + Duration::from_secs(4));
        t.schedule(TimerId::Launch, t0 + Duration::from_secs(2));
        t.schedule(TimerId::JamSettle(0), t0 + Duration::from_secs(2));
        let later = t0 + Duration::from_secs(10);
        assert_eq!(t.pop_due(later), Some(TimerId::Launch));
        assert_eq!(t.pop_due(later), Some(TimerId::JamSettle(0)));
        assert_eq!(t.pop_due(later), Some(TimerId::EjectErrorWatch));
        assert_eq!(t.pop_due(later), None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut t = TimerTable::new();
        t.schedule(TimerId::Launch, Instant::now());
        assert!(t.cancel(TimerId::Launch));
        assert!(!t.cancel(TimerId::Launch));
        assert_eq!(t.next_deadline(), None);
    }
}
