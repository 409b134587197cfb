//! Timers
//!
//! Deadline-ordered callbacks for the dispatch loop. The loop sleeps until
//! [`TimerQueue::next_deadline`] and then collects whatever is due.

use std::time::{Duration, Instant};

use crate::wm::display::Window;

/// Urgency flash period
pub const URGENCY_PERIOD: Duration = Duration::from_millis(500);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Toggle the flash phase of an urgent client
    Urgency(Window),
    /// Pointer held at a screen edge during a move; carries the desktop delta
    EdgeSwitch(i32),
}

#[derive(Debug)]
struct Timer {
    deadline: Instant,
    period: Option<Duration>,
    kind: TimerKind,
}

/// Pending timers
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every `period`, first after one period. Replaces a timer of the same kind.
    pub fn add_periodic(&mut self, kind: TimerKind, period: Duration, now: Instant) {
        self.remove(kind);
        self.timers.push(Timer {
            deadline: now + period,
            period: Some(period),
            kind,
        });
    }

    /// Fire once after `delay`. Replaces a timer of the same kind.
    pub fn add_oneshot(&mut self, kind: TimerKind, delay: Duration, now: Instant) {
        self.remove(kind);
        self.timers.push(Timer {
            deadline: now + delay,
            period: None,
            kind,
        });
    }

    pub fn remove(&mut self, kind: TimerKind) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.kind != kind);
        before != self.timers.len()
    }

    /// Drop every edge-switch timer, whatever its direction
    pub fn remove_edge_switch(&mut self) {
        self.timers
            .retain(|t| !matches!(t.kind, TimerKind::EdgeSwitch(_)));
    }

    pub fn contains(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    /// Soonest deadline, if any timer is pending
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Collect due timers in deadline order. Periodic timers are
    /// rescheduled past `now`; one-shots are dropped.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, TimerKind)> = Vec::new();
        self.timers.retain_mut(|timer| {
            if timer.deadline > now {
                return true;
            }
            due.push((timer.deadline, timer.kind));
            match timer.period {
                Some(period) if !period.is_zero() => {
                    while timer.deadline <= now {
                        timer.deadline += period;
                    }
                    true
                }
                _ => false,
            }
        });
        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
