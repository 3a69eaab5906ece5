//! Discrete-event scheduler.
//!
//! Events are ordered by `(time, sequence)` in a min-heap, so events due at
//! the same instant come out in the order they were scheduled. Popping an
//! event moves the clock to its due time; the clock never goes backwards.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GossipError;

/// A point on the simulated clock, in milliseconds since start.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn from_secs(secs: u64) -> Self {
        SimTime(secs.saturating_mul(1000))
    }

    pub fn from_millis(millis: u64) -> Self {
        SimTime(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// This instant shifted `millis` into the future, saturating at the end
    /// of the clock.
    pub fn after_millis(&self, millis: u64) -> Self {
        SimTime(self.0.saturating_add(millis))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}s", self.0 / 1000, self.0 % 1000)
    }
}

/// An event waiting in the queue.
struct Scheduled<E> {
    at: SimTime,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, the earliest event must be on top.
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

/// Min-heap of timed events plus the simulated clock.
pub struct Scheduler<E> {
    queue: BinaryHeap<Scheduled<E>>,
    now: SimTime,
    next_seq: u64,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            now: SimTime::ZERO,
            next_seq: 0,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Enqueue `event` at the absolute time `at`.
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> Result<(), GossipError> {
        if at < self.now {
            return Err(GossipError::ScheduleInPast { at, now: self.now });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { at, seq, event });
        Ok(())
    }

    /// Enqueue `event` `delay_millis` after the current time.
    pub fn schedule_after(&mut self, delay_millis: u64, event: E) {
        let at = self.now.after_millis(delay_millis);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { at, seq, event });
    }

    /// Due time of the next event, if any.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|s| s.at)
    }

    /// Pop the next event if it is due no later than `deadline`, advancing
    /// the clock to its due time.
    pub fn pop_until(&mut self, deadline: SimTime) -> Option<(SimTime, E)> {
        if self.peek_time()? > deadline {
            return None;
        }
        let next = self.queue.pop()?;
        self.now = next.at;
        Some((next.at, next.event))
    }

    /// Move the clock forward to `to` without firing anything.
    pub fn advance_to(&mut self, to: SimTime) {
        if to > self.now {
            self.now = to;
        }
    }

    /// Drop every pending event. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_display() {
        assert_eq!(SimTime::from_millis(5_042).to_string(), "5.042s");
        assert_eq!(SimTime::from_secs(3), SimTime(3_000));
    }

    #[test]
    fn test_events_come_out_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(SimTime(30), "c").unwrap();
        scheduler.schedule_at(SimTime(10), "a").unwrap();
        scheduler.schedule_at(SimTime(20), "b").unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| scheduler.pop_until(SimTime(100)))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), SimTime(30));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut scheduler = Scheduler::new();
        for i in 0..5 {
            scheduler.schedule_at(SimTime(7), i).unwrap();
        }
        let order: Vec<i32> = std::iter::from_fn(|| scheduler.pop_until(SimTime(7)))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_deadline_holds_back_later_events() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(SimTime(5), 1).unwrap();
        scheduler.schedule_at(SimTime(50), 2).unwrap();
        assert_eq!(scheduler.pop_until(SimTime(10)), Some((SimTime(5), 1)));
        assert_eq!(scheduler.pop_until(SimTime(10)), None);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.clear(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_schedule_in_past_rejected() {
        let mut scheduler = Scheduler::new();
        scheduler.advance_to(SimTime(100));
        let err = scheduler.schedule_at(SimTime(50), ()).unwrap_err();
        assert_eq!(
            err,
            GossipError::ScheduleInPast {
                at: SimTime(50),
                now: SimTime(100)
            }
        );
        scheduler.schedule_after(10, ());
        assert_eq!(scheduler.peek_time(), Some(SimTime(110)));
    }
}
