//! Event clock: a min-heap of timestamped, subject-tagged events.
//!
//! Every mutation in the engine is driven by one popped event. Timer events
//! carry the ride entity they guard and a timer id; transitions cancel timers
//! by id, and timer systems still re-check status before acting, so a stale
//! timer firing is always a no-op.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use bevy_ecs::prelude::{Entity, Resource};

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// A registration/disconnect command is waiting in its queue.
    Registration,
    /// A ride request command is waiting in its queue.
    RideRequested,
    /// An accept/reject command is waiting in its queue.
    DriverDecision,
    /// A cancel command is waiting in its queue.
    CancelRequested,
    /// A driver ping or per-ride location update is waiting in its queue.
    LocationInbound,
    /// An OTP request/verify command is waiting in its queue.
    OtpCommand,
    /// Run the matching engine for the subject ride.
    TryDispatch,
    /// The offered driver did not answer within the response window.
    ResponseTimeout,
    /// The subject ride has waited out the overall request window.
    RequestExpired,
    /// The post-accept cancellation window has elapsed.
    CancelWindowElapsed,
    /// Periodic OTP garbage collection.
    OtpSweep,
}

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub ride: Option<Entity>,
    pub id: TimerId,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp; ties
        // resolve in schedule order so same-instant events stay FIFO.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event just popped; inserted by the engine before each schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct DispatchClock {
    now: u64,
    next_id: TimerId,
    events: BinaryHeap<Event>,
    cancelled: HashSet<TimerId>,
}

impl DispatchClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move "now" forward without processing events. Never moves backwards.
    pub fn advance_to(&mut self, timestamp: u64) {
        if timestamp > self.now {
            self.now = timestamp;
        }
    }

    pub fn schedule_at(
        &mut self,
        timestamp: u64,
        kind: EventKind,
        ride: Option<Entity>,
    ) -> TimerId {
        debug_assert!(
            timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(Event {
            timestamp,
            kind,
            ride,
            id,
        });
        id
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, ride: Option<Entity>) -> TimerId {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, ride)
    }

    /// Mark a scheduled event dead; it is dropped when it surfaces.
    pub fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }

    /// Pop the next live event at or before `until`, advancing `now` to its
    /// timestamp. Cancelled events are skipped and forgotten.
    pub fn pop_due(&mut self, until: u64) -> Option<Event> {
        loop {
            let next = self.events.peek()?;
            if next.timestamp > until {
                return None;
            }
            let event = self.events.pop().expect("peeked event exists");
            if self.cancelled.remove(&event.id) {
                continue;
            }
            self.now = event.timestamp;
            return Some(event);
        }
    }

    /// Pop the next live event regardless of timestamp.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.pop_due(u64::MAX)
    }

    /// Timestamp of the earliest scheduled event, cancelled ones included
    /// (an over-eager wakeup is harmless; a missed one is not).
    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.events.iter().all(|e| self.cancelled.contains(&e.id))
    }

    pub fn pending_event_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| !self.cancelled.contains(&e.id))
            .count()
    }
}
