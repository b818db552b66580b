//! Ride request records: the tagged lifecycle status, the id index, and the
//! per-ride cancellable timer bookkeeping.
//!
//! Status is the single authority over a ride's lifecycle. Timer-driven
//! systems re-check it before acting, and every transition away from a
//! guarded state cancels that state's timer here.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::{Component, Entity, Resource};

use crate::clock::{DispatchClock, TimerId};
use crate::geo::GeoPoint;
use crate::parties::{RideId, RiderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideStatus {
    /// Created, no driver offered yet.
    Pending,
    /// Offered to exactly one driver, response timer running.
    PendingResponse,
    /// Driver confirmed; cancellation window may still be open.
    Accepted,
    /// OTP verified, parties travelling.
    InProgress,
    /// Offer rejected or timed out; waiting for re-dispatch.
    Unassigned,
}

#[derive(Debug, Clone, Component)]
pub struct Ride {
    pub id: RideId,
    pub rider: RiderId,
    /// Assigned driver entity while offered/accepted; `None` between offers.
    pub driver: Option<Entity>,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub price: f64,
    pub distance_km: f64,
    pub ride_type: String,
    pub status: RideStatus,
    /// Drivers that rejected or timed out on this ride. Only ever grows.
    pub rejected: HashSet<Entity>,
    pub created_at_ms: u64,
}

#[derive(Debug, Default, Resource)]
pub struct RideIndex {
    by_id: HashMap<RideId, Entity>,
}

impl RideIndex {
    pub fn insert(&mut self, id: RideId, entity: Entity) {
        self.by_id.insert(id, entity);
    }

    pub fn get(&self, id: &RideId) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn remove(&mut self, id: &RideId) -> Option<Entity> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Live timer ids for one ride. A slot is `Some` only while its timer is
/// scheduled and the ride is still in the state that timer guards.
#[derive(Debug, Default, Clone, Copy)]
pub struct RideTimerSet {
    pub response: Option<TimerId>,
    pub expiry: Option<TimerId>,
    pub cancel_window: Option<TimerId>,
}

/// Cancellable timers keyed by ride entity, so any transition can kill the
/// timers of the state it leaves instead of trusting them not to fire.
#[derive(Debug, Default, Resource)]
pub struct RideTimers {
    by_ride: HashMap<Entity, RideTimerSet>,
}

impl RideTimers {
    pub fn entry(&mut self, ride: Entity) -> &mut RideTimerSet {
        self.by_ride.entry(ride).or_default()
    }

    pub fn get(&self, ride: Entity) -> Option<&RideTimerSet> {
        self.by_ride.get(&ride)
    }

    pub fn cancel_response(&mut self, ride: Entity, clock: &mut DispatchClock) {
        if let Some(set) = self.by_ride.get_mut(&ride) {
            if let Some(id) = set.response.take() {
                clock.cancel(id);
            }
        }
    }

    pub fn cancel_all(&mut self, ride: Entity, clock: &mut DispatchClock) {
        if let Some(set) = self.by_ride.remove(&ride) {
            for id in [set.response, set.expiry, set.cancel_window]
                .into_iter()
                .flatten()
            {
                clock.cancel(id);
            }
        }
    }
}

/// One post-accept cancellation window per ride; opening a new one replaces
/// (never stacks on) any prior window.
#[derive(Debug, Clone, Copy)]
pub struct CancelWindow {
    pub expires_at_ms: u64,
    pub timer: TimerId,
}

#[derive(Debug, Default, Resource)]
pub struct CancelWindows {
    by_ride: HashMap<Entity, CancelWindow>,
}

impl CancelWindows {
    pub fn open(&mut self, ride: Entity, window: CancelWindow, clock: &mut DispatchClock) {
        if let Some(previous) = self.by_ride.insert(ride, window) {
            clock.cancel(previous.timer);
        }
    }

    pub fn get(&self, ride: Entity) -> Option<&CancelWindow> {
        self.by_ride.get(&ride)
    }

    pub fn close(&mut self, ride: Entity) -> Option<CancelWindow> {
        self.by_ride.remove(&ride)
    }

    /// True strictly before expiry. Absent window means no constraint exists
    /// for this ride (it has expired or was never opened).
    pub fn is_cancel_allowed(&self, ride: Entity, now_ms: u64) -> bool {
        self.by_ride
            .get(&ride)
            .is_some_and(|w| now_ms < w.expires_at_ms)
    }
}
