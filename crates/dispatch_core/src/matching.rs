//! Driver eligibility and selection.
//!
//! Eligibility is a pure filter over the candidate pool: online, not in a
//! ride, known location, not previously rejected for this ride, within the
//! match radius of the pickup. Candidates are ranked ascending by
//! `(distance, driver id)` so selection is deterministic under ties.

use std::collections::HashSet;
use std::ops::Deref;

use bevy_ecs::prelude::{Entity, Resource};

use crate::geo::{haversine_km, GeoPoint};
use crate::parties::{Driver, DriverId};

/// One eligible driver, ready for selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entity: Entity,
    pub driver_id: DriverId,
    pub location: GeoPoint,
    pub distance_km: f64,
}

/// Raw pool entry as gathered from the world by the dispatch system.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub entity: Entity,
    pub driver_id: DriverId,
    pub driver: Driver,
    pub location: Option<GeoPoint>,
}

/// Filter and rank the pool for one ride.
pub fn eligible_candidates(
    pickup: GeoPoint,
    radius_km: f64,
    rejected: &HashSet<Entity>,
    pool: &[PoolEntry],
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = pool
        .iter()
        .filter(|entry| entry.driver.online && !entry.driver.in_ride)
        .filter(|entry| !rejected.contains(&entry.entity))
        .filter_map(|entry| {
            let location = entry.location?;
            let distance_km = haversine_km(pickup, location);
            (distance_km <= radius_km).then(|| Candidate {
                entity: entry.entity,
                driver_id: entry.driver_id.clone(),
                location,
                distance_km,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.driver_id.cmp(&b.driver_id))
    });
    candidates
}

/// Selection policy over a ranked candidate list.
pub trait DriverSelector: Send + Sync {
    /// Pick one driver from candidates already ranked by
    /// [`eligible_candidates`], or `None` to leave the ride waiting.
    fn select<'a>(&self, pickup: GeoPoint, candidates: &'a [Candidate]) -> Option<&'a Candidate>;
}

/// Default policy: the closest eligible driver.
#[derive(Debug, Default)]
pub struct NearestDriver;

impl DriverSelector for NearestDriver {
    fn select<'a>(&self, _pickup: GeoPoint, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        candidates.first()
    }
}

/// Resource wrapper for the selection policy trait object.
#[derive(Resource)]
pub struct DriverSelectorResource(pub Box<dyn DriverSelector>);

impl DriverSelectorResource {
    pub fn new(selector: Box<dyn DriverSelector>) -> Self {
        Self(selector)
    }
}

impl Deref for DriverSelectorResource {
    type Target = dyn DriverSelector;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
