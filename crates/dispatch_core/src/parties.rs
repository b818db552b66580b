//! Party identities and the driver-side ECS components.
//!
//! Riders are registry entries only (identity → connection); drivers are
//! entities so the matching path can query position and availability the same
//! way any other system does.

use bevy_ecs::prelude::Component;
use h3o::CellIndex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub String);

/// Ride identifier, generated at request intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(pub Uuid);

impl RideId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RiderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for RideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Live connection handle identifier, assigned by the embedding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Rider,
    Driver,
}

/// Driver availability. `in_ride` is the single mutual-exclusion flag that
/// keeps a driver from being offered two rides at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Driver {
    pub online: bool,
    pub in_ride: bool,
    pub last_seen_ms: u64,
}

/// Reverse lookup from a driver entity to its wire identity.
#[derive(Debug, Clone, Component)]
pub struct DriverTag(pub DriverId);

/// Last known driver position, kept alongside its presence-index cell.
#[derive(Debug, Clone, Copy, Component)]
pub struct Position {
    pub point: GeoPoint,
    pub cell: CellIndex,
    pub updated_at_ms: u64,
}
