//! Inbound command payloads and their pending queues.
//!
//! Clock events are payload-free; each command event kind has a queue
//! resource the owning system pops FIFO. A command scheduled at time T is
//! always the next entry of its queue when its event surfaces at T.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;

use crate::geo::GeoPoint;
use crate::parties::{ConnectionId, DriverId, PartyRole, RideId, RiderId};

#[derive(Debug, Clone)]
pub enum RegistrationCmd {
    Driver {
        driver_id: DriverId,
        conn: ConnectionId,
        location: Option<GeoPoint>,
        is_active: bool,
    },
    Rider {
        rider_id: RiderId,
        conn: ConnectionId,
    },
    Disconnect {
        conn: ConnectionId,
    },
}

#[derive(Debug, Clone)]
pub struct RideRequestCmd {
    pub rider_id: RiderId,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub price: f64,
    pub distance_km: f64,
    pub ride_type: String,
    pub conn: ConnectionId,
}

#[derive(Debug, Clone)]
pub enum DecisionCmd {
    Accept {
        ride_id: RideId,
        driver_id: DriverId,
        conn: ConnectionId,
    },
    Reject {
        ride_id: RideId,
        driver_id: DriverId,
        reason: Option<String>,
        conn: ConnectionId,
    },
}

#[derive(Debug, Clone)]
pub struct CancelCmd {
    pub ride_id: RideId,
    pub cancelled_by: PartyRole,
    pub reason: Option<String>,
    pub conn: ConnectionId,
}

#[derive(Debug, Clone)]
pub enum LocationCmd {
    /// Driver presence ping; identity resolves from the sending connection.
    DriverPing {
        conn: ConnectionId,
        location: GeoPoint,
    },
    /// Per-ride relay update from either party.
    RideUpdate {
        ride_id: RideId,
        role: PartyRole,
        location: GeoPoint,
    },
}

#[derive(Debug, Clone)]
pub enum OtpCmd {
    Request {
        ride_id: RideId,
        rider_id: RiderId,
        driver_id: DriverId,
        conn: ConnectionId,
    },
    Verify {
        ride_id: RideId,
        code: String,
        conn: ConnectionId,
    },
}

/// Everything the embedding layer can feed into the engine.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    Registration(RegistrationCmd),
    RideRequest(RideRequestCmd),
    Decision(DecisionCmd),
    Cancel(CancelCmd),
    Location(LocationCmd),
    Otp(OtpCmd),
}

#[derive(Debug, Default, Resource)]
pub struct PendingRegistrations(pub VecDeque<RegistrationCmd>);

#[derive(Debug, Default, Resource)]
pub struct PendingRideRequests(pub VecDeque<RideRequestCmd>);

#[derive(Debug, Default, Resource)]
pub struct PendingDecisions(pub VecDeque<DecisionCmd>);

#[derive(Debug, Default, Resource)]
pub struct PendingCancellations(pub VecDeque<CancelCmd>);

#[derive(Debug, Default, Resource)]
pub struct PendingLocations(pub VecDeque<LocationCmd>);

#[derive(Debug, Default, Resource)]
pub struct PendingOtpCommands(pub VecDeque<OtpCmd>);
