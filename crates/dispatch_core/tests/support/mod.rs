#![allow(dead_code)]

use dispatch_core::commands::{CancelCmd, ClientCommand, DecisionCmd, LocationCmd, OtpCmd};
use dispatch_core::config::EngineConfig;
use dispatch_core::engine::Engine;
use dispatch_core::events::ServerEvent;
use dispatch_core::geo::GeoPoint;
use dispatch_core::parties::{ConnectionId, DriverId, PartyRole, RideId, RiderId};
use dispatch_core::presence::PresenceRegistry;
use dispatch_core::rides::{Ride, RideIndex, RideStatus};

/// Engine wrapper that owns the test clock and offers command shorthands.
pub struct Harness {
    pub engine: Engine,
    pub now_ms: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default().with_otp_seed(42))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config),
            now_ms: 0,
        }
    }

    pub fn send(&mut self, command: ClientCommand) -> Vec<(ConnectionId, ServerEvent)> {
        self.engine.apply(self.now_ms, command)
    }

    /// Advance the clock by `ms`, firing everything that comes due.
    pub fn advance(&mut self, ms: u64) -> Vec<(ConnectionId, ServerEvent)> {
        self.now_ms += ms;
        self.engine.tick(self.now_ms)
    }

    pub fn accept(&mut self, ride_id: RideId, driver: &str, conn: u64) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Decision(DecisionCmd::Accept {
            ride_id,
            driver_id: DriverId(driver.to_string()),
            conn: ConnectionId(conn),
        }))
    }

    pub fn reject(&mut self, ride_id: RideId, driver: &str, conn: u64) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Decision(DecisionCmd::Reject {
            ride_id,
            driver_id: DriverId(driver.to_string()),
            reason: None,
            conn: ConnectionId(conn),
        }))
    }

    pub fn cancel(
        &mut self,
        ride_id: RideId,
        by: PartyRole,
        conn: u64,
    ) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Cancel(CancelCmd {
            ride_id,
            cancelled_by: by,
            reason: Some("changed plans".to_string()),
            conn: ConnectionId(conn),
        }))
    }

    pub fn request_otp(
        &mut self,
        ride_id: RideId,
        rider: &str,
        driver: &str,
        conn: u64,
    ) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Otp(OtpCmd::Request {
            ride_id,
            rider_id: RiderId(rider.to_string()),
            driver_id: DriverId(driver.to_string()),
            conn: ConnectionId(conn),
        }))
    }

    pub fn verify_otp(
        &mut self,
        ride_id: RideId,
        code: &str,
        conn: u64,
    ) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Otp(OtpCmd::Verify {
            ride_id,
            code: code.to_string(),
            conn: ConnectionId(conn),
        }))
    }

    pub fn driver_ping(&mut self, conn: u64, location: GeoPoint) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Location(LocationCmd::DriverPing {
            conn: ConnectionId(conn),
            location,
        }))
    }

    pub fn ride_location(
        &mut self,
        ride_id: RideId,
        role: PartyRole,
        location: GeoPoint,
    ) -> Vec<(ConnectionId, ServerEvent)> {
        self.send(ClientCommand::Location(LocationCmd::RideUpdate {
            ride_id,
            role,
            location,
        }))
    }

    pub fn ride_status(&mut self, ride_id: RideId) -> Option<RideStatus> {
        let entity = self
            .engine
            .world()
            .resource::<RideIndex>()
            .get(&ride_id)?;
        self.engine
            .world()
            .get_entity(entity)
            .and_then(|e| e.get::<Ride>())
            .map(|ride| ride.status)
    }

    pub fn driver_in_ride(&mut self, driver: &str) -> Option<bool> {
        let entity = self
            .engine
            .world()
            .resource::<PresenceRegistry>()
            .driver_entity(&DriverId(driver.to_string()))?;
        self.engine
            .world()
            .get_entity(entity)
            .and_then(|e| e.get::<dispatch_core::parties::Driver>())
            .map(|driver| driver.in_ride)
    }
}

/// Events delivered to one connection, in order.
pub fn events_for(batch: &[(ConnectionId, ServerEvent)], conn: u64) -> Vec<ServerEvent> {
    batch
        .iter()
        .filter(|(to, _)| *to == ConnectionId(conn))
        .map(|(_, event)| event.clone())
        .collect()
}

/// Extract the ride id from a `rideRequestAck`.
pub fn ride_id_from_ack(batch: &[(ConnectionId, ServerEvent)]) -> RideId {
    batch
        .iter()
        .find_map(|(_, event)| match event {
            ServerEvent::RideRequestAck { ride_id, .. } => Some(*ride_id),
            _ => None,
        })
        .expect("ride request ack present")
}

/// Extract the OTP code from a `rideOtpGenerated`.
pub fn otp_from(batch: &[(ConnectionId, ServerEvent)]) -> String {
    batch
        .iter()
        .find_map(|(_, event)| match event {
            ServerEvent::RideOtpGenerated { otp, .. } => Some(otp.clone()),
            _ => None,
        })
        .expect("otp event present")
}
