//! Shared helpers for exercising the engine in tests.

use crate::commands::{ClientCommand, RegistrationCmd, RideRequestCmd};
use crate::geo::GeoPoint;
use crate::parties::{ConnectionId, DriverId, RiderId};

/// A pickup point used across test files for consistency (Connaught Place,
/// New Delhi).
pub fn test_pickup() -> GeoPoint {
    GeoPoint::new(28.60, 77.20)
}

/// A dropoff a few kilometers from [test_pickup].
pub fn test_dropoff() -> GeoPoint {
    GeoPoint::new(28.64, 77.24)
}

/// A driver position ~1.5 km from [test_pickup], inside the match radius.
pub fn nearby_driver_position() -> GeoPoint {
    GeoPoint::new(28.61, 77.21)
}

/// A driver position ~111 km away, outside any sane match radius.
pub fn faraway_driver_position() -> GeoPoint {
    GeoPoint::new(29.60, 77.20)
}

/// Driver registration command with an explicit connection.
pub fn register_driver(id: &str, conn: u64, location: GeoPoint) -> ClientCommand {
    ClientCommand::Registration(RegistrationCmd::Driver {
        driver_id: DriverId(id.to_string()),
        conn: ConnectionId(conn),
        location: Some(location),
        is_active: true,
    })
}

/// Rider registration command with an explicit connection.
pub fn register_rider(id: &str, conn: u64) -> ClientCommand {
    ClientCommand::Registration(RegistrationCmd::Rider {
        rider_id: RiderId(id.to_string()),
        conn: ConnectionId(conn),
    })
}

/// A plain ride request from [test_pickup] to [test_dropoff].
pub fn request_ride(rider_id: &str, conn: u64) -> ClientCommand {
    ClientCommand::RideRequest(RideRequestCmd {
        rider_id: RiderId(rider_id.to_string()),
        pickup: test_pickup(),
        dropoff: test_dropoff(),
        price: 240.0,
        distance_km: 6.3,
        ride_type: "standard".to_string(),
        conn: ConnectionId(conn),
    })
}
