//! Outbound event payloads, serialized as `{"event": ..., "data": ...}`
//! frames by the gateway.

use serde::Serialize;

use crate::errors::{DispatchError, ErrorCode};
use crate::geo::GeoPoint;
use crate::parties::{DriverId, PartyRole, RideId, RiderId};

/// Ride details offered to a driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideDetails {
    pub ride_id: RideId,
    pub rider_id: RiderId,
    pub pickup_location: GeoPoint,
    pub dropoff_location: GeoPoint,
    pub price: f64,
    pub distance_km: f64,
    pub ride_type: String,
    /// Driver-to-pickup distance at offer time.
    pub pickup_distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OtpFailure {
    Invalid,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    RegistrationAcknowledged { role: PartyRole },
    #[serde(rename_all = "camelCase")]
    RideRequestAck { status: String, ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    CaptainFound { ride_id: RideId, driver_id: DriverId },
    #[serde(rename_all = "camelCase")]
    NoCaptainsAvailable { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    NoDriversFound { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    NewRideRequest { ride: RideDetails },
    #[serde(rename_all = "camelCase")]
    RideAccepted {
        ride_id: RideId,
        driver_id: DriverId,
        driver_location: Option<GeoPoint>,
    },
    #[serde(rename_all = "camelCase")]
    RideAcceptanceConfirmed { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    RideRejected {
        ride_id: RideId,
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RideCancelled {
        ride_id: RideId,
        cancelled_by: PartyRole,
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CancellationWindowExpired { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    CaptainLocationUpdate {
        ride_id: RideId,
        location: GeoPoint,
    },
    #[serde(rename_all = "camelCase")]
    CounterpartyLocation {
        ride_id: RideId,
        role: PartyRole,
        location: GeoPoint,
    },
    #[serde(rename_all = "camelCase")]
    RideOtpGenerated { ride_id: RideId, otp: String },
    #[serde(rename_all = "camelCase")]
    OtpVerificationResult {
        ride_id: RideId,
        verified: bool,
        reason: Option<OtpFailure>,
    },
    #[serde(rename_all = "camelCase")]
    OtpVerified { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    pub fn from_error(err: &DispatchError) -> Self {
        ServerEvent::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parties::RideId;

    #[test]
    fn events_serialize_tagged_camel_case() {
        let ride_id = RideId::generate();
        let event = ServerEvent::CaptainFound {
            ride_id,
            driver_id: DriverId("d-1".into()),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "captainFound");
        assert_eq!(json["data"]["driverId"], "d-1");
        assert_eq!(json["data"]["rideId"], ride_id.to_string());
    }

    #[test]
    fn error_events_carry_code_and_message() {
        let err = DispatchError::Expired("cancellation window expired".into());
        let json = serde_json::to_value(ServerEvent::from_error(&err)).expect("serialize");
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["code"], "expired");
    }
}
