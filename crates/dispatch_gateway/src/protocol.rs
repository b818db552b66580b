//! Wire protocol: inbound JSON frames tagged by `event`, normalized at the
//! boundary (`lon` is accepted and canonicalized to `lng`) and translated
//! into engine commands.

use dispatch_core::commands::{
    CancelCmd, ClientCommand, DecisionCmd, LocationCmd, OtpCmd, RegistrationCmd, RideRequestCmd,
};
use dispatch_core::errors::ErrorCode;
use dispatch_core::events::ServerEvent;
use dispatch_core::geo::GeoPoint;
use dispatch_core::parties::{ConnectionId, DriverId, PartyRole, RideId, RiderId};
use serde::Deserialize;

/// Coordinates as clients send them; `lon` drift is tolerated here and
/// nowhere else.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WireLocation {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

impl From<WireLocation> for GeoPoint {
    fn from(wire: WireLocation) -> Self {
        GeoPoint::new(wire.lat, wire.lng)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    RegisterDriver {
        driver_id: String,
        location: Option<WireLocation>,
        #[serde(default = "default_true")]
        is_active: bool,
    },
    #[serde(rename_all = "camelCase")]
    RegisterRider { rider_id: String },
    #[serde(rename_all = "camelCase")]
    RequestRide {
        rider_id: String,
        pickup_location: WireLocation,
        dropoff_location: WireLocation,
        price: f64,
        distance: f64,
        ride_type: String,
    },
    #[serde(rename_all = "camelCase")]
    AcceptRide { ride_id: RideId, driver_id: String },
    #[serde(rename_all = "camelCase")]
    RejectRide {
        ride_id: RideId,
        driver_id: String,
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CancelRide {
        ride_id: RideId,
        cancelled_by: PartyRole,
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateDriverLocation {
        lat: f64,
        #[serde(alias = "lon")]
        lng: f64,
    },
    #[serde(rename_all = "camelCase")]
    LocationUpdate {
        ride_id: RideId,
        role: PartyRole,
        lat: f64,
        #[serde(alias = "lon")]
        lng: f64,
    },
    #[serde(rename_all = "camelCase")]
    RequestOtp {
        ride_id: RideId,
        rider_id: String,
        driver_id: String,
    },
    #[serde(rename_all = "camelCase")]
    VerifyOtp { ride_id: RideId, otp: String },
}

fn default_true() -> bool {
    true
}

impl ClientFrame {
    /// Parse a raw text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Translate into the engine command for the sending connection.
    pub fn into_command(self, conn: ConnectionId) -> ClientCommand {
        match self {
            ClientFrame::RegisterDriver {
                driver_id,
                location,
                is_active,
            } => ClientCommand::Registration(RegistrationCmd::Driver {
                driver_id: DriverId(driver_id),
                conn,
                location: location.map(GeoPoint::from),
                is_active,
            }),
            ClientFrame::RegisterRider { rider_id } => {
                ClientCommand::Registration(RegistrationCmd::Rider {
                    rider_id: RiderId(rider_id),
                    conn,
                })
            }
            ClientFrame::RequestRide {
                rider_id,
                pickup_location,
                dropoff_location,
                price,
                distance,
                ride_type,
            } => ClientCommand::RideRequest(RideRequestCmd {
                rider_id: RiderId(rider_id),
                pickup: pickup_location.into(),
                dropoff: dropoff_location.into(),
                price,
                distance_km: distance,
                ride_type,
                conn,
            }),
            ClientFrame::AcceptRide { ride_id, driver_id } => {
                ClientCommand::Decision(DecisionCmd::Accept {
                    ride_id,
                    driver_id: DriverId(driver_id),
                    conn,
                })
            }
            ClientFrame::RejectRide {
                ride_id,
                driver_id,
                reason,
            } => ClientCommand::Decision(DecisionCmd::Reject {
                ride_id,
                driver_id: DriverId(driver_id),
                reason,
                conn,
            }),
            ClientFrame::CancelRide {
                ride_id,
                cancelled_by,
                reason,
            } => ClientCommand::Cancel(CancelCmd {
                ride_id,
                cancelled_by,
                reason,
                conn,
            }),
            ClientFrame::UpdateDriverLocation { lat, lng } => {
                ClientCommand::Location(LocationCmd::DriverPing {
                    conn,
                    location: GeoPoint::new(lat, lng),
                })
            }
            ClientFrame::LocationUpdate {
                ride_id,
                role,
                lat,
                lng,
            } => ClientCommand::Location(LocationCmd::RideUpdate {
                ride_id,
                role,
                location: GeoPoint::new(lat, lng),
            }),
            ClientFrame::RequestOtp {
                ride_id,
                rider_id,
                driver_id,
            } => ClientCommand::Otp(OtpCmd::Request {
                ride_id,
                rider_id: RiderId(rider_id),
                driver_id: DriverId(driver_id),
                conn,
            }),
            ClientFrame::VerifyOtp { ride_id, otp } => ClientCommand::Otp(OtpCmd::Verify {
                ride_id,
                code: otp,
                conn,
            }),
        }
    }
}

/// Error event for a frame the gateway could not understand.
pub fn malformed_frame_event(err: &serde_json::Error) -> ServerEvent {
    ServerEvent::Error {
        code: ErrorCode::Validation,
        message: format!("malformed frame: {err}"),
    }
}

/// Serialize an outbound event to its text frame.
pub fn encode(event: &ServerEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| {
        r#"{"event":"error","data":{"code":"stateConflict","message":"unencodable event"}}"#
            .to_string()
    })
}
