mod support;

use dispatch_core::events::ServerEvent;
use dispatch_core::rides::RideStatus;
use dispatch_core::test_helpers::{
    faraway_driver_position, nearby_driver_position, register_driver, register_rider, request_ride,
};
use support::{events_for, ride_id_from_ack, Harness};

const RIDER_CONN: u64 = 1;
const DRIVER_CONN: u64 = 10;

#[test]
fn nearby_driver_is_offered_and_rider_is_told() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-1", DRIVER_CONN, nearby_driver_position()));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    let ride_id = ride_id_from_ack(&batch);

    let driver_events = events_for(&batch, DRIVER_CONN);
    assert!(
        matches!(driver_events.as_slice(), [ServerEvent::NewRideRequest { ride }] if ride.ride_id == ride_id),
        "driver should receive exactly the offer, got {driver_events:?}"
    );

    let rider_events = events_for(&batch, RIDER_CONN);
    assert!(rider_events
        .iter()
        .any(|e| matches!(e, ServerEvent::CaptainFound { .. })));

    assert_eq!(h.ride_status(ride_id), Some(RideStatus::PendingResponse));
    assert_eq!(h.driver_in_ride("d-1"), Some(true));
}

#[test]
fn offer_carries_full_ride_details() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-1", DRIVER_CONN, nearby_driver_position()));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    let offer = events_for(&batch, DRIVER_CONN)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::NewRideRequest { ride } => Some(ride),
            _ => None,
        })
        .expect("offer present");

    assert_eq!(offer.price, 240.0);
    assert_eq!(offer.ride_type, "standard");
    assert!(offer.pickup_distance_km > 0.0 && offer.pickup_distance_km < 8.0);
}

#[test]
fn no_drivers_online_tells_the_rider() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    let rider_events = events_for(&batch, RIDER_CONN);
    assert!(rider_events
        .iter()
        .any(|e| matches!(e, ServerEvent::NoCaptainsAvailable { .. })));

    // The ride keeps waiting under the request-expiry timer.
    let ride_id = ride_id_from_ack(&batch);
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::Pending));
}

#[test]
fn out_of_radius_driver_is_not_eligible() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-far", DRIVER_CONN, faraway_driver_position()));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    assert!(events_for(&batch, DRIVER_CONN).is_empty());
    assert!(events_for(&batch, RIDER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::NoCaptainsAvailable { .. })));
}

#[test]
fn busy_driver_is_never_offered_a_second_ride() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", 1));
    h.send(register_rider("r-2", 2));
    h.send(register_driver("d-1", DRIVER_CONN, nearby_driver_position()));

    let first = h.send(request_ride("r-1", 1));
    assert_eq!(events_for(&first, DRIVER_CONN).len(), 1);

    // Driver is pending a response, so the second rider finds nobody.
    let second = h.send(request_ride("r-2", 2));
    assert!(events_for(&second, DRIVER_CONN).is_empty());
    assert!(events_for(&second, 2)
        .iter()
        .any(|e| matches!(e, ServerEvent::NoCaptainsAvailable { .. })));
}

#[test]
fn closest_driver_wins() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-near", 10, nearby_driver_position()));
    h.send(register_driver(
        "d-nearer",
        11,
        dispatch_core::geo::GeoPoint::new(28.601, 77.201),
    ));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    assert!(events_for(&batch, 10).is_empty());
    assert_eq!(events_for(&batch, 11).len(), 1);
}

#[test]
fn equidistant_tie_breaks_by_driver_id() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-b", 10, nearby_driver_position()));
    h.send(register_driver("d-a", 11, nearby_driver_position()));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    assert!(events_for(&batch, 10).is_empty());
    assert_eq!(events_for(&batch, 11).len(), 1, "lower driver id wins ties");
}

#[test]
fn request_with_invalid_pickup_is_rejected_without_state() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));

    let mut cmd = match request_ride("r-1", RIDER_CONN) {
        dispatch_core::commands::ClientCommand::RideRequest(cmd) => cmd,
        other => panic!("unexpected command {other:?}"),
    };
    cmd.pickup = dispatch_core::geo::GeoPoint::new(95.0, 77.20);
    let batch = h.send(dispatch_core::commands::ClientCommand::RideRequest(cmd));

    let rider_events = events_for(&batch, RIDER_CONN);
    assert!(
        matches!(rider_events.as_slice(), [ServerEvent::Error { .. }]),
        "expected a validation error, got {rider_events:?}"
    );
    assert!(h
        .engine
        .world()
        .resource::<dispatch_core::rides::RideIndex>()
        .is_empty());
}
