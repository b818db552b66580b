mod support;

use dispatch_core::clock::ONE_SEC_MS;
use dispatch_core::events::ServerEvent;
use dispatch_core::parties::PartyRole;
use dispatch_core::rides::RideStatus;
use dispatch_core::test_helpers::{nearby_driver_position, register_driver, register_rider, request_ride};
use support::{events_for, otp_from, ride_id_from_ack, Harness};

const RIDER_CONN: u64 = 1;
const DRIVER_CONN: u64 = 10;

fn offered_ride(h: &mut Harness) -> dispatch_core::parties::RideId {
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-1", DRIVER_CONN, nearby_driver_position()));
    let batch = h.send(request_ride("r-1", RIDER_CONN));
    ride_id_from_ack(&batch)
}

#[test]
fn accept_notifies_both_sides_and_opens_the_window() {
    let mut h = Harness::new();
    let ride_id = offered_ride(&mut h);

    let batch = h.accept(ride_id, "d-1", DRIVER_CONN);
    assert!(events_for(&batch, RIDER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::RideAccepted { driver_location: Some(_), .. })));
    assert!(events_for(&batch, DRIVER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::RideAcceptanceConfirmed { .. })));
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::Accepted));
}

#[test]
fn duplicate_accept_is_a_reported_no_op() {
    let mut h = Harness::new();
    let ride_id = offered_ride(&mut h);

    let first = h.accept(ride_id, "d-1", DRIVER_CONN);
    let second = h.accept(ride_id, "d-1", DRIVER_CONN);

    assert_eq!(
        events_for(&first, RIDER_CONN)
            .iter()
            .filter(|e| matches!(e, ServerEvent::RideAccepted { .. }))
            .count(),
        1
    );
    // The duplicate only repeats the driver-side confirmation.
    assert!(events_for(&second, RIDER_CONN).is_empty());
    assert!(
        matches!(
            events_for(&second, DRIVER_CONN).as_slice(),
            [ServerEvent::RideAcceptanceConfirmed { .. }]
        ),
        "duplicate accept acknowledges without re-transitioning"
    );
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::Accepted));
}

#[test]
fn accept_by_the_wrong_driver_is_a_conflict() {
    let mut h = Harness::new();
    h.send(register_driver("d-2", 11, nearby_driver_position()));
    let ride_id = offered_ride(&mut h);

    let batch = h.accept(ride_id, "d-2", 11);
    assert!(
        matches!(
            events_for(&batch, 11).as_slice(),
            [ServerEvent::Error { .. }]
        ),
        "unassigned driver cannot accept"
    );
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::PendingResponse));
}

#[test]
fn reject_re_dispatches_to_the_next_driver() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    h.send(register_driver("d-a", 10, nearby_driver_position()));
    h.send(register_driver("d-b", 11, nearby_driver_position()));

    let batch = h.send(request_ride("r-1", RIDER_CONN));
    let ride_id = ride_id_from_ack(&batch);
    assert_eq!(events_for(&batch, 10).len(), 1);

    let batch = h.reject(ride_id, "d-a", 10);
    assert!(events_for(&batch, RIDER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::RideRejected { .. })));
    assert_eq!(
        events_for(&batch, 11).len(),
        1,
        "offer moves on immediately"
    );
    assert_eq!(h.driver_in_ride("d-a"), Some(false));
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::PendingResponse));
}

#[test]
fn cancel_inside_the_window_notifies_only_the_counterpart() {
    let mut h = Harness::new();
    let ride_id = offered_ride(&mut h);
    h.accept(ride_id, "d-1", DRIVER_CONN);

    h.advance(5 * ONE_SEC_MS); // still inside the 10 s window
    let batch = h.cancel(ride_id, PartyRole::Rider, RIDER_CONN);

    let driver_events = events_for(&batch, DRIVER_CONN);
    assert!(
        matches!(driver_events.as_slice(), [ServerEvent::RideCancelled { cancelled_by: PartyRole::Rider, .. }]),
        "driver is told, got {driver_events:?}"
    );
    assert!(
        events_for(&batch, RIDER_CONN).is_empty(),
        "the canceller gets no cancellation echo"
    );
    assert_eq!(h.ride_status(ride_id), None);
    assert_eq!(h.driver_in_ride("d-1"), Some(false));
}

#[test]
fn driver_cancel_notifies_the_rider() {
    let mut h = Harness::new();
    let ride_id = offered_ride(&mut h);
    h.accept(ride_id, "d-1", DRIVER_CONN);

    let batch = h.cancel(ride_id, PartyRole::Driver, DRIVER_CONN);
    assert!(events_for(&batch, RIDER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::RideCancelled { cancelled_by: PartyRole::Driver, .. })));
    assert_eq!(h.ride_status(ride_id), None);
}

#[test]
fn window_expiry_notifies_both_parties_and_blocks_late_cancels() {
    let mut h = Harness::new();
    let ride_id = offered_ride(&mut h);
    h.accept(ride_id, "d-1", DRIVER_CONN);

    let batch = h.advance(10 * ONE_SEC_MS);
    assert!(events_for(&batch, RIDER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::CancellationWindowExpired { .. })));
    assert!(events_for(&batch, DRIVER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::CancellationWindowExpired { .. })));

    let batch = h.cancel(ride_id, PartyRole::Rider, RIDER_CONN);
    assert!(
        matches!(
            events_for(&batch, RIDER_CONN).as_slice(),
            [ServerEvent::Error { .. }]
        ),
        "post-window cancel is refused"
    );
    assert!(events_for(&batch, DRIVER_CONN).is_empty());
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::Accepted));
}

#[test]
fn cancelling_an_unmatched_ride_just_removes_it() {
    let mut h = Harness::new();
    h.send(register_rider("r-1", RIDER_CONN));
    let batch = h.send(request_ride("r-1", RIDER_CONN));
    let ride_id = ride_id_from_ack(&batch);

    let batch = h.cancel(ride_id, PartyRole::Rider, RIDER_CONN);
    assert!(events_for(&batch, RIDER_CONN).is_empty(), "nobody to notify");
    assert_eq!(h.ride_status(ride_id), None);

    // The record is gone, so a later accept cannot find it.
    let batch = h.accept(ride_id, "d-1", DRIVER_CONN);
    assert!(batch
        .iter()
        .any(|(_, e)| matches!(e, ServerEvent::Error { .. })));
}

#[test]
fn in_progress_rides_are_cancellable_after_the_window() {
    let mut h = Harness::new();
    let ride_id = offered_ride(&mut h);
    h.accept(ride_id, "d-1", DRIVER_CONN);

    let batch = h.request_otp(ride_id, "r-1", "d-1", RIDER_CONN);
    let code = otp_from(&batch);
    h.verify_otp(ride_id, &code, DRIVER_CONN);
    assert_eq!(h.ride_status(ride_id), Some(RideStatus::InProgress));

    h.advance(60 * ONE_SEC_MS);
    let batch = h.cancel(ride_id, PartyRole::Driver, DRIVER_CONN);
    assert!(events_for(&batch, RIDER_CONN)
        .iter()
        .any(|e| matches!(e, ServerEvent::RideCancelled { .. })));
    assert_eq!(h.ride_status(ride_id), None);
    assert_eq!(h.driver_in_ride("d-1"), Some(false));
}
