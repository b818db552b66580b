use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::Driver;
use crate::rides::{CancelWindows, Ride, RideIndex, RideStatus, RideTimers};
use crate::telemetry::DispatchTelemetry;

/// The offered driver stayed silent for the whole response window: treat it
/// as a rejection and go back to matching.
///
/// Guards on both status and timer id: an accept that landed first already
/// cancelled this timer, and a cancelled timer that fires anyway must not
/// touch the ride.
pub fn response_timeout_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    mut timers: ResMut<RideTimers>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut rides: Query<&mut Ride>,
    mut drivers: Query<&mut Driver>,
) {
    if event.0.kind != EventKind::ResponseTimeout {
        return;
    }
    let Some(entity) = event.0.ride else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(entity) else {
        return;
    };
    if ride.status != RideStatus::PendingResponse {
        return;
    }
    if timers.get(entity).and_then(|set| set.response) != Some(event.0.id) {
        return;
    }
    timers.entry(entity).response = None;

    if let Some(driver_entity) = ride.driver.take() {
        ride.rejected.insert(driver_entity);
        if let Ok(mut driver) = drivers.get_mut(driver_entity) {
            driver.in_ride = false;
        }
    }
    ride.status = RideStatus::Unassigned;
    telemetry.response_timeouts = telemetry.response_timeouts.saturating_add(1);
    clock.schedule_in(0, EventKind::TryDispatch, Some(entity));
}

/// The overall request window closed with the ride still unmatched: tell the
/// rider and drop the record. Rides that reached an offer or beyond are out
/// of this timer's reach.
pub fn request_expired_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    mut index: ResMut<RideIndex>,
    mut timers: ResMut<RideTimers>,
    mut windows: ResMut<CancelWindows>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut commands: Commands,
    rides: Query<&Ride>,
) {
    if event.0.kind != EventKind::RequestExpired {
        return;
    }
    let Some(entity) = event.0.ride else {
        return;
    };
    let Ok(ride) = rides.get(entity) else {
        return;
    };
    if !matches!(ride.status, RideStatus::Pending | RideStatus::Unassigned) {
        return;
    }
    if timers.get(entity).and_then(|set| set.expiry) != Some(event.0.id) {
        return;
    }

    outbox.send(
        Recipient::Rider(ride.rider.clone()),
        ServerEvent::NoDriversFound { ride_id: ride.id },
    );
    timers.cancel_all(entity, &mut clock);
    windows.close(entity);
    index.remove(&ride.id);
    telemetry.request_expiries = telemetry.request_expiries.saturating_add(1);
    commands.entity(entity).despawn();
}
