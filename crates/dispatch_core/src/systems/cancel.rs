use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::PendingCancellations;
use crate::errors::DispatchError;
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::{Driver, DriverTag, PartyRole};
use crate::rides::{CancelWindows, Ride, RideIndex, RideStatus, RideTimers};
use crate::telemetry::DispatchTelemetry;

/// Cancels a live ride on either party's request.
///
/// An `Accepted` ride past its cancellation window is the one case that gets
/// refused (`expired` error to the requester); every other live status
/// cancels: only the counterpart is notified, the driver is freed, all
/// timers die, and the record is removed.
pub fn cancel_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    mut queue: ResMut<PendingCancellations>,
    mut index: ResMut<RideIndex>,
    mut timers: ResMut<RideTimers>,
    mut windows: ResMut<CancelWindows>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut commands: Commands,
    mut rides: Query<&mut Ride>,
    mut drivers: Query<(&mut Driver, &DriverTag)>,
) {
    if event.0.kind != EventKind::CancelRequested {
        return;
    }
    let Some(cmd) = queue.0.pop_front() else {
        return;
    };

    let Some(entity) = index.get(&cmd.ride_id) else {
        let err = DispatchError::NotFound(format!("unknown ride {}", cmd.ride_id));
        outbox.send(Recipient::Connection(cmd.conn), ServerEvent::from_error(&err));
        return;
    };
    let Ok(ride) = rides.get_mut(entity) else {
        let err = DispatchError::NotFound(format!("unknown ride {}", cmd.ride_id));
        outbox.send(Recipient::Connection(cmd.conn), ServerEvent::from_error(&err));
        return;
    };

    if ride.status == RideStatus::Accepted && !windows.is_cancel_allowed(entity, clock.now()) {
        let err = DispatchError::Expired(format!(
            "cancellation window expired for ride {}",
            cmd.ride_id
        ));
        outbox.send(Recipient::Connection(cmd.conn), ServerEvent::from_error(&err));
        return;
    }

    let cancelled = ServerEvent::RideCancelled {
        ride_id: cmd.ride_id,
        cancelled_by: cmd.cancelled_by,
        reason: cmd.reason.clone(),
    };
    match cmd.cancelled_by {
        PartyRole::Rider => {
            if let Some(driver_entity) = ride.driver {
                if let Ok((_, tag)) = drivers.get(driver_entity) {
                    outbox.send(Recipient::Driver(tag.0.clone()), cancelled);
                }
            }
        }
        PartyRole::Driver => {
            outbox.send(Recipient::Rider(ride.rider.clone()), cancelled);
        }
    }

    if let Some(driver_entity) = ride.driver {
        if let Ok((mut driver, _)) = drivers.get_mut(driver_entity) {
            driver.in_ride = false;
        }
    }
    windows.close(entity);
    timers.cancel_all(entity, &mut clock);
    index.remove(&cmd.ride_id);
    telemetry.rides_cancelled = telemetry.rides_cancelled.saturating_add(1);
    commands.entity(entity).despawn();
}
