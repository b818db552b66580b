use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind};
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::DriverTag;
use crate::rides::{CancelWindows, Ride, RideStatus, RideTimers};

/// The post-accept cancellation window elapsed: both parties are told, the
/// window record is retired, and nothing else changes; the ride stays
/// `Accepted` and waits for the OTP handshake.
pub fn cancel_window_system(
    event: Res<CurrentEvent>,
    mut windows: ResMut<CancelWindows>,
    mut timers: ResMut<RideTimers>,
    mut outbox: ResMut<Outbox>,
    rides: Query<&Ride>,
    tags: Query<&DriverTag>,
) {
    if event.0.kind != EventKind::CancelWindowElapsed {
        return;
    }
    let Some(entity) = event.0.ride else {
        return;
    };
    let Ok(ride) = rides.get(entity) else {
        windows.close(entity);
        return;
    };
    if ride.status != RideStatus::Accepted {
        return;
    }
    let Some(window) = windows.get(entity) else {
        return;
    };
    if window.timer != event.0.id {
        // A replacement window owns this ride now.
        return;
    }

    windows.close(entity);
    timers.entry(entity).cancel_window = None;

    let expired = ServerEvent::CancellationWindowExpired { ride_id: ride.id };
    outbox.send(Recipient::Rider(ride.rider.clone()), expired.clone());
    if let Some(driver_entity) = ride.driver {
        if let Ok(tag) = tags.get(driver_entity) {
            outbox.send(Recipient::Driver(tag.0.clone()), expired);
        }
    }
}
