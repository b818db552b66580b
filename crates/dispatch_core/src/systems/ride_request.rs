use std::collections::HashSet;

use bevy_ecs::prelude::{Commands, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::PendingRideRequests;
use crate::config::EngineConfig;
use crate::errors::DispatchError;
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::RideId;
use crate::rides::{Ride, RideIndex, RideStatus, RideTimers};
use crate::telemetry::DispatchTelemetry;

/// Intakes a rider's request: validates coordinates, creates the ride record
/// in `Pending`, arms the overall request-expiry timer, and queues the first
/// matching attempt at the current instant.
pub fn ride_request_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    config: Res<EngineConfig>,
    mut queue: ResMut<PendingRideRequests>,
    mut index: ResMut<RideIndex>,
    mut timers: ResMut<RideTimers>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut commands: Commands,
) {
    if event.0.kind != EventKind::RideRequested {
        return;
    }
    let Some(cmd) = queue.0.pop_front() else {
        return;
    };

    if let Err(err) = cmd.pickup.validated().and(cmd.dropoff.validated()) {
        outbox.send(
            Recipient::Connection(cmd.conn),
            ServerEvent::from_error(&DispatchError::from(err)),
        );
        return;
    }

    let now = clock.now();
    let ride_id = RideId::generate();
    let entity = commands
        .spawn(Ride {
            id: ride_id,
            rider: cmd.rider_id,
            driver: None,
            pickup: cmd.pickup,
            dropoff: cmd.dropoff,
            price: cmd.price,
            distance_km: cmd.distance_km,
            ride_type: cmd.ride_type,
            status: RideStatus::Pending,
            rejected: HashSet::new(),
            created_at_ms: now,
        })
        .id();
    index.insert(ride_id, entity);

    let expiry = clock.schedule_in(
        config.request_expiry_ms,
        EventKind::RequestExpired,
        Some(entity),
    );
    timers.entry(entity).expiry = Some(expiry);
    clock.schedule_in(0, EventKind::TryDispatch, Some(entity));

    outbox.send(
        Recipient::Connection(cmd.conn),
        ServerEvent::RideRequestAck {
            status: "searching".to_string(),
            ride_id,
        },
    );
    telemetry.rides_requested = telemetry.rides_requested.saturating_add(1);
}
