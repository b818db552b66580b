use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::config::EngineConfig;
use crate::events::{RideDetails, ServerEvent};
use crate::geo::{disk_radius_for_km, GridDiskCache};
use crate::matching::{eligible_candidates, DriverSelectorResource, PoolEntry};
use crate::outbox::{Outbox, Recipient};
use crate::parties::{Driver, DriverTag, Position};
use crate::presence::PresenceRegistry;
use crate::rides::{Ride, RideStatus, RideTimers};
use crate::telemetry::DispatchTelemetry;

/// The matching engine: offers the subject ride to the closest eligible
/// driver and arms the response timer.
///
/// Runs on `TryDispatch` for rides in `Pending` or `Unassigned`; anything
/// else means the ride advanced while this event was queued, so it is a
/// no-op. An empty pool notifies the rider and leaves the ride where it is;
/// the request-expiry timer is the loop's overall bound.
pub fn dispatch_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    config: Res<EngineConfig>,
    registry: Res<PresenceRegistry>,
    selector: Res<DriverSelectorResource>,
    mut disk_cache: ResMut<GridDiskCache>,
    mut timers: ResMut<RideTimers>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut rides: Query<&mut Ride>,
    mut drivers: Query<(&mut Driver, &DriverTag, Option<&Position>)>,
) {
    if event.0.kind != EventKind::TryDispatch {
        return;
    }
    let Some(entity) = event.0.ride else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(entity) else {
        return;
    };
    if !matches!(ride.status, RideStatus::Pending | RideStatus::Unassigned) {
        return;
    }
    telemetry.dispatch_attempts = telemetry.dispatch_attempts.saturating_add(1);

    let Ok(pickup_cell) = ride.pickup.cell() else {
        // Pickup was validated at intake; an unmappable point cannot match.
        return;
    };
    let disk = disk_cache.disk(pickup_cell, disk_radius_for_km(config.match_radius_km));
    let pool: Vec<PoolEntry> = registry
        .drivers_in_cells(&disk)
        .into_iter()
        .filter_map(|driver_entity| {
            drivers
                .get(driver_entity)
                .ok()
                .map(|(driver, tag, position)| PoolEntry {
                    entity: driver_entity,
                    driver_id: tag.0.clone(),
                    driver: *driver,
                    location: position.map(|p| p.point),
                })
        })
        .collect();

    let candidates = eligible_candidates(ride.pickup, config.match_radius_km, &ride.rejected, &pool);
    let Some(candidate) = selector.select(ride.pickup, &candidates).cloned() else {
        telemetry.empty_pool_attempts = telemetry.empty_pool_attempts.saturating_add(1);
        outbox.send(
            Recipient::Rider(ride.rider.clone()),
            ServerEvent::NoCaptainsAvailable { ride_id: ride.id },
        );
        return;
    };

    if let Ok((mut driver, _, _)) = drivers.get_mut(candidate.entity) {
        driver.in_ride = true;
    }
    ride.status = RideStatus::PendingResponse;
    ride.driver = Some(candidate.entity);

    let response = clock.schedule_in(
        config.response_timeout_ms,
        EventKind::ResponseTimeout,
        Some(entity),
    );
    timers.entry(entity).response = Some(response);

    outbox.send(
        Recipient::Driver(candidate.driver_id.clone()),
        ServerEvent::NewRideRequest {
            ride: RideDetails {
                ride_id: ride.id,
                rider_id: ride.rider.clone(),
                pickup_location: ride.pickup,
                dropoff_location: ride.dropoff,
                price: ride.price,
                distance_km: ride.distance_km,
                ride_type: ride.ride_type.clone(),
                pickup_distance_km: candidate.distance_km,
            },
        },
    );
    outbox.send(
        Recipient::Rider(ride.rider.clone()),
        ServerEvent::CaptainFound {
            ride_id: ride.id,
            driver_id: candidate.driver_id,
        },
    );
    telemetry.offers_sent = telemetry.offers_sent.saturating_add(1);
}
