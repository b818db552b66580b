use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::{LocationCmd, PendingLocations};
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::{Driver, DriverTag, PartyRole, Position};
use crate::presence::{PartyRef, PresenceRegistry};
use crate::rides::{Ride, RideIndex, RideStatus};
use crate::telemetry::DispatchTelemetry;

/// Location ingestion and relay. Both paths are best-effort: invalid
/// coordinates, unknown rides, and missing counterpart connections are
/// silent drops. The stream is high-frequency and self-healing.
pub fn location_system(
    event: Res<CurrentEvent>,
    clock: Res<DispatchClock>,
    mut queue: ResMut<PendingLocations>,
    mut registry: ResMut<PresenceRegistry>,
    index: Res<RideIndex>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut commands: Commands,
    mut drivers: Query<(&mut Driver, Option<&mut Position>)>,
    rides: Query<&Ride>,
    tags: Query<&DriverTag>,
) {
    if event.0.kind != EventKind::LocationInbound {
        return;
    }
    let Some(cmd) = queue.0.pop_front() else {
        return;
    };

    match cmd {
        LocationCmd::DriverPing { conn, location } => {
            let Some(PartyRef::Driver(driver_id)) = registry.party_for_conn(conn).cloned() else {
                return;
            };
            if !location.is_valid() {
                return;
            }
            let Some(entity) = registry.driver_entity(&driver_id) else {
                return;
            };
            let Ok(cell) = location.cell() else {
                return;
            };

            let now = clock.now();
            let mut in_ride = false;
            if let Ok((mut driver, position)) = drivers.get_mut(entity) {
                driver.last_seen_ms = now;
                in_ride = driver.in_ride;
                match position {
                    Some(mut position) => {
                        position.point = location;
                        position.cell = cell;
                        position.updated_at_ms = now;
                    }
                    None => {
                        commands.entity(entity).insert(Position {
                            point: location,
                            cell,
                            updated_at_ms: now,
                        });
                    }
                }
            }
            registry.set_driver_cell(entity, cell);

            if in_ride {
                for ride in rides.iter() {
                    if ride.driver == Some(entity)
                        && matches!(ride.status, RideStatus::Accepted | RideStatus::InProgress)
                    {
                        outbox.send(
                            Recipient::Rider(ride.rider.clone()),
                            ServerEvent::CaptainLocationUpdate {
                                ride_id: ride.id,
                                location,
                            },
                        );
                        telemetry.locations_relayed = telemetry.locations_relayed.saturating_add(1);
                        break;
                    }
                }
            }
        }
        LocationCmd::RideUpdate {
            ride_id,
            role,
            location,
        } => {
            if !location.is_valid() {
                return;
            }
            let Some(entity) = index.get(&ride_id) else {
                return;
            };
            let Ok(ride) = rides.get(entity) else {
                return;
            };
            let recipient = match role {
                PartyRole::Rider => ride
                    .driver
                    .and_then(|driver_entity| tags.get(driver_entity).ok())
                    .map(|tag| Recipient::Driver(tag.0.clone())),
                PartyRole::Driver => Some(Recipient::Rider(ride.rider.clone())),
            };
            let Some(recipient) = recipient else {
                return;
            };
            outbox.send(
                recipient,
                ServerEvent::CounterpartyLocation {
                    ride_id,
                    role,
                    location,
                },
            );
            telemetry.locations_relayed = telemetry.locations_relayed.saturating_add(1);
        }
    }
}
