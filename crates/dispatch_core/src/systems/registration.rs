use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::{PendingRegistrations, RegistrationCmd};
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::{Driver, DriverTag, PartyRole, Position};
use crate::presence::{PartyRef, PresenceRegistry};

/// Handles driver/rider registration and disconnects.
///
/// Registration is idempotent: a known identity gets its connection handle
/// replaced. Drivers keep their entity (and location history) across
/// disconnects and are only marked offline; riders are removed outright.
pub fn registration_system(
    event: Res<CurrentEvent>,
    clock: Res<DispatchClock>,
    mut queue: ResMut<PendingRegistrations>,
    mut registry: ResMut<PresenceRegistry>,
    mut outbox: ResMut<Outbox>,
    mut commands: Commands,
    mut drivers: Query<(&mut Driver, Option<&mut Position>)>,
) {
    if event.0.kind != EventKind::Registration {
        return;
    }
    let Some(cmd) = queue.0.pop_front() else {
        return;
    };

    match cmd {
        RegistrationCmd::Driver {
            driver_id,
            conn,
            location,
            is_active,
        } => {
            let now = clock.now();
            // Out-of-range coordinates do not block registration, they are
            // just not recorded.
            let location = location.and_then(|point| point.validated().ok());

            match registry.driver_entity(&driver_id) {
                Some(entity) => {
                    if let Ok((mut driver, position)) = drivers.get_mut(entity) {
                        driver.online = is_active;
                        driver.last_seen_ms = now;
                        if let Some(point) = location {
                            if let Ok(cell) = point.cell() {
                                match position {
                                    Some(mut position) => {
                                        position.point = point;
                                        position.cell = cell;
                                        position.updated_at_ms = now;
                                    }
                                    None => {
                                        commands.entity(entity).insert(Position {
                                            point,
                                            cell,
                                            updated_at_ms: now,
                                        });
                                    }
                                }
                                registry.set_driver_cell(entity, cell);
                            }
                        }
                    }
                    registry.bind_driver(driver_id, entity, conn);
                }
                None => {
                    let mut spawned = commands.spawn((
                        Driver {
                            online: is_active,
                            in_ride: false,
                            last_seen_ms: now,
                        },
                        DriverTag(driver_id.clone()),
                    ));
                    let entity = spawned.id();
                    if let Some(point) = location {
                        if let Ok(cell) = point.cell() {
                            spawned.insert(Position {
                                point,
                                cell,
                                updated_at_ms: now,
                            });
                            registry.set_driver_cell(entity, cell);
                        }
                    }
                    registry.bind_driver(driver_id, entity, conn);
                }
            }

            outbox.send(
                Recipient::Connection(conn),
                ServerEvent::RegistrationAcknowledged {
                    role: PartyRole::Driver,
                },
            );
        }
        RegistrationCmd::Rider { rider_id, conn } => {
            registry.bind_rider(rider_id, conn);
        }
        RegistrationCmd::Disconnect { conn } => match registry.party_for_conn(conn).cloned() {
            Some(PartyRef::Driver(driver_id)) => {
                if let Some(entity) = registry.driver_entity(&driver_id) {
                    if let Ok((mut driver, _)) = drivers.get_mut(entity) {
                        driver.online = false;
                    }
                }
                registry.clear_driver_conn(&driver_id);
            }
            Some(PartyRef::Rider(rider_id)) => {
                registry.remove_rider(&rider_id);
            }
            None => {}
        },
    }
}
