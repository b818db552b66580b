use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::{DecisionCmd, PendingDecisions};
use crate::config::EngineConfig;
use crate::errors::DispatchError;
use crate::events::ServerEvent;
use crate::outbox::{Outbox, Recipient};
use crate::parties::{Driver, Position};
use crate::presence::PresenceRegistry;
use crate::rides::{CancelWindow, CancelWindows, Ride, RideIndex, RideStatus, RideTimers};
use crate::telemetry::DispatchTelemetry;

/// Handles a driver's accept/reject answer to an offer.
///
/// Accept races the response timer; whichever observes `PendingResponse`
/// first wins and the loser no-ops. A duplicate accept from the assigned
/// driver repeats the confirmation without touching state.
pub fn decision_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    config: Res<EngineConfig>,
    mut queue: ResMut<PendingDecisions>,
    registry: Res<PresenceRegistry>,
    index: Res<RideIndex>,
    mut timers: ResMut<RideTimers>,
    mut windows: ResMut<CancelWindows>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut rides: Query<&mut Ride>,
    mut drivers: Query<(&mut Driver, Option<&Position>)>,
) {
    if event.0.kind != EventKind::DriverDecision {
        return;
    }
    let Some(cmd) = queue.0.pop_front() else {
        return;
    };

    match cmd {
        DecisionCmd::Accept {
            ride_id,
            driver_id,
            conn,
        } => {
            let Some(entity) = index.get(&ride_id) else {
                let err = DispatchError::NotFound(format!("unknown ride {ride_id}"));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            };
            let Ok(mut ride) = rides.get_mut(entity) else {
                let err = DispatchError::NotFound(format!("unknown ride {ride_id}"));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            };
            let Some(driver_entity) = registry.driver_entity(&driver_id) else {
                let err = DispatchError::NotFound(format!("unknown driver {driver_id}"));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            };

            match ride.status {
                RideStatus::PendingResponse if ride.driver == Some(driver_entity) => {
                    ride.status = RideStatus::Accepted;
                    timers.cancel_response(entity, &mut clock);
                    // The overall request window no longer applies either.
                    if let Some(id) = timers.entry(entity).expiry.take() {
                        clock.cancel(id);
                    }

                    let timer = clock.schedule_in(
                        config.cancel_window_ms,
                        EventKind::CancelWindowElapsed,
                        Some(entity),
                    );
                    windows.open(
                        entity,
                        CancelWindow {
                            expires_at_ms: clock.now() + config.cancel_window_ms,
                            timer,
                        },
                        &mut clock,
                    );
                    timers.entry(entity).cancel_window = Some(timer);

                    let driver_location = drivers
                        .get(driver_entity)
                        .ok()
                        .and_then(|(_, position)| position.map(|p| p.point));
                    outbox.send(
                        Recipient::Rider(ride.rider.clone()),
                        ServerEvent::RideAccepted {
                            ride_id,
                            driver_id,
                            driver_location,
                        },
                    );
                    outbox.send(
                        Recipient::Connection(conn),
                        ServerEvent::RideAcceptanceConfirmed { ride_id },
                    );
                    telemetry.rides_accepted = telemetry.rides_accepted.saturating_add(1);
                }
                RideStatus::Accepted if ride.driver == Some(driver_entity) => {
                    outbox.send(
                        Recipient::Connection(conn),
                        ServerEvent::RideAcceptanceConfirmed { ride_id },
                    );
                }
                _ => {
                    let err = DispatchError::StateConflict(format!(
                        "ride {ride_id} cannot be accepted by {driver_id}"
                    ));
                    outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                }
            }
        }
        DecisionCmd::Reject {
            ride_id,
            driver_id,
            reason,
            conn,
        } => {
            let Some(entity) = index.get(&ride_id) else {
                let err = DispatchError::NotFound(format!("unknown ride {ride_id}"));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            };
            let Ok(mut ride) = rides.get_mut(entity) else {
                let err = DispatchError::NotFound(format!("unknown ride {ride_id}"));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            };
            let driver_entity = registry.driver_entity(&driver_id);
            if ride.status != RideStatus::PendingResponse
                || driver_entity.is_none()
                || ride.driver != driver_entity
            {
                let err = DispatchError::StateConflict(format!(
                    "ride {ride_id} has no pending offer for {driver_id}"
                ));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            }

            timers.cancel_response(entity, &mut clock);
            if let Some(driver_entity) = ride.driver.take() {
                ride.rejected.insert(driver_entity);
                if let Ok((mut driver, _)) = drivers.get_mut(driver_entity) {
                    driver.in_ride = false;
                }
            }
            ride.status = RideStatus::Unassigned;
            outbox.send(
                Recipient::Rider(ride.rider.clone()),
                ServerEvent::RideRejected { ride_id, reason },
            );
            telemetry.rejections = telemetry.rejections.saturating_add(1);
            clock.schedule_in(0, EventKind::TryDispatch, Some(entity));
        }
    }
}
