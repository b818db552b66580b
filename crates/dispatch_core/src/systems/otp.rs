use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::{OtpCmd, PendingOtpCommands};
use crate::config::EngineConfig;
use crate::errors::DispatchError;
use crate::events::{OtpFailure, ServerEvent};
use crate::otp::{OtpGenerator, OtpRecord, OtpStore};
use crate::outbox::{Outbox, Recipient};
use crate::rides::{CancelWindows, Ride, RideIndex, RideStatus, RideTimers};
use crate::telemetry::DispatchTelemetry;

/// OTP request/verify handling.
///
/// A request mints a fresh 6-digit code (replacing any earlier one for the
/// ride) and delivers it to the rider only. A correct verification flips the
/// ride to `InProgress` and tells both parties; a wrong code changes nothing.
pub fn otp_command_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    mut queue: ResMut<PendingOtpCommands>,
    index: Res<RideIndex>,
    mut store: ResMut<OtpStore>,
    mut generator: ResMut<OtpGenerator>,
    mut windows: ResMut<CancelWindows>,
    mut timers: ResMut<RideTimers>,
    mut outbox: ResMut<Outbox>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut rides: Query<&mut Ride>,
) {
    if event.0.kind != EventKind::OtpCommand {
        return;
    }
    let Some(cmd) = queue.0.pop_front() else {
        return;
    };

    match cmd {
        OtpCmd::Request {
            ride_id,
            rider_id,
            driver_id,
            conn,
        } => {
            if index.get(&ride_id).is_none() {
                let err = DispatchError::NotFound(format!("unknown ride {ride_id}"));
                outbox.send(Recipient::Connection(conn), ServerEvent::from_error(&err));
                return;
            }
            let code = generator.next_code();
            store.upsert(
                ride_id,
                OtpRecord {
                    code: code.clone(),
                    generated_at_ms: clock.now(),
                    verified: false,
                    rider: rider_id.clone(),
                    driver: driver_id,
                },
            );
            outbox.send(
                Recipient::Rider(rider_id),
                ServerEvent::RideOtpGenerated { ride_id, otp: code },
            );
            telemetry.otp_issued = telemetry.otp_issued.saturating_add(1);
        }
        OtpCmd::Verify {
            ride_id,
            code,
            conn,
        } => {
            let Some(record) = store.get_mut(&ride_id) else {
                outbox.send(
                    Recipient::Connection(conn),
                    ServerEvent::OtpVerificationResult {
                        ride_id,
                        verified: false,
                        reason: Some(OtpFailure::Expired),
                    },
                );
                telemetry.otp_failures = telemetry.otp_failures.saturating_add(1);
                return;
            };
            if record.code != code {
                outbox.send(
                    Recipient::Connection(conn),
                    ServerEvent::OtpVerificationResult {
                        ride_id,
                        verified: false,
                        reason: Some(OtpFailure::Invalid),
                    },
                );
                telemetry.otp_failures = telemetry.otp_failures.saturating_add(1);
                return;
            }

            record.verified = true;
            if let Some(entity) = index.get(&ride_id) {
                if let Ok(mut ride) = rides.get_mut(entity) {
                    if ride.status == RideStatus::Accepted {
                        ride.status = RideStatus::InProgress;
                        // A still-open cancellation window is moot now.
                        if let Some(window) = windows.close(entity) {
                            clock.cancel(window.timer);
                        }
                        timers.entry(entity).cancel_window = None;
                    }
                }
            }

            outbox.send(
                Recipient::Connection(conn),
                ServerEvent::OtpVerificationResult {
                    ride_id,
                    verified: true,
                    reason: None,
                },
            );
            outbox.send(
                Recipient::Rider(record.rider.clone()),
                ServerEvent::OtpVerified { ride_id },
            );
            outbox.send(
                Recipient::Driver(record.driver.clone()),
                ServerEvent::OtpVerified { ride_id },
            );
            telemetry.otp_verified = telemetry.otp_verified.saturating_add(1);
        }
    }
}

/// Periodic OTP garbage collection; reschedules itself.
pub fn otp_sweep_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<DispatchClock>,
    config: Res<EngineConfig>,
    mut store: ResMut<OtpStore>,
    mut telemetry: ResMut<DispatchTelemetry>,
) {
    if event.0.kind != EventKind::OtpSweep {
        return;
    }
    let removed = store.sweep(clock.now(), config.otp_ttl_ms);
    telemetry.otp_swept = telemetry.otp_swept.saturating_add(removed as u64);
    clock.schedule_in(config.otp_sweep_interval_ms, EventKind::OtpSweep, None);
}
