//! The engine: owns the world, routes clock events into systems, and drains
//! outbound notifications.
//!
//! The engine is wall-clock-free. The embedding layer feeds it commands with
//! an externally supplied `now_ms` and calls [`Engine::tick`] periodically so
//! due timers fire; every state mutation happens inside a schedule run for
//! exactly one popped event. Outbound events address parties; the current
//! connection is resolved here, at drain time.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::commands::{
    ClientCommand, PendingCancellations, PendingDecisions, PendingLocations, PendingOtpCommands,
    PendingRegistrations, PendingRideRequests,
};
use crate::config::EngineConfig;
use crate::events::ServerEvent;
use crate::geo::GridDiskCache;
use crate::matching::{DriverSelectorResource, NearestDriver};
use crate::otp::{OtpGenerator, OtpStore};
use crate::outbox::Outbox;
use crate::parties::ConnectionId;
use crate::presence::PresenceRegistry;
use crate::rides::{CancelWindows, RideIndex, RideTimers};
use crate::systems::{
    cancel::cancel_system,
    cancel_window::cancel_window_system,
    decision::decision_system,
    dispatch::dispatch_system,
    location::location_system,
    otp::{otp_command_system, otp_sweep_system},
    registration::registration_system,
    ride_request::ride_request_system,
    timeout::{request_expired_system, response_timeout_system},
};
use crate::telemetry::DispatchTelemetry;

// Condition functions for each event kind
fn is_registration(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::Registration)
        .unwrap_or(false)
}

fn is_ride_requested(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideRequested)
        .unwrap_or(false)
}

fn is_driver_decision(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::DriverDecision)
        .unwrap_or(false)
}

fn is_cancel_requested(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::CancelRequested)
        .unwrap_or(false)
}

fn is_location_inbound(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::LocationInbound)
        .unwrap_or(false)
}

fn is_otp_command(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::OtpCommand)
        .unwrap_or(false)
}

fn is_try_dispatch(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TryDispatch)
        .unwrap_or(false)
}

fn is_response_timeout(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ResponseTimeout)
        .unwrap_or(false)
}

fn is_request_expired(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RequestExpired)
        .unwrap_or(false)
}

fn is_cancel_window_elapsed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::CancelWindowElapsed)
        .unwrap_or(false)
}

fn is_otp_sweep(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::OtpSweep)
        .unwrap_or(false)
}

/// Builds the coordinator schedule: every event-reacting system gated on its
/// kind, plus [apply_deferred] so spawned/despawned entities are applied
/// before the next event runs.
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        registration_system.run_if(is_registration),
        ride_request_system.run_if(is_ride_requested),
        decision_system.run_if(is_driver_decision),
        cancel_system.run_if(is_cancel_requested),
        location_system.run_if(is_location_inbound),
        otp_command_system.run_if(is_otp_command),
        dispatch_system.run_if(is_try_dispatch),
        response_timeout_system.run_if(is_response_timeout),
        request_expired_system.run_if(is_request_expired),
        cancel_window_system.run_if(is_cancel_window_elapsed),
        otp_sweep_system.run_if(is_otp_sweep),
        apply_deferred,
    ));
    schedule
}

pub struct Engine {
    world: World,
    schedule: Schedule,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut world = World::new();
        let mut clock = DispatchClock::default();
        clock.schedule_in(config.otp_sweep_interval_ms, EventKind::OtpSweep, None);

        world.insert_resource(GridDiskCache::new(config.grid_disk_cache_size));
        world.insert_resource(OtpGenerator::new(config.otp_seed));
        world.insert_resource(clock);
        world.insert_resource(config);
        world.insert_resource(PresenceRegistry::new());
        world.insert_resource(RideIndex::default());
        world.insert_resource(RideTimers::default());
        world.insert_resource(CancelWindows::default());
        world.insert_resource(OtpStore::default());
        world.insert_resource(Outbox::default());
        world.insert_resource(DispatchTelemetry::default());
        world.insert_resource(DriverSelectorResource::new(Box::new(NearestDriver)));
        world.insert_resource(PendingRegistrations::default());
        world.insert_resource(PendingRideRequests::default());
        world.insert_resource(PendingDecisions::default());
        world.insert_resource(PendingCancellations::default());
        world.insert_resource(PendingLocations::default());
        world.insert_resource(PendingOtpCommands::default());

        Self {
            world,
            schedule: dispatch_schedule(),
        }
    }

    /// Feed one inbound command at `now_ms`, run everything due, and return
    /// the connection-addressed notifications it produced.
    pub fn apply(
        &mut self,
        now_ms: u64,
        command: ClientCommand,
    ) -> Vec<(ConnectionId, ServerEvent)> {
        let horizon = {
            let mut clock = self.world.resource_mut::<DispatchClock>();
            clock.advance_to(now_ms);
            clock.now()
        };
        let kind = self.enqueue(command);
        {
            let mut clock = self.world.resource_mut::<DispatchClock>();
            let now = clock.now();
            clock.schedule_at(now, kind, None);
        }
        self.run_due(horizon);
        self.drain()
    }

    /// Advance time, firing every timer due at or before `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<(ConnectionId, ServerEvent)> {
        self.run_due(now_ms);
        self.drain()
    }

    /// Timestamp of the earliest scheduled event, for wakeup scheduling.
    pub fn next_timer_at(&self) -> Option<u64> {
        self.world.resource::<DispatchClock>().next_event_time()
    }

    pub fn telemetry(&self) -> &DispatchTelemetry {
        self.world.resource::<DispatchTelemetry>()
    }

    /// Direct world access, for tests and diagnostics.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn enqueue(&mut self, command: ClientCommand) -> EventKind {
        match command {
            ClientCommand::Registration(cmd) => {
                self.world
                    .resource_mut::<PendingRegistrations>()
                    .0
                    .push_back(cmd);
                EventKind::Registration
            }
            ClientCommand::RideRequest(cmd) => {
                self.world
                    .resource_mut::<PendingRideRequests>()
                    .0
                    .push_back(cmd);
                EventKind::RideRequested
            }
            ClientCommand::Decision(cmd) => {
                self.world
                    .resource_mut::<PendingDecisions>()
                    .0
                    .push_back(cmd);
                EventKind::DriverDecision
            }
            ClientCommand::Cancel(cmd) => {
                self.world
                    .resource_mut::<PendingCancellations>()
                    .0
                    .push_back(cmd);
                EventKind::CancelRequested
            }
            ClientCommand::Location(cmd) => {
                self.world
                    .resource_mut::<PendingLocations>()
                    .0
                    .push_back(cmd);
                EventKind::LocationInbound
            }
            ClientCommand::Otp(cmd) => {
                self.world
                    .resource_mut::<PendingOtpCommands>()
                    .0
                    .push_back(cmd);
                EventKind::OtpCommand
            }
        }
    }

    fn run_due(&mut self, until: u64) {
        loop {
            let event = match self.world.resource_mut::<DispatchClock>().pop_due(until) {
                Some(event) => event,
                None => break,
            };
            self.world.insert_resource(CurrentEvent(event));
            self.schedule.run(&mut self.world);
        }
        self.world
            .resource_mut::<DispatchClock>()
            .advance_to(until);
    }

    fn drain(&mut self) -> Vec<(ConnectionId, ServerEvent)> {
        let queued = self.world.resource_mut::<Outbox>().drain();
        let mut delivered = Vec::with_capacity(queued.len());
        let mut dropped: u64 = 0;
        {
            let registry = self.world.resource::<PresenceRegistry>();
            for (recipient, event) in queued {
                match registry.resolve(&recipient) {
                    Some(conn) => delivered.push((conn, event)),
                    // No live connection: swallow, the party re-syncs on
                    // reconnect.
                    None => dropped += 1,
                }
            }
        }
        if dropped > 0 {
            let mut telemetry = self.world.resource_mut::<DispatchTelemetry>();
            telemetry.deliveries_dropped = telemetry.deliveries_dropped.saturating_add(dropped);
        }
        delivered
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
