//! Recipient-addressed notification buffer.
//!
//! Systems address parties, never connection handles; the engine resolves the
//! current connection through the presence registry when it drains the
//! buffer, so a reconnect between emission and delivery is harmless.

use bevy_ecs::prelude::Resource;

use crate::events::ServerEvent;
use crate::parties::{ConnectionId, DriverId, RiderId};

#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    Rider(RiderId),
    Driver(DriverId),
    Connection(ConnectionId),
}

#[derive(Debug, Default, Resource)]
pub struct Outbox {
    queued: Vec<(Recipient, ServerEvent)>,
}

impl Outbox {
    pub fn send(&mut self, to: Recipient, event: ServerEvent) {
        self.queued.push((to, event));
    }

    pub fn drain(&mut self) -> Vec<(Recipient, ServerEvent)> {
        std::mem::take(&mut self.queued)
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}
