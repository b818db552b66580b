//! Presence registry: the live mapping from party identities to connection
//! handles and driver entities, plus the cell index over driver positions.
//!
//! Registration is idempotent; re-registering an identity replaces the stored
//! connection so a reconnect with a fresh socket just works. Driver entities
//! survive disconnects (the driver is marked offline, location history kept);
//! rider entries are deleted on disconnect.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource};
use h3o::CellIndex;

use crate::outbox::Recipient;
use crate::parties::{ConnectionId, DriverId, RiderId};

/// What a connection was registered as, for disconnect handling.
#[derive(Debug, Clone, PartialEq)]
pub enum PartyRef {
    Rider(RiderId),
    Driver(DriverId),
}

#[derive(Debug, Default, Resource)]
pub struct PresenceRegistry {
    drivers: HashMap<DriverId, Entity>,
    driver_conns: HashMap<DriverId, ConnectionId>,
    riders: HashMap<RiderId, ConnectionId>,
    conn_parties: HashMap<ConnectionId, PartyRef>,
    drivers_by_cell: HashMap<CellIndex, Vec<Entity>>,
    driver_cell: HashMap<Entity, CellIndex>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a driver identity to its entity and (new) connection.
    pub fn bind_driver(&mut self, id: DriverId, entity: Entity, conn: ConnectionId) {
        if let Some(previous) = self.driver_conns.insert(id.clone(), conn) {
            self.conn_parties.remove(&previous);
        }
        self.drivers.insert(id.clone(), entity);
        self.conn_parties.insert(conn, PartyRef::Driver(id));
    }

    /// Bind a rider identity to its (new) connection.
    pub fn bind_rider(&mut self, id: RiderId, conn: ConnectionId) {
        if let Some(previous) = self.riders.insert(id.clone(), conn) {
            self.conn_parties.remove(&previous);
        }
        self.conn_parties.insert(conn, PartyRef::Rider(id));
    }

    pub fn driver_entity(&self, id: &DriverId) -> Option<Entity> {
        self.drivers.get(id).copied()
    }

    pub fn driver_conn(&self, id: &DriverId) -> Option<ConnectionId> {
        self.driver_conns.get(id).copied()
    }

    pub fn rider_conn(&self, id: &RiderId) -> Option<ConnectionId> {
        self.riders.get(id).copied()
    }

    pub fn party_for_conn(&self, conn: ConnectionId) -> Option<&PartyRef> {
        self.conn_parties.get(&conn)
    }

    /// Drop a driver's connection binding, keeping the entity registered.
    pub fn clear_driver_conn(&mut self, id: &DriverId) {
        if let Some(conn) = self.driver_conns.remove(id) {
            self.conn_parties.remove(&conn);
        }
    }

    /// Remove a rider entirely.
    pub fn remove_rider(&mut self, id: &RiderId) {
        if let Some(conn) = self.riders.remove(id) {
            self.conn_parties.remove(&conn);
        }
    }

    /// Move a driver entity to a new index cell.
    pub fn set_driver_cell(&mut self, entity: Entity, cell: CellIndex) {
        if let Some(old_cell) = self.driver_cell.get(&entity).copied() {
            if old_cell == cell {
                return;
            }
            if let Some(entities) = self.drivers_by_cell.get_mut(&old_cell) {
                entities.retain(|&e| e != entity);
                if entities.is_empty() {
                    self.drivers_by_cell.remove(&old_cell);
                }
            }
        }
        self.drivers_by_cell.entry(cell).or_default().push(entity);
        self.driver_cell.insert(entity, cell);
    }

    /// Driver entities indexed inside any of the given cells.
    pub fn drivers_in_cells(&self, cells: &[CellIndex]) -> Vec<Entity> {
        let mut result = Vec::new();
        for cell in cells {
            if let Some(entities) = self.drivers_by_cell.get(cell) {
                result.extend(entities.iter().copied());
            }
        }
        result
    }

    /// Current connection for a recipient, resolved at delivery time.
    pub fn resolve(&self, recipient: &Recipient) -> Option<ConnectionId> {
        match recipient {
            Recipient::Rider(id) => self.rider_conn(id),
            Recipient::Driver(id) => self.driver_conn(id),
            Recipient::Connection(conn) => Some(*conn),
        }
    }
}
