//! Shared application state: the engine behind its mutex, the connection
//! writer table, and the monotonic gateway clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use dashmap::DashMap;
use dispatch_core::commands::ClientCommand;
use dispatch_core::config::EngineConfig;
use dispatch_core::engine::Engine;
use dispatch_core::events::ServerEvent;
use dispatch_core::parties::ConnectionId;
use tokio::sync::mpsc::UnboundedSender;

pub struct AppState {
    engine: Mutex<Engine>,
    /// Writer half of every live socket, keyed by connection id.
    conns: DashMap<ConnectionId, UnboundedSender<ServerEvent>>,
    started: Instant,
    conn_seq: AtomicU64,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Mutex::new(Engine::new(config)),
            conns: DashMap::new(),
            started: Instant::now(),
            conn_seq: AtomicU64::new(1),
        }
    }

    /// Milliseconds since the gateway started; the engine's time base.
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn next_conn_id(&self) -> ConnectionId {
        ConnectionId(self.conn_seq.fetch_add(1, Ordering::Relaxed))
    }

    pub fn attach(&self, conn: ConnectionId, sender: UnboundedSender<ServerEvent>) {
        self.conns.insert(conn, sender);
    }

    pub fn detach(&self, conn: ConnectionId) {
        self.conns.remove(&conn);
    }

    /// Run one command through the engine and fan its output out.
    pub fn apply(&self, command: ClientCommand) {
        let batch = {
            let mut engine = self.lock_engine();
            engine.apply(self.now_ms(), command)
        };
        self.fan_out(batch);
    }

    /// Drive the engine's timers up to the present.
    pub fn tick(&self) {
        let batch = {
            let mut engine = self.lock_engine();
            engine.tick(self.now_ms())
        };
        self.fan_out(batch);
    }

    fn lock_engine(&self) -> std::sync::MutexGuard<'_, Engine> {
        match self.engine.lock() {
            Ok(guard) => guard,
            // A panicked handler never leaves the engine mid-mutation: every
            // mutation happens inside one schedule run, so keep going.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn fan_out(&self, batch: Vec<(ConnectionId, ServerEvent)>) {
        for (conn, event) in batch {
            if let Some(sender) = self.conns.get(&conn) {
                if sender.send(event).is_err() {
                    tracing::debug!(conn = conn.0, "dropping event for closed writer");
                }
            } else {
                tracing::debug!(conn = conn.0, "dropping event for unknown connection");
            }
        }
    }

    /// Deliver one event to one connection (gateway-local errors).
    pub fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        self.fan_out(vec![(conn, event)]);
    }
}
