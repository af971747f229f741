//! Fan-out of server events to live connections
//!
//! Each accepted socket is represented by a [`ClientConnection`]: a bounded
//! queue drained by that socket's writer task. Broadcasting encodes the
//! event once and pushes it into every queue without waiting, so one slow
//! or broken socket never holds up the others.

use crate::session::Notification;
use log::{debug, warn};
use neon_shared::ServerEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Lifetime drops after which a connection is considered dead
pub const MAX_DROPS: u64 = 100;

/// Outbound queue capacity per connection
pub const SEND_QUEUE_CAPACITY: usize = 256;

/// Handle used by the event loop to reach one socket
#[derive(Debug)]
pub struct ClientConnection {
    pub id: String,
    tx: mpsc::Sender<Arc<String>>,
    dropped: u64,
}

impl ClientConnection {
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self { id, tx, dropped: 0 }
    }

    /// Queues a frame without waiting. Returns false if it was dropped.
    pub fn send(&mut self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped
    }
}

impl From<Notification> for ServerEvent {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::PlayersUpdated(roster) => ServerEvent::UpdatePlayers(roster),
            Notification::Spawned(spawn) => ServerEvent::Spawn(spawn),
            Notification::Ended(result) => ServerEvent::End(result),
        }
    }
}

/// Every connection that is currently open and admitted to the room
///
/// Only the event loop touches this set, in the same step as the matching
/// session update, so a broadcast always sees a consistent membership.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    connections: HashMap<String, ClientConnection>,
    /// Connections dropped for falling behind, not yet reported to the session
    released: Vec<String>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, connection: ClientConnection) {
        self.connections.insert(connection.id.clone(), connection);
    }

    /// Releases a connection handle. Dropping the last sender closes the
    /// writer task, which closes the socket.
    pub fn remove(&mut self, id: &str) -> bool {
        self.connections.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Sends one event to a single connection
    pub fn send_to(&mut self, id: &str, event: &ServerEvent) -> bool {
        let Some(frame) = encode(event) else {
            return false;
        };

        match self.connections.get_mut(id) {
            Some(connection) => connection.send(frame),
            None => false,
        }
    }

    /// Sends one event to every connection
    ///
    /// Returns the number of connections that accepted it. Connections that
    /// exceeded [`MAX_DROPS`] are released and queued for [`take_released`].
    ///
    /// [`take_released`]: ConnectionSet::take_released
    pub fn broadcast(&mut self, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for connection in self.connections.values_mut() {
            if connection.send(Arc::clone(&frame)) {
                delivered += 1;
            } else if connection.drop_count() >= MAX_DROPS {
                warn!(
                    "Releasing connection {} after {} dropped frames",
                    connection.id,
                    connection.drop_count()
                );
                dead.push(connection.id.clone());
            } else {
                warn!(
                    "Dropped {} for connection {} ({} total)",
                    event.name(),
                    connection.id,
                    connection.drop_count()
                );
            }
        }

        for id in dead {
            self.connections.remove(&id);
            self.released.push(id);
        }

        debug!("Broadcast {} to {} connections", event.name(), delivered);
        delivered
    }

    /// Broadcasts session notifications in order
    ///
    /// Returns the ids released along the way. Their sockets may stay open,
    /// so the caller must remove them from the session itself.
    pub fn dispatch(&mut self, notifications: Vec<Notification>) -> Vec<String> {
        for notification in notifications {
            self.broadcast(&ServerEvent::from(notification));
        }
        self.take_released()
    }

    pub fn take_released(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released)
    }
}

fn encode(event: &ServerEvent) -> Option<Arc<String>> {
    match event.encode() {
        Ok(text) => Some(Arc::new(text)),
        Err(e) => {
            warn!("Failed to encode {}: {}", event.name(), e);
            None
        }
    }
}
