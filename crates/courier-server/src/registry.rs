//! Connection registry.
//!
//! Maps connection IDs to live transport handles so broadcast actions can
//! fan out. The registry is mutated only while the shared driver mutex is
//! held, which keeps it consistent with the broadcaster's session set.

use std::collections::HashMap;

use crate::transport::QuinnConnection;

/// Live transport connections keyed by connection ID.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<u64, QuinnConnection>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its ID.
    pub fn insert(&mut self, conn_id: u64, conn: QuinnConnection) {
        if self.connections.insert(conn_id, conn).is_some() {
            tracing::warn!(conn_id, "connection ID collision in registry");
        }
    }

    /// Deregister a connection. Idempotent.
    pub fn remove(&mut self, conn_id: u64) {
        self.connections.remove(&conn_id);
    }

    /// Look up a single connection.
    pub fn get(&self, conn_id: u64) -> Option<&QuinnConnection> {
        self.connections.get(&conn_id)
    }

    /// Iterate over all live connections.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &QuinnConnection)> {
        self.connections.iter().map(|(id, conn)| (*id, conn))
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.connections.len())
            .finish()
    }
}
