//! Client connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count open lazy-module connections
//! - Tie a batch of activated keys to one connection and release them
//!   exactly once when it closes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::activation::ActivationRegistry;
use crate::codec::ModuleKey;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts open client connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let count = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_open_connections(count);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Current number of open connections.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let count = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_open_connections(count);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// The set of module references held by one open connection.
///
/// Opening the lease activates every key; dropping it releases every key,
/// once per occurrence. Because release happens in `Drop`, it runs exactly
/// once however the connection ends.
#[derive(Debug)]
pub struct ConnectionLease {
    guard: ConnectionGuard,
    registry: Arc<ActivationRegistry>,
    keys: Vec<ModuleKey>,
    newly_activated: bool,
}

impl ConnectionLease {
    /// Activate `keys` on behalf of a new connection.
    pub fn open(
        registry: Arc<ActivationRegistry>,
        tracker: &ConnectionTracker,
        keys: Vec<ModuleKey>,
    ) -> Self {
        let guard = tracker.track();
        let mut newly_activated = false;
        for key in &keys {
            newly_activated |= registry.activate(key).is_new();
        }

        tracing::debug!(
            connection_id = %guard.id(),
            modules = keys.len(),
            newly_activated,
            "Lazy connection opened"
        );

        Self {
            guard,
            registry,
            keys,
            newly_activated,
        }
    }

    /// Get the ID of the connection holding this lease.
    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }

    /// True if at least one key was not active before this connection.
    pub fn newly_activated(&self) -> bool {
        self.newly_activated
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        for key in &self.keys {
            self.registry.release(key);
        }
        tracing::debug!(
            connection_id = %self.guard.id(),
            modules = self.keys.len(),
            "Lazy connection closed"
        );
    }
}
