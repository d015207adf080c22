//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming lazy-module request
//!     → connection.rs (ConnectionId, tracker guard)
//!     → ConnectionLease (activate keys on open, release on drop)
//!     → lease moved into the response body; dropped when the socket closes
//! ```
//!
//! # Design Decisions
//! - Cleanup is tied to ownership (Drop), so it cannot fire twice
//! - Each connection tracked for observability and graceful shutdown

pub mod connection;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionLease, ConnectionTracker};
