//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl-C / backend teardown
//!     → shutdown.rs trigger
//!     → open event streams end (leases drop, keys released)
//!     → server stops accepting and drains
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
