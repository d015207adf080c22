//! Backend adapter subsystem.
//!
//! # Data Flow
//! ```text
//! Setup:
//!     plugin apply → PendingBackend (unresolved)
//!     dev server "before middlewares" hook → LazyBackend installed → resolved
//!
//! Every compilation pass, per eligible module:
//!     describe(module) → waits for resolution
//!         → ModuleKey::encode(identifier)
//!         → registry.is_active(key)
//!         → ModuleInfo { client, data, active }
//!
//! Teardown:
//!     unmount endpoint → end open streams → clear registry
//! ```
//!
//! # Design Decisions
//! - Resolution is single-assignment; callers arriving early wait for it
//! - Teardown is idempotent

pub mod adapter;
pub mod pending;

use thiserror::Error;

pub use adapter::{client_entry, LazyBackend, ModuleInfo};
pub use pending::PendingBackend;

/// Errors raised while wiring the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend was already resolved by an earlier setup.
    #[error("lazy backend is already installed")]
    AlreadyInstalled,

    /// `public_url` could not be combined with the base URI.
    #[error("invalid public URL '{url}': {source}")]
    PublicUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
