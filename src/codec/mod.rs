//! Module key codec.
//!
//! # Data Flow
//! ```text
//! Module identifier (host build tool)
//!     → key.rs (normalize separators, percent-encode)
//!     → ModuleKey embedded in the compiled stub
//!
//! Incoming request path "/k1@k2@k3"
//!     → key.rs (split on '@', validate, canonicalize)
//!     → Vec<ModuleKey> handed to the activation registry
//! ```
//!
//! # Design Decisions
//! - Keys never contain the '@' delimiter ('@' is always escaped)
//! - Path-safe characters stay literal so keys remain readable in logs
//! - Parsing is all-or-nothing: one bad segment rejects the whole batch

pub mod key;

pub use key::{decode_batch, join_batch, KeyError, ModuleKey, KEY_DELIMITER, URI_COMPONENT};
