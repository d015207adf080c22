//! Activation tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection opens with keys [k1..kn]
//!     → registry.rs activate(k) for each key
//!     → state.rs Used { ref_count } (new, shared or resumed)
//!
//! Client connection closes
//!     → registry.rs release(k) once per occurrence
//!     → Used(1) → Unused, recycle timer armed
//!     → timer fires → entry evicted → next build emits a stub
//!
//! Backend adapter (every compilation pass)
//!     → registry.rs is_active(k)
//! ```
//!
//! # Design Decisions
//! - The registry is the only writer of activation state
//! - Connections hold keys, never timers or counts
//! - At most one pending recycle timer per key, owned by its `Unused` state

pub mod registry;
pub mod state;

pub use registry::ActivationRegistry;
pub use state::{Activation, ActivationState, ModuleStatus, RecycleTimer, Release};
