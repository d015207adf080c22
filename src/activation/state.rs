//! Activation state machine for a single module key.
//!
//! # States
//! - Used: at least one live connection references the module
//! - Unused: no live connection; a recycle timer will evict the entry
//!
//! # State Transitions
//! ```text
//! (absent) → Used(1):        first activation, triggers a rebuild
//! Used(n)  → Used(n + 1):    another connection references the module
//! Unused   → Used(1):        reactivated within the grace period, timer cancelled
//! Used(n)  → Used(n - 1):    a connection closed, n > 1
//! Used(1)  → Unused:         last connection closed, timer armed
//! Unused   → (absent):       timer fired
//! ```

use std::num::NonZeroU32;

use tokio::task::AbortHandle;

/// Pending eviction of an `Unused` entry.
///
/// Dropping the timer aborts the underlying task, so an entry leaving the
/// `Unused` state always takes its timer with it.
#[derive(Debug)]
pub struct RecycleTimer {
    epoch: u64,
    handle: AbortHandle,
}

impl RecycleTimer {
    pub(crate) fn new(epoch: u64, handle: AbortHandle) -> Self {
        Self { epoch, handle }
    }

    /// Identifies the arming that created this timer.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for RecycleTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// State held by the registry for one module key.
#[derive(Debug)]
pub enum ActivationState {
    /// Referenced by `ref_count` live connections.
    Used { ref_count: NonZeroU32 },
    /// Referenced by nobody; evicted when `recycle` fires.
    Unused { recycle: RecycleTimer },
}

impl ActivationState {
    /// A freshly referenced module.
    pub fn used() -> Self {
        ActivationState::Used {
            ref_count: NonZeroU32::MIN,
        }
    }

    /// Handle-free view of this state.
    pub fn status(&self) -> ModuleStatus {
        match self {
            ActivationState::Used { ref_count } => ModuleStatus::Used {
                ref_count: ref_count.get(),
            },
            ActivationState::Unused { .. } => ModuleStatus::Unused,
        }
    }
}

/// Snapshot of a module's activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Used { ref_count: u32 },
    Unused,
}

/// Outcome of [`ActivationRegistry::activate`](super::ActivationRegistry::activate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The key was absent; the module must now be compiled for real.
    New,
    /// The key was already in use by another connection.
    Shared { ref_count: u32 },
    /// The key was waiting for eviction; its timer was cancelled.
    Resumed,
}

impl Activation {
    /// True when the host has to rebuild to pick the module up.
    pub fn is_new(&self) -> bool {
        matches!(self, Activation::New)
    }

    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::New => "new",
            Activation::Shared { .. } => "shared",
            Activation::Resumed => "resumed",
        }
    }
}

/// Outcome of [`ActivationRegistry::release`](super::ActivationRegistry::release).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other connections still reference the module.
    Retained { ref_count: u32 },
    /// The last reference went away; the recycle timer is armed.
    Parked,
    /// The key was absent or already unused. Nothing changed.
    Ignored,
}
