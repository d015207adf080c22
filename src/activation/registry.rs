//! Concurrent store of module activation state.
//!
//! # Responsibilities
//! - Map module keys to `Used`/`Unused` state
//! - Reference count live connections per key
//! - Arm, cancel and fire recycle timers
//!
//! # Design Decisions
//! - Each operation runs entirely under the map's entry lock for its key,
//!   so operations on one key are strictly ordered
//! - Timer tasks hold a `Weak` back-reference and an epoch; a timer only
//!   evicts the exact `Unused` entry that armed it

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::activation::state::{Activation, ActivationState, ModuleStatus, RecycleTimer, Release};
use crate::codec::ModuleKey;
use crate::observability::metrics;

/// Registry of active modules, shared between the connection handler and
/// the backend adapter.
#[derive(Debug)]
pub struct ActivationRegistry {
    modules: DashMap<ModuleKey, ActivationState>,
    unused_timeout: Duration,
    next_epoch: AtomicU64,
}

impl ActivationRegistry {
    /// Create an empty registry evicting unused modules after `unused_timeout`.
    pub fn new(unused_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            modules: DashMap::new(),
            unused_timeout,
            next_epoch: AtomicU64::new(1),
        })
    }

    /// True if the module should be compiled for real.
    ///
    /// `Unused` entries still count: the module stays compiled during its
    /// grace period.
    pub fn is_active(&self, key: &ModuleKey) -> bool {
        self.modules.contains_key(key)
    }

    /// Current state of a key, if present.
    pub fn status(&self, key: &ModuleKey) -> Option<ModuleStatus> {
        self.modules.get(key).map(|state| state.status())
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Record one more live reference to `key`.
    pub fn activate(&self, key: &ModuleKey) -> Activation {
        let activation = match self.modules.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(ActivationState::used());
                Activation::New
            }
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                ActivationState::Used { ref_count } => {
                    *ref_count = ref_count.saturating_add(1);
                    Activation::Shared {
                        ref_count: ref_count.get(),
                    }
                }
                ActivationState::Unused { .. } => {
                    // Replacing the state drops the timer, which aborts it.
                    occupied.insert(ActivationState::used());
                    Activation::Resumed
                }
            },
        };

        match activation {
            Activation::New => {
                tracing::info!(key = %key, "Module is now in use and will be compiled");
            }
            Activation::Resumed => {
                tracing::debug!(key = %key, "Module reactivated, eviction cancelled");
            }
            Activation::Shared { ref_count } => {
                tracing::trace!(key = %key, ref_count, "Module reference added");
            }
        }
        metrics::record_activation(activation.as_str());
        metrics::record_active_modules(self.len());
        activation
    }

    /// Drop one live reference to `key`.
    ///
    /// Releasing a key that is absent or already unused is a no-op, which
    /// makes duplicate close events harmless.
    ///
    /// # Panics
    /// Arming the recycle timer spawns a task, so the last release of a key
    /// must happen inside a tokio runtime.
    pub fn release(self: &Arc<Self>, key: &ModuleKey) -> Release {
        let Some(mut state) = self.modules.get_mut(key) else {
            tracing::debug!(key = %key, "Ignoring release of unknown module");
            return Release::Ignored;
        };

        let release = match &mut *state {
            ActivationState::Used { ref_count } => match NonZeroU32::new(ref_count.get() - 1) {
                Some(remaining) => {
                    *ref_count = remaining;
                    Release::Retained {
                        ref_count: remaining.get(),
                    }
                }
                None => {
                    *state = ActivationState::Unused {
                        recycle: self.arm_recycle(key.clone()),
                    };
                    Release::Parked
                }
            },
            ActivationState::Unused { .. } => Release::Ignored,
        };
        drop(state);

        match release {
            Release::Parked => tracing::debug!(
                key = %key,
                timeout_ms = self.unused_timeout.as_millis() as u64,
                "Module unused, eviction scheduled"
            ),
            Release::Retained { ref_count } => {
                tracing::trace!(key = %key, ref_count, "Module reference dropped");
            }
            Release::Ignored => tracing::debug!(key = %key, "Ignoring release of unused module"),
        }
        release
    }

    /// Drop every entry, cancelling all pending recycle timers.
    pub fn clear(&self) {
        self.modules.clear();
        metrics::record_active_modules(0);
    }

    fn arm_recycle(self: &Arc<Self>, key: ModuleKey) -> RecycleTimer {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let registry: Weak<Self> = Arc::downgrade(self);
        let timeout = self.unused_timeout;

        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(registry) = registry.upgrade() {
                registry.recycle(&key, epoch);
            }
        });
        RecycleTimer::new(epoch, task.abort_handle())
    }

    /// Evict `key` if it is still the `Unused` entry armed at `epoch`.
    fn recycle(&self, key: &ModuleKey, epoch: u64) {
        let evicted = self.modules.remove_if(key, |_, state| {
            matches!(state, ActivationState::Unused { recycle } if recycle.epoch() == epoch)
        });

        if evicted.is_some() {
            tracing::info!(
                key = %key,
                "Module is no longer in use. Next compilation will skip this module"
            );
            metrics::record_eviction();
            metrics::record_active_modules(self.len());
        }
    }
}
