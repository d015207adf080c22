//! Two-phase backend resolution.

use std::sync::Arc;

use tokio::sync::{Notify, OnceCell};

use crate::backend::{BackendError, LazyBackend};

/// A backend that is constructed now and becomes available later, once the
/// dev server has run its middleware setup.
#[derive(Debug, Default)]
pub struct PendingBackend {
    slot: OnceCell<Arc<LazyBackend>>,
    ready: Notify,
}

impl PendingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the backend. Only the first call succeeds.
    pub fn resolve(&self, backend: Arc<LazyBackend>) -> Result<(), BackendError> {
        self.slot
            .set(backend)
            .map_err(|_| BackendError::AlreadyInstalled)?;
        self.ready.notify_waiters();
        Ok(())
    }

    /// The backend, if already resolved.
    pub fn get(&self) -> Option<Arc<LazyBackend>> {
        self.slot.get().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.initialized()
    }

    /// Wait until the backend is resolved.
    pub async fn wait(&self) -> Arc<LazyBackend> {
        loop {
            // Register interest before checking, so a resolve in between is not missed.
            let notified = self.ready.notified();
            if let Some(backend) = self.get() {
                return backend;
            }
            notified.await;
        }
    }
}
