//! The backend the host's lazy-compilation extension point talks to.
//!
//! # Responsibilities
//! - Describe a module: its key, whether it is active, and the client
//!   bootstrap reference its stub should load
//! - Unmount the endpoint and drop activation state on teardown

use std::sync::Arc;

use percent_encoding::utf8_percent_encode;

use crate::activation::ActivationRegistry;
use crate::backend::BackendError;
use crate::codec::{ModuleKey, URI_COMPONENT};
use crate::config::LazyConfig;
use crate::host::Module;
use crate::http::MiddlewareStack;
use crate::lifecycle::Shutdown;

/// What the host needs to compile one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Runtime client reference the stub imports, carrying the endpoint.
    pub client: String,
    /// The module's key, sent back by the client when it connects.
    pub data: ModuleKey,
    /// Compile for real (true) or emit a stub (false).
    pub active: bool,
}

/// Build the client bootstrap reference for `config`.
///
/// The endpoint is `"{base_uri}/"`, joined onto `public_url` when the
/// runtime client is served from a different origin. Every stub shares it;
/// each appends its own key.
pub fn client_entry(config: &LazyConfig) -> Result<String, BackendError> {
    let mut endpoint = format!("{}/", config.base_uri.trim_matches('/'));
    if let Some(public_url) = &config.public_url {
        let to_backend_error = |source| BackendError::PublicUrl {
            url: public_url.clone(),
            source,
        };
        endpoint = url::Url::parse(public_url)
            .and_then(|base| base.join(&endpoint))
            .map_err(to_backend_error)?
            .to_string();
    }
    Ok(format!(
        "{}?baseUri={}",
        config.client,
        utf8_percent_encode(&endpoint, URI_COMPONENT)
    ))
}

/// Installed lazy-compilation backend.
#[derive(Debug)]
pub struct LazyBackend {
    registry: Arc<ActivationRegistry>,
    client: String,
    stack: MiddlewareStack,
    middleware_name: String,
    shutdown: Shutdown,
}

impl LazyBackend {
    pub fn new(
        registry: Arc<ActivationRegistry>,
        client: String,
        stack: MiddlewareStack,
        middleware_name: impl Into<String>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            registry,
            client,
            stack,
            middleware_name: middleware_name.into(),
            shutdown,
        }
    }

    /// Describe `module` for the current compilation pass.
    pub fn describe(&self, module: &dyn Module) -> ModuleInfo {
        let data = ModuleKey::encode(&module.identifier());
        let active = self.registry.is_active(&data);
        tracing::trace!(key = %data, active, "Describing lazy module");
        ModuleInfo {
            client: self.client.clone(),
            data,
            active,
        }
    }

    pub fn registry(&self) -> &Arc<ActivationRegistry> {
        &self.registry
    }

    /// Unmount the endpoint, end open streams and forget all modules.
    ///
    /// Safe to call more than once.
    pub fn teardown(&self) {
        let removed = self.stack.remove(&self.middleware_name);
        self.shutdown.trigger();
        self.registry.clear();
        tracing::info!(
            middleware = %self.middleware_name,
            removed,
            "Lazy compilation backend disposed"
        );
    }
}
