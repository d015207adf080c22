//! Plugin entry point wiring lazy compilation into a host build.
//!
//! # Data Flow
//! ```text
//! DevLazy::new(config)
//!     → apply(compiler)      selection + registry + pending backend
//!     → install(&stack)      endpoint mounted, backend resolved
//!     → is_lazy / describe   once per module, every compilation pass
//!     → teardown             endpoint unmounted, streams ended, registry cleared
//! ```

use std::sync::Arc;

use crate::activation::ActivationRegistry;
use crate::backend::{client_entry, BackendError, LazyBackend, ModuleInfo, PendingBackend};
use crate::config::LazyConfig;
use crate::host::{Compiler, Module, ModuleOrigin};
use crate::http::{LazyEndpoint, Middleware, MiddlewareStack};
use crate::lifecycle::Shutdown;
use crate::net::ConnectionTracker;
use crate::selection::{Selection, SelectionError};

/// Name the endpoint is registered under in the middleware stack.
pub const PLUGIN_NAME: &str = "dev-lazy";

/// Lazy compilation plugin, before it is applied to a compiler.
#[derive(Debug, Clone)]
pub struct DevLazy {
    config: LazyConfig,
    predicate: Option<Selection>,
}

impl DevLazy {
    /// Plugin selecting modules by `config.test` (all modules if unset).
    pub fn new(config: LazyConfig) -> Self {
        Self {
            config,
            predicate: None,
        }
    }

    /// Plugin selecting modules with `predicate`; `config.test` is ignored.
    pub fn with_predicate<F>(config: LazyConfig, predicate: F) -> Self
    where
        F: Fn(&dyn Module) -> bool + Send + Sync + 'static,
    {
        Self {
            config,
            predicate: Some(Selection::predicate(predicate)),
        }
    }

    /// Attach to `compiler`. The backend stays pending until `install`.
    pub fn apply(self, compiler: Arc<dyn Compiler>) -> Result<LazyCompilation, SelectionError> {
        let selection = match self.predicate {
            Some(selection) => selection,
            None => Selection::from_patterns(self.config.test.as_ref(), compiler.context())?,
        };
        let registry = ActivationRegistry::new(self.config.unused_timeout());

        tracing::info!(
            base_uri = %self.config.base_uri,
            unused_timeout_ms = self.config.unused_timeout_ms,
            entries = self.config.entries,
            imports = self.config.imports,
            selection = ?selection,
            "Lazy compilation enabled"
        );

        Ok(LazyCompilation {
            config: self.config,
            compiler,
            selection,
            registry,
            backend: Arc::new(PendingBackend::new()),
            connections: ConnectionTracker::new(),
            streams: Shutdown::new(),
        })
    }
}

/// Lazy compilation attached to one compiler.
pub struct LazyCompilation {
    config: LazyConfig,
    compiler: Arc<dyn Compiler>,
    selection: Selection,
    registry: Arc<ActivationRegistry>,
    backend: Arc<PendingBackend>,
    connections: ConnectionTracker,
    streams: Shutdown,
}

impl LazyCompilation {
    /// Mount the connection endpoint ahead of the host's middleware and
    /// resolve the backend. Only the first call succeeds.
    pub fn install(&self, stack: &MiddlewareStack) -> Result<(), BackendError> {
        let backend = LazyBackend::new(
            Arc::clone(&self.registry),
            client_entry(&self.config)?,
            stack.clone(),
            PLUGIN_NAME,
            self.streams.clone(),
        );
        self.backend.resolve(Arc::new(backend))?;

        let endpoint = LazyEndpoint {
            registry: Arc::clone(&self.registry),
            compiler: Arc::clone(&self.compiler),
            connections: self.connections.clone(),
            shutdown: self.streams.clone(),
            heartbeat: self.config.heartbeat(),
        };
        let path = self.config.base_path();
        stack.unshift(Middleware::new(PLUGIN_NAME, path.clone(), endpoint.router()));

        tracing::info!(path = %path, "Lazy compilation endpoint mounted");
        Ok(())
    }

    /// True if `module` loaded as `origin` should be compiled lazily.
    pub fn is_lazy(&self, module: &dyn Module, origin: ModuleOrigin) -> bool {
        let enabled = match origin {
            ModuleOrigin::Entry => self.config.entries,
            ModuleOrigin::Import => self.config.imports,
        };
        enabled && self.selection.is_eligible(module)
    }

    /// Describe `module`, waiting for `install` if it has not run yet.
    pub async fn describe(&self, module: &dyn Module) -> ModuleInfo {
        self.backend.wait().await.describe(module)
    }

    /// Dispose the backend, waiting for `install` if it has not run yet.
    pub async fn teardown(&self) {
        self.backend.wait().await.teardown();
    }

    /// Activation state shared with the endpoint.
    pub fn registry(&self) -> &Arc<ActivationRegistry> {
        &self.registry
    }

    /// Connections currently holding module references.
    pub fn open_connections(&self) -> u64 {
        self.connections.active_count()
    }
}

impl std::fmt::Debug for LazyCompilation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCompilation")
            .field("config", &self.config)
            .field("selection", &self.selection)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ModuleKey;
    use crate::config::TestPatterns;
    use crate::host::SourceModule;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestCompiler {
        context: PathBuf,
        invalidations: AtomicUsize,
    }

    impl TestCompiler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                context: PathBuf::from("/app"),
                invalidations: AtomicUsize::new(0),
            })
        }
    }

    impl Compiler for TestCompiler {
        fn context(&self) -> &Path {
            &self.context
        }

        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_origin_gates_selection() {
        let config = LazyConfig {
            entries: false,
            ..LazyConfig::default()
        };
        let lazy = DevLazy::new(config).apply(TestCompiler::new()).unwrap();
        let module = SourceModule::from_path("/app/src/a.js");

        assert!(!lazy.is_lazy(&module, ModuleOrigin::Entry));
        assert!(lazy.is_lazy(&module, ModuleOrigin::Import));
    }

    #[test]
    fn test_patterns_resolve_against_compiler_context() {
        let config = LazyConfig {
            test: Some(TestPatterns::Many(vec![
                "src/**".to_string(),
                "!src/vendor/**".to_string(),
            ])),
            ..LazyConfig::default()
        };
        let lazy = DevLazy::new(config).apply(TestCompiler::new()).unwrap();

        let selected = SourceModule::from_path("/app/src/pages/home.js");
        let negated = SourceModule::from_path("/app/src/vendor/lib.js");
        let outside = SourceModule::from_path("/app/node_modules/x/index.js");
        assert!(lazy.is_lazy(&selected, ModuleOrigin::Import));
        assert!(!lazy.is_lazy(&negated, ModuleOrigin::Import));
        assert!(!lazy.is_lazy(&outside, ModuleOrigin::Import));
    }

    #[test]
    fn test_invalid_pattern_fails_apply() {
        let config = LazyConfig {
            test: Some(TestPatterns::One("src/[".to_string())),
            ..LazyConfig::default()
        };
        assert!(matches!(
            DevLazy::new(config).apply(TestCompiler::new()),
            Err(SelectionError::Pattern { .. })
        ));
    }

    #[test]
    fn test_predicate_overrides_patterns() {
        let config = LazyConfig {
            test: Some(TestPatterns::One("nothing/**".to_string())),
            ..LazyConfig::default()
        };
        let lazy = DevLazy::with_predicate(config, |module| module.identifier().ends_with(".js"))
            .apply(TestCompiler::new())
            .unwrap();

        assert!(lazy.is_lazy(&SourceModule::from_path("/app/a.js"), ModuleOrigin::Entry));
        assert!(!lazy.is_lazy(&SourceModule::from_path("/app/a.css"), ModuleOrigin::Entry));
    }

    #[tokio::test]
    async fn test_install_mounts_endpoint_once() {
        let lazy = DevLazy::new(LazyConfig::default())
            .apply(TestCompiler::new())
            .unwrap();
        let stack = MiddlewareStack::new();

        lazy.install(&stack).unwrap();
        assert_eq!(stack.names(), vec![PLUGIN_NAME.to_string()]);
        assert!(stack.resolve("/dev-lazy/src%2Fa.js").is_some());

        assert!(matches!(
            lazy.install(&stack),
            Err(BackendError::AlreadyInstalled)
        ));
        assert_eq!(stack.names().len(), 1);
    }

    #[tokio::test]
    async fn test_describe_waits_for_install() {
        let lazy = Arc::new(
            DevLazy::new(LazyConfig::default())
                .apply(TestCompiler::new())
                .unwrap(),
        );
        let describe = tokio::spawn({
            let lazy = Arc::clone(&lazy);
            async move {
                let module = SourceModule::from_path("/app/src/a.js");
                lazy.describe(&module).await
            }
        });
        tokio::task::yield_now().await;
        assert!(!describe.is_finished());

        lazy.install(&MiddlewareStack::new()).unwrap();
        let info = tokio::time::timeout(Duration::from_secs(1), describe)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.data, ModuleKey::encode("/app/src/a.js"));
        assert!(!info.active);
        assert_eq!(info.client, "dev-lazy/client.js?baseUri=dev-lazy%2F");
    }

    #[tokio::test]
    async fn test_teardown_unmounts_and_clears() {
        let lazy = DevLazy::new(LazyConfig::default())
            .apply(TestCompiler::new())
            .unwrap();
        let stack = MiddlewareStack::new();
        lazy.install(&stack).unwrap();

        let key = ModuleKey::encode("/app/src/a.js");
        lazy.registry().activate(&key);
        lazy.teardown().await;
        lazy.teardown().await;

        assert!(stack.names().is_empty());
        assert!(lazy.registry().is_empty());
    }
}
