//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dev_lazy::codec::{join_batch, ModuleKey};
use dev_lazy::config::LazyConfig;
use dev_lazy::host::Compiler;
use dev_lazy::{DevLazy, DevServer, LazyCompilation, MiddlewareStack, Shutdown};
use tokio::net::TcpListener;

/// Host stand-in counting rebuild requests.
pub struct RecordingCompiler {
    context: PathBuf,
    invalidations: AtomicUsize,
}

impl RecordingCompiler {
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl Compiler for RecordingCompiler {
    fn context(&self) -> &Path {
        &self.context
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// A dev server with lazy compilation installed, on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub lazy: Arc<LazyCompilation>,
    pub compiler: Arc<RecordingCompiler>,
    pub stack: MiddlewareStack,
    shutdown: Shutdown,
}

impl TestServer {
    /// Start with short timeouts suited to tests.
    pub async fn start() -> Self {
        Self::start_with(LazyConfig {
            unused_timeout_ms: 300,
            heartbeat_ms: 50,
            ..LazyConfig::default()
        })
        .await
    }

    pub async fn start_with(config: LazyConfig) -> Self {
        let compiler = Arc::new(RecordingCompiler {
            context: PathBuf::from("/app"),
            invalidations: AtomicUsize::new(0),
        });
        let lazy = DevLazy::new(config).apply(compiler.clone()).unwrap();
        let stack = MiddlewareStack::new();
        lazy.install(&stack).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        tokio::spawn(DevServer::new(stack.clone()).run(listener, shutdown.clone()));

        Self {
            addr,
            lazy: Arc::new(lazy),
            compiler,
            stack,
            shutdown,
        }
    }

    /// URL a runtime client requests for `identifiers`.
    pub fn url_for(&self, identifiers: &[&str]) -> String {
        let keys: Vec<ModuleKey> = identifiers.iter().map(|id| ModuleKey::encode(id)).collect();
        format!("http://{}/dev-lazy{}", self.addr, join_batch(&keys))
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Client that never reuses connections, so dropping a response closes its socket.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting until {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
