//! dev-lazy: standalone lazy compilation endpoint.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser runtime client
//!     ──────────────────────┐
//!                           ▼
//!                    ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//!                    │  DevServer  │───▶│ middleware   │───▶│    lazy     │
//!                    │ TCP_NODELAY │    │    stack     │    │  endpoint   │
//!                    └─────────────┘    └──────────────┘    └──────┬──────┘
//!                                                                  │ lease
//!                                                                  ▼
//!     Host compilation pass          ┌──────────────┐       ┌─────────────┐
//!     ──────────────────────────────▶│   backend    │──────▶│ activation  │
//!       is_lazy / describe           │   adapter    │       │  registry   │
//!                                    └──────────────┘       └─────────────┘
//! ```
//!
//! Without a real build tool attached, invalidations are only logged.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dev_lazy::config::{load_config, DevLazyConfig};
use dev_lazy::host::Compiler;
use dev_lazy::observability::{logging, metrics};
use dev_lazy::{DevLazy, DevServer, MiddlewareStack, Shutdown};

#[derive(Parser)]
#[command(name = "dev-lazy")]
#[command(about = "Lazy module compilation endpoint for development servers", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

/// Host stand-in that records rebuild requests instead of compiling.
struct StandaloneHost {
    context: PathBuf,
    rebuilds: AtomicU64,
}

impl Compiler for StandaloneHost {
    fn context(&self) -> &Path {
        &self.context
    }

    fn invalidate(&self) {
        let rebuild = self.rebuilds.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(rebuild, "Build invalidated");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DevLazyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("dev-lazy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let host = Arc::new(StandaloneHost {
        context: config.server.context.clone(),
        rebuilds: AtomicU64::new(0),
    });
    let lazy = DevLazy::new(config.lazy.clone()).apply(host)?;

    let stack = MiddlewareStack::new();
    lazy.install(&stack)?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        base_uri = %config.lazy.base_uri,
        "Listening for lazy module connections"
    );

    let shutdown = Shutdown::new();
    let server = tokio::spawn(DevServer::new(stack).run(listener, shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    lazy.teardown().await;
    shutdown.trigger();
    server.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
