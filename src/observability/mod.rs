//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, connection handler, backend:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stderr (fmt subscriber, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Module keys and connection IDs are structured fields, not message text
//! - Metrics are recorded unconditionally; without an installed recorder
//!   the facade discards them

pub mod logging;
pub mod metrics;
