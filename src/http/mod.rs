//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (TCP_NODELAY)
//!     → server.rs (Axum setup, dispatch through the middleware stack)
//!     → middleware.rs (first mount matching the path, prefix stripped)
//!     → lazy.rs (decode key batch, open lease, invalidate host)
//!     → stream.rs (persistent event-stream body owning the lease)
//! ```

pub mod lazy;
pub mod middleware;
pub mod server;
pub mod stream;

pub use lazy::LazyEndpoint;
pub use middleware::{Middleware, MiddlewareStack};
pub use server::DevServer;
