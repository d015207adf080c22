//! Lazy module compilation for a development build server.
//!
//! Modules are compiled as small stubs until a browser actually loads them.
//! A loaded stub opens a long-lived connection naming its module; the first
//! such connection marks the module active and asks the host to rebuild it
//! for real. When the last connection closes, the module is dropped again
//! after a grace period.

pub mod activation;
pub mod backend;
pub mod codec;
pub mod config;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod plugin;
pub mod selection;

pub use activation::ActivationRegistry;
pub use backend::{LazyBackend, ModuleInfo};
pub use codec::ModuleKey;
pub use config::schema::{DevLazyConfig, LazyConfig};
pub use host::{Compiler, Module, ModuleOrigin, SourceModule};
pub use http::{DevServer, MiddlewareStack};
pub use lifecycle::Shutdown;
pub use plugin::{DevLazy, LazyCompilation};
