//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DevLazyConfig (validated, immutable)
//!     → LazyConfig handed to the plugin at setup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the registry timeout is fixed at setup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{DevLazyConfig, LazyConfig, ObservabilityConfig, ServerConfig, TestPatterns};
pub use validation::{validate_config, ValidationError};
