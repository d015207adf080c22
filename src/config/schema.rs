//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the lazy
//! compilation server. All types derive Serde traits for deserialization
//! from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DevLazyConfig {
    /// Dev server settings (bind address, project root).
    pub server: ServerConfig,

    /// Lazy compilation settings.
    pub lazy: LazyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Dev server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Project root used to resolve relative module patterns.
    pub context: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            context: PathBuf::from("."),
        }
    }
}

/// Module patterns deciding lazy eligibility: one glob or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TestPatterns {
    One(String),
    Many(Vec<String>),
}

impl TestPatterns {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let patterns: &[String] = match self {
            TestPatterns::One(pattern) => std::slice::from_ref(pattern),
            TestPatterns::Many(patterns) => patterns,
        };
        patterns.iter().map(String::as_str)
    }
}

/// Lazy compilation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LazyConfig {
    /// Compile entry modules lazily.
    pub entries: bool,

    /// Compile dynamically imported modules lazily.
    pub imports: bool,

    /// Eligibility patterns. Absent means every module.
    pub test: Option<TestPatterns>,

    /// Grace period before an unused module is dropped, in milliseconds.
    pub unused_timeout_ms: u64,

    /// Path prefix of the lazy endpoint, also handed to the runtime client.
    pub base_uri: String,

    /// Runtime client module the compiled stubs import.
    pub client: String,

    /// Public origin of the dev server, for clients served elsewhere.
    pub public_url: Option<String>,

    /// Interval between keep-alive comments on open streams (0 = off).
    pub heartbeat_ms: u64,
}

impl LazyConfig {
    pub fn unused_timeout(&self) -> Duration {
        Duration::from_millis(self.unused_timeout_ms)
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_ms > 0).then(|| Duration::from_millis(self.heartbeat_ms))
    }

    /// Mount path of the endpoint, e.g. `/dev-lazy`.
    pub fn base_path(&self) -> String {
        format!("/{}", self.base_uri.trim_matches('/'))
    }
}

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            entries: true,
            imports: true,
            test: None,
            unused_timeout_ms: 120_000,
            base_uri: "dev-lazy".to_string(),
            client: "dev-lazy/client.js".to_string(),
            public_url: None,
            heartbeat_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
