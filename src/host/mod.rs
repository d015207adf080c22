//! Interfaces consumed from the host build tool.
//!
//! # Data Flow
//! ```text
//! Host compilation pass
//!     → Module (identity, condition name) → selection + backend adapter
//!
//! Lazy connection activates an unseen module
//!     → Compiler::invalidate() → host rebuilds → describe() reports active
//! ```

use std::path::{Path, PathBuf};

/// The host's compilation and watch engine.
pub trait Compiler: Send + Sync {
    /// Project root that relative module paths are resolved against.
    fn context(&self) -> &Path;

    /// Invalidate the current watch state so the next pass recompiles.
    fn invalidate(&self);
}

/// A module as seen by the host's module graph.
pub trait Module: Send + Sync {
    /// Unique, stable identity of the module (resource plus loaders, query, ...).
    fn identifier(&self) -> String;

    /// Path used for condition matching, if the module has one.
    fn name_for_condition(&self) -> Option<String>;
}

/// Why a module is being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// An entry point of the build.
    Entry,
    /// The target of a dynamic `import()`.
    Import,
}

/// A plain file-backed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceModule {
    identifier: String,
    resource: Option<PathBuf>,
}

impl SourceModule {
    /// Module whose identifier is its resource path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let resource = path.into();
        Self {
            identifier: resource.to_string_lossy().into_owned(),
            resource: Some(resource),
        }
    }

    /// Module with an identifier that differs from its resource, or has none.
    pub fn new(identifier: impl Into<String>, resource: Option<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            resource,
        }
    }
}

impl Module for SourceModule {
    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn name_for_condition(&self) -> Option<String> {
        self.resource
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
    }
}
