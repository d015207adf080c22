//! The host's ordered middleware chain.
//!
//! # Responsibilities
//! - Hold named, path-prefixed middleware in dispatch order
//! - Let plugins insert ahead of the host's own handlers and remove
//!   themselves again on teardown
//! - Resolve a request path to the first mounted middleware
//!
//! # Design Decisions
//! - Reads are lock-free (`ArcSwap`); registration is rare and copies the list
//! - Removal is idempotent: removing an absent entry is not an error
//! - A mount path matches whole segments only (`/lazy` does not match `/lazyx`)

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::Router;

/// A named handler mounted under a path prefix.
#[derive(Clone)]
pub struct Middleware {
    pub name: String,
    pub path: String,
    pub service: Router,
}

impl Middleware {
    pub fn new(name: impl Into<String>, path: impl Into<String>, service: Router) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            service,
        }
    }

    /// Remainder of `path` below this mount point, always starting with `/`.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let mount = self.path.trim_end_matches('/');
        let rest = path.strip_prefix(mount)?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Shared, mutable middleware chain.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    entries: Arc<ArcSwap<Vec<Arc<Middleware>>>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `middleware` ahead of everything already registered.
    pub fn unshift(&self, middleware: Middleware) {
        let middleware = Arc::new(middleware);
        self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(Arc::clone(&middleware));
            next.extend(current.iter().cloned());
            next
        });
    }

    /// Append `middleware` after everything already registered.
    pub fn push(&self, middleware: Middleware) {
        let middleware = Arc::new(middleware);
        self.entries.rcu(|current| {
            let mut next = current.as_ref().clone();
            next.push(Arc::clone(&middleware));
            next
        });
    }

    /// Remove the middleware registered as `name`. Returns whether one was removed.
    pub fn remove(&self, name: &str) -> bool {
        let previous = self.entries.rcu(|current| {
            current
                .iter()
                .filter(|m| m.name != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|m| m.name == name)
    }

    /// Registered names, in dispatch order.
    pub fn names(&self) -> Vec<String> {
        self.entries.load().iter().map(|m| m.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.load().iter().any(|m| m.name == name)
    }

    /// First middleware mounted at or above `path`, with the path below the mount.
    pub fn resolve(&self, path: &str) -> Option<(Arc<Middleware>, String)> {
        self.entries.load().iter().find_map(|m| {
            m.strip(path)
                .map(|rest| (Arc::clone(m), rest.to_string()))
        })
    }
}

impl std::fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.load().iter()).finish()
    }
}
