//! Lazy-eligibility selection.
//!
//! # Data Flow
//! ```text
//! Module (from host)
//!     → Selection::is_eligible
//!         All        → true
//!         Patterns   → matcher.rs (globs over path spellings)
//!         Predicate  → caller-supplied closure
//! ```
//!
//! # Design Decisions
//! - Exactly one mode per setup
//! - Pattern mode never selects a module without a condition name

pub mod matcher;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::TestPatterns;
use crate::host::Module;

pub use matcher::PatternMatcher;

/// Caller-supplied eligibility test.
pub type ModulePredicate = Arc<dyn Fn(&dyn Module) -> bool + Send + Sync>;

/// Errors raised while building a selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("invalid module pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Decides which modules are compiled lazily.
#[derive(Clone)]
pub enum Selection {
    /// Every module is eligible.
    All,
    /// Modules whose path matches the pattern list.
    Patterns(PatternMatcher),
    /// Modules accepted by a caller-supplied predicate.
    Predicate(ModulePredicate),
}

impl Selection {
    /// Build a selection from configured patterns; `None` selects everything.
    pub fn from_patterns(
        patterns: Option<&TestPatterns>,
        context: &Path,
    ) -> Result<Self, SelectionError> {
        match patterns {
            None => Ok(Selection::All),
            Some(patterns) => Ok(Selection::Patterns(PatternMatcher::new(
                patterns.iter(),
                context,
            )?)),
        }
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&dyn Module) -> bool + Send + Sync + 'static,
    {
        Selection::Predicate(Arc::new(predicate))
    }

    /// True if `module` should be compiled lazily.
    pub fn is_eligible(&self, module: &dyn Module) -> bool {
        match self {
            Selection::All => true,
            Selection::Patterns(matcher) => module
                .name_for_condition()
                .is_some_and(|name| matcher.matches(&name)),
            Selection::Predicate(predicate) => predicate(module),
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("All"),
            Selection::Patterns(matcher) => f.debug_tuple("Patterns").field(matcher).finish(),
            Selection::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
