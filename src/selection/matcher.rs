//! Glob matching of module paths.
//!
//! # Responsibilities
//! - Compile include (`src/**`) and exclude (`!**/*.test.js`) globs
//! - Try each spelling of a module path: absolute, root-relative, `./`-relative
//!
//! # Design Decisions
//! - Patterns apply in order; an exclude only removes what an earlier
//!   include selected
//! - `*` does not cross `/`; use `**` for nested directories
//! - Hidden segments (`.cache`, `.env.js`) are only selected by a pattern
//!   that spells out a dot-segment itself, so `src/**` skips `src/.cache/x.js`
//! - Separators are normalized to `/` before matching

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::selection::SelectionError;

/// One compiled pattern.
#[derive(Debug, Clone)]
struct PatternRule {
    negated: bool,
    dotfiles: bool,
    glob: GlobMatcher,
}

impl PatternRule {
    fn is_match(&self, candidate: &str) -> bool {
        (self.dotfiles || !has_hidden_segment(candidate)) && self.glob.is_match(candidate)
    }
}

/// Ordered include/exclude glob list evaluated against module paths.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: Vec<PatternRule>,
    context: PathBuf,
}

impl PatternMatcher {
    /// Compile `patterns`, resolving relative spellings against `context`.
    pub fn new<I, S>(patterns: I, context: impl Into<PathBuf>) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|pattern| compile(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            context: context.into(),
        })
    }

    /// True if any spelling of `name` is selected by the pattern list.
    pub fn matches(&self, name: &str) -> bool {
        let absolute = name.replace('\\', "/");
        let relative = to_slash(&relative_to(&self.context, Path::new(name)));
        let dotted = format!("./{relative}");

        [absolute, relative, dotted]
            .iter()
            .any(|candidate| self.selects(candidate))
    }

    fn selects(&self, candidate: &str) -> bool {
        self.rules.iter().fold(false, |selected, rule| {
            match (rule.negated, rule.is_match(candidate)) {
                (false, true) => true,
                (true, true) => false,
                (_, false) => selected,
            }
        })
    }
}

fn compile(pattern: &str) -> Result<PatternRule, SelectionError> {
    let (negated, glob) = match pattern.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let dotfiles = has_hidden_segment(glob);
    let glob = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|source| SelectionError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();
    Ok(PatternRule {
        negated,
        dotfiles,
        glob,
    })
}

/// True if some segment is a dotfile name; `.` and `..` do not count.
fn has_hidden_segment(path: &str) -> bool {
    path.split('/')
        .any(|segment| segment.starts_with('.') && segment != "." && segment != "..")
}

/// Path of `target` relative to `base`, walking up with `..` when needed.
fn relative_to(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
