//! Stable, URL-safe module keys.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

/// Separator between keys in a single request path.
pub const KEY_DELIMITER: char = '@';

/// Bytes `encodeURIComponent` escapes.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Bytes escaped in a key: a URI component minus the sub-delimiters that
/// are legal inside a URL path segment.
const KEY_ESCAPE: &AsciiSet = &URI_COMPONENT
    .remove(b'/')
    .remove(b':')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Errors produced while parsing a batch of keys from a request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Two delimiters in a row, or a leading/trailing delimiter.
    #[error("empty module key at position {index}")]
    EmptySegment { index: usize },

    /// A '%' not followed by two hex digits.
    #[error("malformed escape sequence in module key '{segment}'")]
    InvalidEscape { segment: String },

    /// Escapes decode to bytes that are not UTF-8.
    #[error("module key '{segment}' does not decode to UTF-8")]
    InvalidUtf8 { segment: String },

    /// The batch path does not start with '/'.
    #[error("module key batch '{path}' must start with '/'")]
    MissingLeadingSlash { path: String },
}

/// Opaque identifier for a module, safe to embed in a URL path segment.
///
/// Two keys are equal iff they were derived from the same (separator
/// normalized) module identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(String);

impl ModuleKey {
    /// Derive the key for a module identifier.
    pub fn encode(identifier: &str) -> Self {
        let normalized = identifier.replace('\\', "/");
        Self(utf8_percent_encode(&normalized, KEY_ESCAPE).to_string())
    }

    /// Parse one segment of a request path into its canonical key.
    fn parse_segment(segment: &str, index: usize) -> Result<Self, KeyError> {
        if segment.is_empty() {
            return Err(KeyError::EmptySegment { index });
        }
        if !has_valid_escapes(segment) {
            return Err(KeyError::InvalidEscape {
                segment: segment.to_string(),
            });
        }
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| KeyError::InvalidUtf8 {
                segment: segment.to_string(),
            })?;
        Ok(Self::encode(&decoded))
    }

    /// The normalized module identifier this key was derived from.
    pub fn identifier(&self) -> String {
        // Keys only ever hold output of `encode`, which is valid UTF-8 once decoded.
        percent_decode_str(&self.0).decode_utf8_lossy().into_owned()
    }

    /// The encoded form, as embedded in URLs.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn has_valid_escapes(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Split a request path into the ordered keys it references.
///
/// The path must start with exactly the one `/` that `join_batch` emits;
/// whatever follows it belongs to the first key. Duplicates are kept: each
/// occurrence is counted (and later released) independently.
pub fn decode_batch(path: &str) -> Result<Vec<ModuleKey>, KeyError> {
    let batch = path
        .strip_prefix('/')
        .ok_or_else(|| KeyError::MissingLeadingSlash {
            path: path.to_string(),
        })?;
    batch
        .split(KEY_DELIMITER)
        .enumerate()
        .map(|(index, segment)| ModuleKey::parse_segment(segment, index))
        .collect()
}

/// Join keys into the path a runtime client requests below the mount point.
pub fn join_batch<'a>(keys: impl IntoIterator<Item = &'a ModuleKey>) -> String {
    let mut path = String::from("/");
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            path.push(KEY_DELIMITER);
        }
        path.push_str(key.as_str());
    }
    path
}
