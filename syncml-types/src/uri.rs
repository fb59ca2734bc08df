//! Normalized store URIs.
//!
//! Store URIs arrive from configuration, DevInfo exchanges, and route
//! definitions in inconsistent shapes (`./contacts`, `contacts/`,
//! `//contacts`). All comparison in the engine goes through `StoreUri`,
//! which normalizes on construction, so two spellings of the same path
//! always compare equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A store path, normalized so it can be used as a map key.
///
/// Normalization collapses runs of `/` into one, drops `.` segments and a
/// leading `./`, and strips any trailing separator. A leading `/` is
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StoreUri(String);

impl StoreUri {
    /// Creates a normalized store URI.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    /// Returns the normalized path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty path (an all-separator or empty input).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let absolute = trimmed.starts_with('/');
    let segments: Vec<&str> = trimmed
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

impl fmt::Display for StoreUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreUri {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for StoreUri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StoreUri {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<StoreUri> for String {
    fn from(uri: StoreUri) -> Self {
        uri.0
    }
}
