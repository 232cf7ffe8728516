//! Hierarchical database identifiers
//!
//! An identifier names one logical database, e.g. `app.users.profile`.
//! Segments may be separated by `.` or `/`; both spellings resolve to the
//! same canonical (dot-joined) identifier. The leading segment names the
//! application and is not a directory level on disk.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DocstoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    segments: Vec<String>,
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn invalid(input: &str, reason: impl Into<String>) -> DocstoreError {
    DocstoreError::InvalidIdentifier {
        input: input.to_string(),
        reason: reason.into(),
    }
}

impl Identifier {
    /// Parse an identifier from its dotted or slashed form
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` if the input is empty or any segment is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(invalid(input, "identifier is empty"));
        }
        let segments = input
            .split(['.', '/'])
            .map(|segment| {
                if is_valid_segment(segment) {
                    Ok(segment.to_string())
                } else {
                    Err(invalid(input, format!("bad segment '{segment}'")))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Build an identifier from already separated segments
    ///
    /// # Errors
    ///
    /// Same rules as [`Identifier::parse`], applied per segment.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid("", "identifier is empty"));
        }
        if let Some(bad) = segments.iter().find(|s| !is_valid_segment(s)) {
            return Err(invalid(&segments.join("."), format!("bad segment '{bad}'")));
        }
        Ok(Self { segments })
    }

    /// Sub-identifier one level below this one
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` if `segment` is not a single valid segment.
    pub fn child(&self, segment: &str) -> Result<Self> {
        if !is_valid_segment(segment) {
            return Err(invalid(
                &format!("{self}.{segment}"),
                format!("bad segment '{segment}'"),
            ));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// The enclosing identifier, `None` for a single-segment identifier
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn root_segment(&self) -> &str {
        &self.segments[0]
    }

    /// Directory of this identifier relative to the storage root
    ///
    /// Every segment after the leading one becomes one nested directory.
    /// The leading segment is not part of the path, so `app.users` and
    /// `other.users` share a directory, as do `app` and `other` (the root
    /// itself). Such identifiers still get separate states whose writes are
    /// not ordered against each other.
    #[must_use]
    pub fn relative_dir(&self) -> PathBuf {
        self.segments[1..].iter().collect()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for Identifier {
    type Err = DocstoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
