//! Three-component tool version identifiers
//!
//! Versions come from directory names in the historical corpus and from the
//! top-level keys of the bug store. Only canonical `MAJOR.MINOR.PATCH` forms
//! are accepted so that a version always round-trips to the same directory
//! name it was read from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::TriageError;

/// Error returned when a version identifier is not `MAJOR.MINOR.PATCH`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed version identifier '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: &'static str,
}

impl From<VersionParseError> for TriageError {
    fn from(err: VersionParseError) -> Self {
        TriageError::Configuration(err.to_string())
    }
}

/// Tool version ordered by (major, minor, patch) as integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

fn parse_component(input: &str, part: &str) -> Result<u32, VersionParseError> {
    let err = |reason| VersionParseError {
        input: input.to_string(),
        reason,
    };

    if part.is_empty() {
        return Err(err("empty component"));
    }
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("components must be decimal digits"));
    }
    if part.len() > 1 && part.starts_with('0') {
        return Err(err("components must not have leading zeros"));
    }
    part.parse().map_err(|_| err("component out of range"))
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionParseError {
                input: s.to_string(),
                reason: "expected exactly three dot-separated components",
            });
        }

        Ok(Self {
            major: parse_component(s, parts[0])?,
            minor: parse_component(s, parts[1])?,
            patch: parse_component(s, parts[2])?,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
