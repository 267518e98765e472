//! Failure signatures and diagnostic normalization
//!
//! A signature is the comparable key of a compiler failure. Raw stderr is
//! reduced to its first `Error:` line and stripped of the file references
//! that differ between machines and runs:
//!
//! - historical corpus paths: `.../benchmark/0.8.1/42.sol:3:1:`
//! - generated candidate paths: `.../2024-3-7_12:05:33:123_0.sol:3:1:`,
//!   including prefixed names and short timestamps such as
//!   `.../program_2024-3-7_9:5:3_0.sol:3:1:`
//!
//! Normalization is applied until it reaches a fixed point, which makes it
//! idempotent even when a removal joins two fragments into a new reference.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::process::RawOutcome;

/// Token marking the diagnostic line worth keeping
pub const ERROR_TOKEN: &str = "Error:";

/// Canonical failure key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Sentinel for fatal-signal terminations
    pub const SEGFAULT: &'static str = "segfault";

    pub fn segfault() -> Self {
        Self(Self::SEGFAULT.to_string())
    }

    /// Normalize raw diagnostic text into a signature
    pub fn from_diagnostic(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// Wrap an already canonical string (store and catalog files)
    pub fn from_canonical(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_segfault(&self) -> bool {
        self.0 == Self::SEGFAULT
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn volatile_reference_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?:\S*/)?benchmark/\d+\.\d+\.\d+/\d+\.sol:\d+:\d+:")
                .expect("corpus path pattern is valid"),
            Regex::new(r"\S*?\d{4}-\d{1,2}-\d{1,2}_\d{1,2}:\d{1,2}:\d{1,2}(?::\d{1,3})?_\d+\.sol:\d+:\d+:")
                .expect("candidate path pattern is valid"),
        ]
    })
}

/// First line containing `Error:`, or the whole text when there is none
pub fn extract_error(raw: &str) -> &str {
    raw.lines()
        .find(|line| line.contains(ERROR_TOKEN))
        .unwrap_or(raw)
}

/// Remove `<path>:<line>:<column>:` references and trim
pub fn strip_volatile_references(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let mut next = current.clone();
        for pattern in volatile_reference_patterns() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        let next = next.trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Full normalization: extract, strip, repeat until stable
pub fn normalize(raw: &str) -> String {
    let mut current = strip_volatile_references(extract_error(raw));
    loop {
        // Both stages only remove text, so this shrinks until it is stable
        let next = strip_volatile_references(extract_error(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Signature of a compiler run, or `None` when it compiled cleanly
///
/// A segmentation fault wins over any diagnostic text; otherwise non-blank
/// stderr is normalized. Other signals without stderr count as clean.
pub fn classify_outcome(outcome: &RawOutcome) -> Option<Signature> {
    if outcome.is_fatal_crash() {
        return Some(Signature::segfault());
    }
    if outcome.stderr.trim().is_empty() {
        return None;
    }
    Some(Signature::from_diagnostic(&outcome.stderr))
}
