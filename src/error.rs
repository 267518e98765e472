//! Error taxonomy for the triage engine
//!
//! Only [`TriageError::Configuration`] and [`TriageError::GenerationExhausted`]
//! are meant to end a campaign. Transient process failures are skipped by the
//! driver and a corrupt store is quarantined and replaced by an empty one.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building catalogs, driving rounds, or persisting results
#[derive(Error, Debug)]
pub enum TriageError {
    /// Stale or misconfigured catalog corpus, malformed version, bad config value
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A compiler invocation could not be started
    #[error("failed to run {}: {source}", program.display())]
    TransientProcess {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A compiler invocation exceeded its timeout and was killed
    #[error("{} timed out after {timeout:?} on {}", program.display(), input.display())]
    TimedOut {
        program: PathBuf,
        input: PathBuf,
        timeout: Duration,
    },

    /// A single generator attempt failed
    #[error("generator failed: {0}")]
    GeneratorFailed(String),

    /// The generator failed on every one of the allowed consecutive attempts
    #[error("generator failed {attempts} consecutive times, last error: {last}")]
    GenerationExhausted { attempts: u32, last: String },

    /// The persisted bug store could not be parsed
    #[error("bug store {} is corrupt: {reason}", path.display())]
    StoreCorruption { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TriageError {
    /// Build a [`TriageError::Configuration`] from anything printable
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for errors that skip one (version, candidate) pair instead of aborting
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientProcess { .. } | Self::TimedOut { .. })
    }
}

/// Result type for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;
