//! Campaign configuration
//!
//! Every field has a default matching the reference Solidity campaign, so an
//! empty TOML file (or none at all) describes a runnable 20-day campaign
//! against `ISSTA24-Solidity-Study/benchmark`. CLI flags are applied on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TriageError};
use crate::version::Version;

/// Default wall-clock budget: 20 days
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 20 * 24 * 3600;

/// How the external candidate generator is invoked
///
/// The generator is opaque; these are passthrough arguments. Each round
/// one `mode` is chosen at random, a random subset of `optional_args` is
/// appended, and constructors are switched on or off at random.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Program to run (e.g. `npx`)
    pub program: PathBuf,

    /// Arguments passed on every invocation
    pub args: Vec<String>,

    /// Flag preceding the chosen mode; no mode is passed when `modes` is empty
    pub mode_flag: String,

    /// Generation modes to pick from
    pub modes: Vec<String>,

    /// Feature knobs, each entry split on whitespace into separate arguments
    pub optional_args: Vec<String>,

    /// Flag taking `1.0`/`0.0` to enable or disable constructors
    pub constructor_flag: Option<String>,

    /// Directory the generator writes candidates into
    pub output_dir: PathBuf,

    /// Candidate file extension, without the dot
    pub extension: String,

    /// Kill the generator after this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("npx"),
            args: [
                "erwin",
                "generate",
                "-max",
                "100",
                "--generation_rounds",
                "1",
                "--refresh_folder",
                "--error_prob",
                "0.0",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            mode_flag: "-m".to_string(),
            modes: ["type", "loc", "scope"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            optional_args: [
                "--mapping_type_prob 0.0",
                "--array_type_prob 0.0",
                "--struct_type_prob 0.0",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            constructor_flag: Some("--constructor_prob".to_string()),
            output_dir: PathBuf::from("generated_programs"),
            extension: "sol".to_string(),
            timeout_secs: None,
        }
    }
}

/// Top-level campaign configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Historical corpus root: one directory per version
    pub benchmark_dir: PathBuf,

    /// File name of the compiler binary inside each version directory
    pub binary_name: String,

    /// Archive root; recorded candidates land in `<output_dir>/<version>/`
    pub output_dir: PathBuf,

    /// Bug store file (default `<output_dir>/bugs.json`)
    pub store_path: Option<PathBuf>,

    /// Catalog cache file (default `<output_dir>/catalog.json`)
    pub catalog_cache: Option<PathBuf>,

    /// Wall-clock budget consumed by generation time
    pub time_budget_secs: u64,

    /// Stop after this many rounds even if budget remains
    pub max_rounds: Option<u64>,

    /// Kill a compiler invocation after this many seconds
    pub compile_timeout_secs: Option<u64>,

    /// Extra arguments placed before the candidate path
    pub compiler_args: Vec<String>,

    /// Lines prepended to every candidate before compilation
    pub prelude: Vec<String>,

    /// Versions older than this are skipped in rounds generated with constructors
    pub min_constructor_version: Option<Version>,

    /// Consecutive generator failures tolerated before the campaign aborts
    pub max_generator_attempts: u32,

    /// First retry delay; doubled on every further failure
    pub generator_backoff_ms: u64,

    /// Upper bound on a single retry delay
    pub generator_backoff_cap_ms: u64,

    /// Seed for generation plans; random when unset
    pub seed: Option<u64>,

    pub generator: GeneratorConfig,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            benchmark_dir: PathBuf::from("ISSTA24-Solidity-Study/benchmark"),
            binary_name: "solc-static-linux".to_string(),
            output_dir: PathBuf::from("experiments/test_programs"),
            store_path: None,
            catalog_cache: None,
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            max_rounds: None,
            compile_timeout_secs: Some(120),
            compiler_args: Vec::new(),
            prelude: vec![
                "pragma experimental ABIEncoderV2;".to_string(),
                "pragma experimental SMTChecker;".to_string(),
            ],
            min_constructor_version: Some(Version::new(0, 5, 0)),
            max_generator_attempts: 5,
            generator_backoff_ms: 1_000,
            generator_backoff_cap_ms: 60_000,
            seed: None,
            generator: GeneratorConfig::default(),
        }
    }
}

impl CampaignConfig {
    /// Load from a TOML file; missing fields take their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TriageError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("bugs.json"))
    }

    pub fn catalog_cache_path(&self) -> PathBuf {
        self.catalog_cache
            .clone()
            .unwrap_or_else(|| self.output_dir.join("catalog.json"))
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        self.compile_timeout_secs.map(Duration::from_secs)
    }

    /// Backoff before retry number `failures` (1-based), capped
    pub fn generator_backoff(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(20);
        let delay = self.generator_backoff_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.generator_backoff_cap_ms))
    }

    /// Binary for `version` inside the corpus tree
    pub fn binary_path(&self, version: &Version) -> PathBuf {
        self.benchmark_dir
            .join(version.to_string())
            .join(&self.binary_name)
    }

    /// Reject values that would make the campaign misbehave
    pub fn validate(&self) -> Result<()> {
        if self.binary_name.trim().is_empty() {
            return Err(TriageError::config("binary_name must not be empty"));
        }

        if self.max_generator_attempts == 0 {
            return Err(TriageError::config(
                "max_generator_attempts must be >= 1",
            ));
        }

        if self.generator_backoff_cap_ms < self.generator_backoff_ms {
            return Err(TriageError::config(format!(
                "generator_backoff_cap_ms ({}) must be >= generator_backoff_ms ({})",
                self.generator_backoff_cap_ms, self.generator_backoff_ms
            )));
        }

        if self.compile_timeout_secs == Some(0) {
            return Err(TriageError::config("compile_timeout_secs must be > 0"));
        }

        if self.generator.timeout_secs == Some(0) {
            return Err(TriageError::config("generator.timeout_secs must be > 0"));
        }

        if self.generator.extension.is_empty() || self.generator.extension.starts_with('.') {
            return Err(TriageError::config(format!(
                "generator.extension must be a bare extension like \"sol\", got {:?}",
                self.generator.extension
            )));
        }

        Ok(())
    }
}
