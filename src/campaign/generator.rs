// Candidate generation
//
// The generator is an opaque external program. Each invocation follows a
// randomly drawn plan (mode, feature knobs, constructors on/off) and leaves
// candidate files in a known directory, which we collect by extension.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::GeneratorConfig;
use crate::error::{Result, TriageError};
use crate::process::run_with_timeout;

/// A generated test input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// File name, used as the bug store key
    pub name: String,
    pub path: PathBuf,
}

impl Candidate {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// Output of one successful generator invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedBatch {
    pub candidates: Vec<Candidate>,
    /// Candidates may contain constructors (gates old versions out)
    pub with_constructors: bool,
}

/// Source of candidates for each round
pub trait Generator {
    /// Produce one batch
    ///
    /// # Errors
    /// [`TriageError::GeneratorFailed`] for failures worth retrying.
    fn generate(&mut self) -> Result<GeneratedBatch>;
}

/// Randomized invocation parameters for one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub mode: Option<String>,
    pub knobs: Vec<String>,
    pub with_constructors: bool,
}

impl GenerationPlan {
    /// Draw a plan: one mode, a strict subset of the knobs, constructors by coin flip
    pub fn choose<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Self {
        let mode = config.modes.choose(rng).cloned();

        let knobs = if config.optional_args.is_empty() {
            Vec::new()
        } else {
            let amount = rng.gen_range(0..config.optional_args.len());
            config
                .optional_args
                .choose_multiple(rng, amount)
                .cloned()
                .collect()
        };

        let with_constructors = config.constructor_flag.is_some() && rng.gen_bool(0.5);

        Self {
            mode,
            knobs,
            with_constructors,
        }
    }

    /// Full argument list for the generator program
    pub fn to_args(&self, config: &GeneratorConfig) -> Vec<String> {
        let mut args = config.args.clone();
        if let Some(mode) = &self.mode {
            args.push(config.mode_flag.clone());
            args.push(mode.clone());
        }
        for knob in &self.knobs {
            args.extend(knob.split_whitespace().map(str::to_string));
        }
        if let Some(flag) = &config.constructor_flag {
            args.push(flag.clone());
            args.push(if self.with_constructors { "1.0" } else { "0.0" }.to_string());
        }
        args
    }
}

/// Candidate files with `extension` in `dir`, sorted by name
pub fn collect_candidates(dir: &Path, extension: &str) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == extension) {
            candidates.push(Candidate::from_path(path));
        }
    }
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

/// Runs the configured generator program
pub struct ExternalGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl ExternalGenerator {
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }
}

impl Generator for ExternalGenerator {
    fn generate(&mut self) -> Result<GeneratedBatch> {
        let plan = GenerationPlan::choose(&self.config, &mut self.rng);
        let args = plan.to_args(&self.config);
        info!(
            program = %self.config.program.display(),
            args = %args.join(" "),
            "invoking generator"
        );

        let timeout = self.config.timeout_secs.map(Duration::from_secs);
        let outcome = run_with_timeout(&self.config.program, &args, None, timeout)
            .map_err(|e| TriageError::GeneratorFailed(e.to_string()))?;
        if !outcome.success() {
            return Err(TriageError::GeneratorFailed(format!(
                "exit status {}: {}",
                outcome.status_code(),
                outcome.stderr.trim()
            )));
        }

        let candidates =
            collect_candidates(&self.config.output_dir, &self.config.extension).map_err(|e| {
                TriageError::GeneratorFailed(format!(
                    "cannot read {}: {}",
                    self.config.output_dir.display(),
                    e
                ))
            })?;

        Ok(GeneratedBatch {
            candidates,
            with_constructors: plan.with_constructors,
        })
    }
}
