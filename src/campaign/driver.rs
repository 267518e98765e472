// Campaign driver state machine
//
// LOADING_CATALOG -> GENERATING -> COMPILING -> CLASSIFYING -> PERSISTING
//                    ^_____________________________________________|
//                                                                  v
//                                                             TERMINATED
//
// The budget is only charged for GENERATING and only checked between rounds,
// so a round in progress always runs to completion.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::generator::{Candidate, GeneratedBatch, Generator};
use super::state::{CampaignState, Verdict};
use crate::compiler::Compiler;
use crate::config::CampaignConfig;
use crate::error::{Result, TriageError};
use crate::process::RawOutcome;
use crate::signature::classify_outcome;
use crate::summary::CampaignSummary;
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignPhase {
    LoadingCatalog,
    Generating,
    Compiling,
    Classifying,
    Persisting,
    Terminated,
}

pub struct CampaignDriver<G, C> {
    config: CampaignConfig,
    generator: G,
    compiler: C,
    state: CampaignState,
    phase: CampaignPhase,
    remaining: Duration,
    summary: CampaignSummary,
}

impl<G: Generator, C: Compiler> CampaignDriver<G, C> {
    /// Driver over an already loaded state
    pub fn new(config: CampaignConfig, generator: G, compiler: C, state: CampaignState) -> Self {
        let remaining = config.time_budget();
        let summary = CampaignSummary {
            budget_secs: remaining.as_secs_f64(),
            ..Default::default()
        };
        Self {
            config,
            generator,
            compiler,
            state,
            phase: CampaignPhase::LoadingCatalog,
            remaining,
            summary,
        }
    }

    /// Run LOADING_CATALOG and return a driver ready to [`run`](Self::run)
    pub fn load(config: CampaignConfig, generator: G, compiler: C, rebuild_catalog: bool) -> Result<Self> {
        info!(
            benchmark_dir = %config.benchmark_dir.display(),
            store = %config.store_path().display(),
            "loading campaign"
        );
        let state = CampaignState::load(&config, &compiler, rebuild_catalog)?;
        Ok(Self::new(config, generator, compiler, state))
    }

    pub fn phase(&self) -> CampaignPhase {
        self.phase
    }

    pub fn state(&self) -> &CampaignState {
        &self.state
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn summary(&self) -> &CampaignSummary {
        &self.summary
    }

    /// Loop rounds until the budget (or round cap) is exhausted
    pub fn run(&mut self) -> Result<CampaignSummary> {
        info!(
            budget_secs = self.remaining.as_secs(),
            versions = self.state.catalog().len(),
            "campaign started"
        );

        loop {
            if self.remaining.is_zero() {
                info!(rounds = self.summary.rounds, "time budget exhausted");
                break;
            }
            if let Some(max) = self.config.max_rounds {
                if self.summary.rounds >= max {
                    info!(rounds = self.summary.rounds, "round cap reached");
                    break;
                }
            }
            self.run_round()?;
        }

        self.enter(CampaignPhase::Terminated);
        self.summary.consumed_secs = self
            .config
            .time_budget()
            .saturating_sub(self.remaining)
            .as_secs_f64();
        self.summary.stored_bugs = self.state.store().len();
        info!(
            rounds = self.summary.rounds,
            stored_bugs = self.summary.stored_bugs,
            "campaign terminated"
        );
        Ok(self.summary.clone())
    }

    fn enter(&mut self, phase: CampaignPhase) {
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase;
    }

    fn run_round(&mut self) -> Result<()> {
        self.enter(CampaignPhase::Generating);
        let started = Instant::now();
        let generated = self.generate_with_retry();
        self.remaining = self.remaining.saturating_sub(started.elapsed());
        let batch = generated?;

        self.summary.rounds += 1;
        self.summary.candidates += batch.candidates.len() as u64;
        info!(
            round = self.summary.rounds,
            candidates = batch.candidates.len(),
            constructors = batch.with_constructors,
            remaining_secs = self.remaining.as_secs(),
            "round started"
        );

        self.apply_prelude(&batch.candidates)?;

        let versions: Vec<Version> = self.state.catalog().versions().copied().collect();
        for version in versions {
            if self.is_gated(&version, &batch) {
                debug!(version = %version, "skipping version for constructor round");
                self.summary.version_mut(version).gated_rounds += 1;
                continue;
            }
            let outcomes = self.compile_all(version, &batch.candidates)?;
            self.classify_all(version, outcomes)?;
            self.enter(CampaignPhase::Persisting);
            let merged = self.state.commit()?;
            if merged > 0 {
                info!(version = %version, merged, "bug store flushed");
            }
        }

        remove_candidates(&batch.candidates);
        Ok(())
    }

    /// Bounded retries with capped exponential backoff
    fn generate_with_retry(&mut self) -> Result<GeneratedBatch> {
        let max_attempts = self.config.max_generator_attempts;
        let mut failures = 0;
        loop {
            match self.generator.generate() {
                Ok(batch) => return Ok(batch),
                Err(TriageError::GeneratorFailed(reason)) => {
                    failures += 1;
                    self.summary.generator_failures += 1;
                    if failures >= max_attempts {
                        return Err(TriageError::GenerationExhausted {
                            attempts: failures,
                            last: reason,
                        });
                    }
                    let delay = self.config.generator_backoff(failures);
                    warn!(
                        attempt = failures,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "generator failed, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn apply_prelude(&self, candidates: &[Candidate]) -> Result<()> {
        if self.config.prelude.is_empty() {
            return Ok(());
        }
        let mut header = self.config.prelude.join("\n").into_bytes();
        header.push(b'\n');
        for candidate in candidates {
            let body = fs::read(&candidate.path)?;
            let mut content = header.clone();
            content.extend_from_slice(&body);
            fs::write(&candidate.path, content)?;
        }
        Ok(())
    }

    fn is_gated(&self, version: &Version, batch: &GeneratedBatch) -> bool {
        batch.with_constructors
            && self
                .config
                .min_constructor_version
                .is_some_and(|min| *version < min)
    }

    fn compile_all<'a>(
        &mut self,
        version: Version,
        candidates: &'a [Candidate],
    ) -> Result<Vec<(&'a Candidate, RawOutcome)>> {
        self.enter(CampaignPhase::Compiling);
        let binary = self.config.binary_path(&version);
        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            self.summary.version_mut(version).compiled += 1;
            match self.compiler.compile(&binary, &candidate.path) {
                Ok(outcome) => outcomes.push((candidate, outcome)),
                Err(e) if e.is_transient() => {
                    warn!(
                        version = %version,
                        candidate = %candidate.name,
                        error = %e,
                        "skipping candidate"
                    );
                    self.summary.version_mut(version).skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }

    fn classify_all(&mut self, version: Version, outcomes: Vec<(&Candidate, RawOutcome)>) -> Result<()> {
        self.enter(CampaignPhase::Classifying);
        for (candidate, outcome) in outcomes {
            let Some(signature) = classify_outcome(&outcome) else {
                self.summary.version_mut(version).clean += 1;
                continue;
            };
            match self.state.observe(version, &candidate.name, signature.clone()) {
                Verdict::Interesting(record_name) => {
                    self.archive(version, candidate, &record_name)?;
                    self.summary.version_mut(version).recorded += 1;
                    info!(
                        version = %version,
                        candidate = %record_name,
                        signature = %signature,
                        "bug recorded"
                    );
                }
                Verdict::Duplicate => self.summary.version_mut(version).duplicates += 1,
                Verdict::Unknown => {
                    debug!(
                        version = %version,
                        candidate = %candidate.name,
                        signature = %signature,
                        "unmatched failure"
                    );
                    self.summary.version_mut(version).unmatched += 1;
                }
            }
        }
        Ok(())
    }

    /// Copy into `<output_dir>/<version>/<record_name>`; later versions still need the original
    fn archive(&self, version: Version, candidate: &Candidate, record_name: &str) -> Result<()> {
        let dir = self.config.output_dir.join(version.to_string());
        fs::create_dir_all(&dir)?;
        fs::copy(&candidate.path, dir.join(record_name))?;
        Ok(())
    }
}

fn remove_candidates(candidates: &[Candidate]) {
    for candidate in candidates {
        if let Err(e) = fs::remove_file(&candidate.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %candidate.path.display(), error = %e, "cannot remove candidate");
            }
        }
    }
}
