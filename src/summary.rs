//! End-of-campaign summary
//!
//! Counters are accumulated by the driver while it runs and printed once the
//! campaign terminates, either as a human-readable report or as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::version::Version;

/// What happened to the compilations of one version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    /// Candidates compiled (including skipped attempts)
    pub compiled: u64,
    /// Compiled without a diagnostic or crash
    pub clean: u64,
    /// Could not be run or timed out
    pub skipped: u64,
    /// Failed with a signature absent from the catalog
    pub unmatched: u64,
    /// Reproduced a known signature already recorded
    pub duplicates: u64,
    /// Newly recorded bugs
    pub recorded: u64,
    /// Rounds in which this version was skipped by constructor gating
    pub gated_rounds: u64,
}

/// Counters for a whole campaign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub rounds: u64,
    pub candidates: u64,
    pub generator_failures: u64,
    pub budget_secs: f64,
    pub consumed_secs: f64,
    /// Records in the bug store at termination, across restarts
    pub stored_bugs: usize,
    pub versions: BTreeMap<Version, VersionSummary>,
}

impl CampaignSummary {
    pub fn version_mut(&mut self, version: Version) -> &mut VersionSummary {
        self.versions.entry(version).or_default()
    }

    /// Sum of all per-version counters
    pub fn totals(&self) -> VersionSummary {
        self.versions
            .values()
            .fold(VersionSummary::default(), |mut acc, v| {
                acc.compiled += v.compiled;
                acc.clean += v.clean;
                acc.skipped += v.skipped;
                acc.unmatched += v.unmatched;
                acc.duplicates += v.duplicates;
                acc.recorded += v.recorded;
                acc.gated_rounds += v.gated_rounds;
                acc
            })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable report
    pub fn to_report_string(&self) -> String {
        let totals = self.totals();
        let mut report = String::new();

        report.push_str("=== Campaign Summary ===\n");
        report.push_str(&format!("Rounds: {}\n", self.rounds));
        report.push_str(&format!("Candidates generated: {}\n", self.candidates));
        report.push_str(&format!("Generator failures: {}\n", self.generator_failures));
        report.push_str(&format!(
            "Budget consumed: {:.1}s of {:.1}s\n",
            self.consumed_secs, self.budget_secs
        ));
        report.push_str(&format!(
            "Compilations: {} (clean {}, skipped {}, unmatched {}, duplicates {})\n",
            totals.compiled, totals.clean, totals.skipped, totals.unmatched, totals.duplicates
        ));
        report.push_str(&format!(
            "New bugs this run: {} (store total {})\n",
            totals.recorded, self.stored_bugs
        ));

        let with_findings: Vec<_> = self
            .versions
            .iter()
            .filter(|(_, v)| v.recorded > 0)
            .collect();
        if !with_findings.is_empty() {
            report.push('\n');
            report.push_str(&format!("{:<12} {:>8} {:>10}\n", "VERSION", "RECORDED", "DUPLICATES"));
            for (version, v) in with_findings {
                report.push_str(&format!(
                    "{:<12} {:>8} {:>10}\n",
                    version.to_string(),
                    v.recorded,
                    v.duplicates
                ));
            }
        }

        report
    }
}
