//! CLI argument parsing for sigtriage

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::CampaignConfig;

/// Output format for the end-of-campaign summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report (default)
    Text,
    /// JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "sigtriage")]
#[command(version)]
#[command(
    about = "Differential compiler testing campaign with signature-based bug triage",
    long_about = None
)]
pub struct Cli {
    /// TOML campaign configuration (flags below override it)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root of the historical corpus, one directory per version
    #[arg(long = "benchmark-dir", value_name = "DIR")]
    pub benchmark_dir: Option<PathBuf>,

    /// Compiler binary name inside each version directory
    #[arg(long = "binary-name", value_name = "NAME")]
    pub binary_name: Option<String>,

    /// Directory for archived candidates, bug store and catalog cache
    #[arg(short, long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Bug store file (default: <output-dir>/bugs.json)
    #[arg(long = "store", value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Catalog cache file (default: <output-dir>/catalog.json)
    #[arg(long = "catalog-cache", value_name = "FILE")]
    pub catalog_cache: Option<PathBuf>,

    /// Ignore the catalog cache and rebuild it from the corpus
    #[arg(long = "rebuild-catalog")]
    pub rebuild_catalog: bool,

    /// Build (or load) the catalog, write the cache, and exit
    #[arg(long = "build-catalog-only")]
    pub build_catalog_only: bool,

    /// Wall-clock budget charged for generation, in seconds
    #[arg(short = 'b', long = "budget-secs", value_name = "SECS")]
    pub budget_secs: Option<u64>,

    /// Stop after this many rounds even if budget remains
    #[arg(long = "max-rounds", value_name = "N")]
    pub max_rounds: Option<u64>,

    /// Kill a compiler invocation after this many seconds
    #[arg(long = "compile-timeout", value_name = "SECS")]
    pub compile_timeout: Option<u64>,

    /// Seed for the generation plan RNG
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Summary format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Overlay flags that were given on top of `config`
    pub fn apply_to(&self, config: &mut CampaignConfig) {
        if let Some(dir) = &self.benchmark_dir {
            config.benchmark_dir = dir.clone();
        }
        if let Some(name) = &self.binary_name {
            config.binary_name = name.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(store) = &self.store {
            config.store_path = Some(store.clone());
        }
        if let Some(cache) = &self.catalog_cache {
            config.catalog_cache = Some(cache.clone());
        }
        if let Some(secs) = self.budget_secs {
            config.time_budget_secs = secs;
        }
        if let Some(rounds) = self.max_rounds {
            config.max_rounds = Some(rounds);
        }
        if let Some(secs) = self.compile_timeout {
            config.compile_timeout_secs = Some(secs);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}
