use anyhow::{Context, Result};
use clap::Parser;
use sigtriage::campaign::{CampaignDriver, ExternalGenerator};
use sigtriage::catalog::{Catalog, CatalogBuilder};
use sigtriage::cli::{Cli, OutputFormat};
use sigtriage::compiler::BinaryCompiler;
use sigtriage::config::CampaignConfig;
use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr; stdout is reserved for the summary
fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let filter = if debug {
        filter.add_directive(tracing::Level::TRACE.into())
    } else {
        filter
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file (if any), then CLI overrides, then validation
fn load_config(args: &Cli) -> Result<CampaignConfig> {
    let mut config = match &args.config {
        Some(path) => CampaignConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CampaignConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate().context("invalid campaign configuration")?;
    Ok(config)
}

fn build_catalog_only(config: &CampaignConfig, compiler: &BinaryCompiler, rebuild: bool) -> Result<()> {
    let builder = CatalogBuilder::new(compiler, &config.benchmark_dir, &config.binary_name);
    let cache = config.catalog_cache_path();
    let catalog = Catalog::load_or_build(&cache, &builder, rebuild).context("failed to build catalog")?;

    let signatures: usize = catalog
        .versions()
        .filter_map(|v| catalog.entries(v))
        .map(|entries| entries.len())
        .sum();
    println!(
        "Catalog: {} versions, {} signatures ({})",
        catalog.len(),
        signatures,
        cache.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let compiler = BinaryCompiler::new(config.compiler_args.clone(), config.compile_timeout());

    if args.build_catalog_only {
        return build_catalog_only(&config, &compiler, args.rebuild_catalog);
    }

    let generator = ExternalGenerator::new(config.generator.clone(), config.seed);
    let mut driver = CampaignDriver::load(config, generator, compiler, args.rebuild_catalog)
        .context("failed to load campaign")?;
    let summary = driver.run().context("campaign aborted")?;

    match args.format {
        OutputFormat::Text => print!("{}", summary.to_report_string()),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }
    Ok(())
}
