//! SVIP Allocator - Constrained portfolio allocation service.
//!
//! Serves the allocation pipeline over HTTP, or runs a single allocation
//! from a JSON file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use svip_allocator::allocation::{AllocationRequest, Allocator};
use svip_allocator::report::{generate_report, render_markdown};
use svip_allocator::AllocatorService;
use svip_common::config::{config_dir, Config};
use svip_common::config_loader::check_modular_files;
use svip_common::logging::init_logging_with_exclusions;
use svip_common::Validate;

#[derive(Parser, Debug)]
#[command(name = "svip-allocator")]
#[command(version)]
#[command(about = "Constrained portfolio weight allocation", long_about = None)]
struct Cli {
    /// Configuration directory (defaults to $SVIP_CONFIG_DIR or ~/.svip)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP service
    Serve,
    /// Run one allocation from a JSON request file
    Allocate {
        /// Path to an allocation request ({ "portfolio": ..., "securities": [...] })
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Load and validate the configuration
    CheckConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

fn allocate(config: &Config, input: &Path, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let request: AllocationRequest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    if let Err(err) = request.validate() {
        for e in err.into_vec() {
            eprintln!("  - {}", e);
        }
        bail!("Invalid allocation request {}", input.display());
    }

    let allocator =
        Allocator::new(config.allocation.clone()).context("Invalid allocation configuration")?;
    let allocation = allocator.allocate(&request.portfolio, &request.securities);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&allocation)?),
        OutputFormat::Markdown => print!("{}", render_markdown(&generate_report(allocation))),
    }
    Ok(())
}

fn check_config(config: &Config, dir: Option<&Path>) -> Result<()> {
    let dir = dir.map_or_else(config_dir, Path::to_path_buf);
    println!("Configuration directory: {}", dir.display());
    for (file, exists) in check_modular_files(Some(dir)) {
        println!("  {} {}", if exists { "✓" } else { "·" }, file);
    }

    match config.validate() {
        Ok(()) => {
            println!("Configuration OK");
            Ok(())
        }
        Err(err) => {
            for e in err.into_vec() {
                println!("  ✗ {}", e);
            }
            bail!("Configuration is invalid")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();
    let cli = Cli::parse();
    let dir = cli.config_dir.as_deref();

    let config = Config::load_with_env(dir)?;

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    match cli.command {
        Commands::Serve => {
            tracing::info!("SVIP Allocator v{}", env!("CARGO_PKG_VERSION"));

            let service = AllocatorService::new(config)?;

            let startup_duration = startup_start.elapsed();
            tracing::info!(
                duration_ms = startup_duration.as_millis() as u64,
                "Service initialized in {:?}",
                startup_duration
            );

            service.start().await
        }
        Commands::Allocate { input, format } => allocate(&config, &input, format),
        Commands::CheckConfig => check_config(&config, dir),
    }
}
