//! Holo CLI
//!
//! Replay scripted card sessions headlessly and inspect engine configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod scenario;
mod simulate;

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "holo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Holo card simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print per-frame card outputs as JSON lines
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Engine configuration (defaults to holo.toml next to the scenario)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Frame interval in milliseconds
        #[arg(long, default_value_t = 1000.0 / 60.0)]
        frame_ms: f64,

        /// Emit every n-th frame
        #[arg(long, default_value_t = 1)]
        every: u64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a scenario and its configuration
    Check {
        /// Scenario file
        scenario: PathBuf,

        /// Engine configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective engine configuration as TOML
    Info {
        /// Directory searched for holo.toml
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Explicit configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            scenario,
            config,
            frame_ms,
            every,
            output,
        } => cmd_simulate(
            &scenario,
            config.as_deref(),
            simulate::Settings { frame_ms, every },
            output.as_deref(),
        ),

        Commands::Check { scenario, config } => cmd_check(&scenario, config.as_deref()),

        Commands::Info { dir, config } => cmd_info(&dir, config.as_deref()),
    }
}

fn scenario_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn cmd_simulate(
    scenario_path: &Path,
    config_path: Option<&Path>,
    settings: simulate::Settings,
    output: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::load(scenario_path)?;
    let (config, source) = config::resolve(config_path, scenario_dir(scenario_path))?;

    info!(
        "Simulating {} ({} cards, {} ms) with {}",
        scenario_path.display(),
        scenario.cards.len(),
        scenario.duration_ms,
        source
    );

    let summary = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let summary = simulate::run(&scenario, config, settings, &mut writer)?;
            writer.flush().context("Failed to flush output")?;
            summary
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            let summary = simulate::run(&scenario, config, settings, &mut writer)?;
            writer.flush().context("Failed to flush output")?;
            summary
        }
    };

    info!(
        "Done: {} lines, {} frames serviced, {} frame requests, {} navigations",
        summary.lines,
        summary.frames,
        summary.frame_requests,
        summary.navigations.len()
    );
    for (time_ms, card, navigation) in &summary.navigations {
        info!("  {:>8.1} ms  {}  {:?}", time_ms, card, navigation);
    }
    Ok(())
}

fn cmd_check(scenario_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let scenario = Scenario::load(scenario_path)?;
    let (_config, source) = config::resolve(config_path, scenario_dir(scenario_path))?;

    info!(
        "{} is valid: {} cards, {} events, {} ms (config: {})",
        scenario_path.display(),
        scenario.cards.len(),
        scenario.events.len(),
        scenario.duration_ms,
        source
    );
    Ok(())
}

fn cmd_info(dir: &Path, config_path: Option<&Path>) -> Result<()> {
    let (config, source) = config::resolve(config_path, dir)?;
    info!("Configuration from {}", source);
    print!("{}", config::to_toml(&config)?);
    Ok(())
}
