#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Runway streaming session.

mod simulation;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use runway_core::PoolTag;
use runway_world::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::simulation::Plan;

#[derive(Debug, Parser)]
#[command(name = "runway", about = "Runs a headless Runway streaming session")]
struct CliArgs {
    /// TOML settings file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the seed from the settings.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated seconds to run.
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,
    /// Milliseconds of simulated time per tick.
    #[arg(long = "dt-ms", default_value_t = 16)]
    dt_ms: u64,
    /// Background tile template to activate before streaming starts.
    #[arg(long)]
    background: Option<String>,
    /// Logs every spawn and retirement.
    #[arg(long, short)]
    verbose: bool,
}

/// Entry point for the Runway command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose)?;

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }

    let duration = Duration::try_from_secs_f32(args.seconds)
        .with_context(|| format!("--seconds must be a non-negative number, got {}", args.seconds))?;
    if args.dt_ms == 0 {
        bail!("--dt-ms must be positive");
    }
    let plan = Plan::new(duration, Duration::from_millis(args.dt_ms));

    info!(seed = settings.seed, ticks = plan.ticks(), "starting simulation");
    let summary = simulation::run(settings, args.background.map(PoolTag::from), plan)?;
    println!("{summary}");
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    parse_settings(&text).with_context(|| format!("invalid settings in {}", path.display()))
}

fn parse_settings(text: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(text)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = parse_settings("").expect("defaults");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn invalid_values_are_reported() {
        let error = parse_settings("[content]\ncoin_chance = 2.0").expect_err("out of range");
        assert!(error.to_string().contains("content.coin_chance"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = load_settings(Some(Path::new("/nonexistent/runway.toml")))
            .expect_err("missing file");
        assert!(format!("{error:#}").contains("/nonexistent/runway.toml"));
    }
}
