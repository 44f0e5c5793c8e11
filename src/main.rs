//! Simulator entry point: CLI wiring and config-driven engine construction.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ess_dispatch::config::ScenarioConfig;
use ess_dispatch::io::export::export_csv;
use ess_dispatch::sim::types::CycleStatus;

use crate::cli::Args;

fn load_scenario(args: &Args) -> anyhow::Result<ScenarioConfig> {
    // --scenario takes priority, then --preset, then the hybrid default
    let mut scenario = if let Some(path) = &args.scenario {
        ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?
    } else {
        ScenarioConfig::from_preset(args.preset.as_deref().unwrap_or("hybrid"))?
    };

    if let Some(cycles) = args.cycles {
        scenario.simulation.cycles = cycles;
    }
    if let Some(seed) = args.seed {
        scenario.simulation.seed = seed;
    }
    Ok(scenario)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let scenario = load_scenario(&args)?;

    let mut engine = match scenario.build_engine() {
        Ok(engine) => engine,
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            bail!("invalid scenario ({} errors)", errors.len());
        }
    };

    let records = engine.run();
    for r in &records {
        if !args.quiet || r.status == CycleStatus::Aborted {
            println!("{r}");
        }
    }

    let aborted = records.iter().filter(|r| r.status == CycleStatus::Aborted).count();
    let off_grid = records.iter().filter(|r| r.status == CycleStatus::OffGrid).count();
    info!(cycles = records.len(), aborted, off_grid, "simulation finished");

    if let Some(path) = &args.telemetry_out {
        export_csv(&records, path)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        info!(path = %path.display(), "telemetry written");
    }
    Ok(())
}
