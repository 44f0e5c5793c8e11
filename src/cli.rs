use std::path::PathBuf;

use clap::Parser;

/// Hybrid ESS dispatch simulator.
///
/// If no --scenario or --preset is given, the hybrid preset is used.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Load the scenario from a TOML file.
    #[clap(long, env = "ESS_DISPATCH_SCENARIO", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (hybrid, sluggish_main).
    #[clap(long)]
    pub preset: Option<String>,

    /// Override the number of cycles.
    #[clap(long)]
    pub cycles: Option<usize>,

    /// Override the random seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Export cycle records to a CSV file.
    #[clap(long = "telemetry-out")]
    pub telemetry_out: Option<PathBuf>,

    /// Print only aborted cycles and the summary.
    #[clap(long, short)]
    pub quiet: bool,
}
