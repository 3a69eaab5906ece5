//! CLI binary entry point for the tagtrust simulator.
//!
//! Usage:
//!   tagtrust-sim [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>      Path to configuration TOML file
//!   -s, --seed <SEED>        PRNG seed (overrides config)
//!   -d, --duration <SECS>    Simulated duration (overrides config)
//!   -p, --peers <N>          Number of honest peers in the demo network
//!       --scenario <FILE>    Extra scripted actions as a JSON array
//!   -v, --verbose            Increase logging verbosity

use std::path::PathBuf;

use clap::Parser;

use tagtrust_node::config::SimConfig;
use tagtrust_node::{demo, ScenarioAction};

/// tagtrust simulator - subjective tag reputation over gossiped votes.
#[derive(Parser, Debug)]
#[command(name = "tagtrust-sim")]
#[command(about = "Runs the tagtrust demo network on a simulated clock and prints a JSON report")]
#[command(version)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// PRNG seed.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated duration in seconds.
    #[arg(short, long, value_name = "SECS")]
    duration: Option<u64>,

    /// Number of honest peers (one random voter is always added).
    #[arg(short, long, default_value_t = 4)]
    peers: u64,

    /// JSON file with additional scripted actions.
    #[arg(long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Increase logging verbosity (can be repeated: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SimConfig::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }
    if let Some(duration) = cli.duration {
        config.simulation.duration_secs = duration;
    }

    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    if cli.peers == 0 {
        anyhow::bail!("--peers must be at least 1");
    }

    tracing::info!(
        seed = config.simulation.seed,
        duration_secs = config.simulation.duration_secs,
        honest_peers = cli.peers,
        "Starting tagtrust simulator"
    );

    let mut simulation = demo::build_simulation(&config, cli.peers)?;

    if let Some(path) = cli.scenario {
        let content = std::fs::read_to_string(&path)?;
        let actions: Vec<ScenarioAction> = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), actions = actions.len(), "Loaded scenario");
        simulation.schedule_actions(actions)?;
    }

    let report = simulation.run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
