//! Lattice mesh simulator CLI.
//!
//! Runs one routing algorithm (or all four) against a reference topology
//! across an offered-load series, then writes the results document and, for
//! the load-balancing variants, per-packet transit-time CSVs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lattice_net::NetConfig;
use lattice_routing::LbParams;
use lattice_sim::report::{self, Parameters, Report};
use lattice_sim::topology::Topology;
use lattice_sim::{config, load_series, run_algorithm, Algorithm, RunPlan};

/// Multi-radio mesh routing simulator.
#[derive(Parser, Debug)]
#[command(name = "lattice-sim", about = "Compare mesh routing metrics under offered load")]
struct Cli {
    /// Topology key: 0 = small, 1 = big.
    #[arg(long, default_value_t = 0)]
    topology: u8,

    /// Duration of each traffic run, in seconds.
    #[arg(long, default_value_t = 180)]
    duration: u64,

    /// Base offered load in packets/second; the series derives from it.
    #[arg(long, default_value_t = 5.0)]
    load: f64,

    /// Output directory for results (defaults to the working directory).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Routing algorithm to evaluate.
    #[arg(long, value_enum, default_value_t = AlgorithmArg::All)]
    algorithm: AlgorithmArg,

    /// TOML file overriding tuned constants.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    #[value(name = "hop")]
    Hop,
    #[value(name = "wcett")]
    Wcett,
    #[value(name = "wcett_lb_post")]
    WcettLbPost,
    #[value(name = "wcett_lb_pre")]
    WcettLbPre,
    #[value(name = "all")]
    All,
}

impl AlgorithmArg {
    fn algorithms(&self) -> Vec<Algorithm> {
        match self {
            AlgorithmArg::Hop => vec![Algorithm::HopCount],
            AlgorithmArg::Wcett => vec![Algorithm::Wcett],
            AlgorithmArg::WcettLbPost => vec![Algorithm::WcettLbPost],
            AlgorithmArg::WcettLbPre => vec![Algorithm::WcettLbPre],
            AlgorithmArg::All => Algorithm::ALL.to_vec(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let topology = Topology::from_key(cli.topology)
        .context("topology key must be 0 (small) or 1 (big)")?;
    if cli.duration == 0 {
        bail!("duration must be a positive number of seconds");
    }

    let mut net_config = NetConfig::default();
    let mut lb_params = LbParams::default();
    let file_config = match &cli.config {
        Some(path) => config::load_file(path)?,
        None => config::FileConfig::default(),
    };
    file_config.apply(&mut net_config, &mut lb_params);

    let duration = Duration::from_secs(file_config.duration_secs.unwrap_or(cli.duration));
    let base_load = file_config.base_load.unwrap_or(cli.load);
    let loads = file_config.loads.clone().unwrap_or_else(|| load_series(base_load));
    let max_in_flight = file_config.max_in_flight.unwrap_or(50);

    let plan = RunPlan {
        topology,
        loads: loads.clone(),
        duration,
        net_config,
        lb_params,
        max_in_flight,
    };

    let timestamp = chrono::Local::now().format("%m%d%H%M").to_string();
    let dir = report::results_dir(cli.out.as_deref(), &timestamp)?;

    info!(
        topology = topology.name(),
        ?loads,
        duration = ?duration,
        "simulation starting"
    );

    let mut report_doc = Report {
        parameters: Parameters {
            timestamp: timestamp.clone(),
            topology: topology.name().to_string(),
            duration: duration.as_secs(),
            loads,
        },
        algorithms: Default::default(),
    };

    for algorithm in cli.algorithm.algorithms() {
        let run = run_algorithm(algorithm, &plan)
            .with_context(|| format!("{} simulation failed", algorithm.label()))?;

        info!("{} error rate (%): {:?}", algorithm.label(), run.series.er);
        info!("{} throughput (Kbps): {:?}", algorithm.label(), run.series.throughput);
        info!("{} mean transit (s): {:?}", algorithm.label(), run.series.tx);

        if algorithm.kind().is_load_balanced() && !run.transits.is_empty() {
            report::write_transit_csv(&dir, algorithm.label(), &run.transits)?;
        }
        report_doc
            .algorithms
            .insert(algorithm.label().to_string(), run.series);
    }

    let path = report::write_json(&dir, &report_doc)?;
    info!(path = %path.display(), "simulation complete");
    Ok(())
}
