//! Results document and per-packet transit tables.
//!
//! One JSON file per invocation, written under
//! `<out>/simulation_results/results_<MMDDHHMM>/`. The document carries the
//! run parameters plus one `{er, throughput, tx}` series per algorithm, each
//! indexed by the load series. Load-balancing variants additionally get a
//! `<algo>_transit_times.csv` with one row per delivered packet.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use lattice_net::PacketId;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Run parameters echoed into the results document.
#[derive(Debug, Clone, Serialize)]
pub struct Parameters {
    /// `MMDDHHMM` start-of-run stamp, also used in the directory name.
    pub timestamp: String,
    pub topology: String,
    /// Per-load run duration in seconds.
    pub duration: u64,
    /// Offered loads in packets per second.
    pub loads: Vec<f64>,
}

/// Per-algorithm metric series, one entry per load.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AlgoSeries {
    /// Error rate, percent.
    pub er: Vec<f64>,
    /// Throughput, Kbps.
    pub throughput: Vec<f64>,
    /// Mean end-to-end transit time, seconds.
    pub tx: Vec<f64>,
}

/// The full results document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub parameters: Parameters,
    #[serde(flatten)]
    pub algorithms: BTreeMap<String, AlgoSeries>,
}

/// Create (if needed) and return the timestamped results directory.
pub fn results_dir(base: Option<&Path>, timestamp: &str) -> Result<PathBuf, ReportError> {
    let mut dir = match base {
        Some(base) => base.join("simulation_results"),
        None => PathBuf::from("simulation_results"),
    };
    dir.push(format!("results_{timestamp}"));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Write the results document as pretty JSON; returns the file path.
pub fn write_json(dir: &Path, report: &Report) -> Result<PathBuf, ReportError> {
    let path = dir.join("results.json");
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    info!(path = %path.display(), "results written");
    Ok(path)
}

/// Write one `packet_id,transmission_time_seconds` row per delivered packet.
pub fn write_transit_csv(
    dir: &Path,
    algorithm: &str,
    transits: &[(PacketId, f64)],
) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("{algorithm}_transit_times.csv"));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["packet_id", "transmission_time_seconds"])?;
    for (id, transit) in transits {
        writer.write_record(&[id.to_string(), format!("{transit:.6}")])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = transits.len(), "transit times written");
    Ok(path)
}
