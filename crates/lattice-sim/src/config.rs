//! Optional TOML overrides for tuned constants.
//!
//! Every knob the simulator treats as configuration rather than semantics
//! can be overridden from a file passed with `--config`. Command-line flags
//! win over file values.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use lattice_net::NetConfig;
use lattice_routing::LbParams;

/// Overrides parsed from a TOML file. Absent fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Per-load run duration, seconds.
    pub duration_secs: Option<u64>,
    /// Base offered load, packets per second.
    pub base_load: Option<f64>,
    /// Explicit load series; overrides the derived one.
    pub loads: Option<Vec<f64>>,
    /// Data packet payload size, bytes.
    pub packet_size: Option<u32>,
    /// Concurrency cap on in-flight forwarding tasks.
    pub max_in_flight: Option<usize>,
    /// Congestion threshold σ.
    pub sigma: Option<f64>,
    /// Load-balance threshold δ.
    pub delta: Option<f64>,
    /// WCETT channel-diversity weight β.
    pub beta: Option<f64>,
    /// Router per-packet processing time, milliseconds.
    pub queue_process_ms: Option<u64>,
    /// Scale factor on `size / bandwidth` edge delays.
    pub edge_delay_scale: Option<f64>,
}

/// Parse a TOML override file.
pub fn load_file(path: &Path) -> Result<FileConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&body).with_context(|| format!("invalid config file {}", path.display()))
}

impl FileConfig {
    /// Fold the overrides into the runtime and metric parameter sets.
    pub fn apply(&self, net: &mut NetConfig, lb: &mut LbParams) {
        if let Some(size) = self.packet_size {
            net.data_packet_size = size;
            lb.packet_size = size;
        }
        if let Some(ms) = self.queue_process_ms {
            net.queue_process_time = Duration::from_millis(ms);
        }
        if let Some(scale) = self.edge_delay_scale {
            net.edge_delay_scale = scale;
        }
        if let Some(sigma) = self.sigma {
            lb.sigma = sigma;
        }
        if let Some(delta) = self.delta {
            lb.delta = delta;
        }
        if let Some(beta) = self.beta {
            lb.beta = beta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let cfg: FileConfig = toml::from_str("").unwrap();
        let mut net = NetConfig::default();
        let mut lb = LbParams::default();
        cfg.apply(&mut net, &mut lb);
        assert_eq!(net.data_packet_size, 1024);
        assert_eq!(lb.sigma, 0.5);
        assert_eq!(lb.delta, 0.4);
    }

    #[test]
    fn overrides_apply() {
        let cfg: FileConfig = toml::from_str(
            r#"
            duration_secs = 60
            base_load = 10.0
            packet_size = 512
            sigma = 0.8
            delta = 0.2
            queue_process_ms = 25
            edge_delay_scale = 0.005
            "#,
        )
        .unwrap();
        let mut net = NetConfig::default();
        let mut lb = LbParams::default();
        cfg.apply(&mut net, &mut lb);

        assert_eq!(cfg.duration_secs, Some(60));
        assert_eq!(cfg.base_load, Some(10.0));
        assert_eq!(net.data_packet_size, 512);
        assert_eq!(lb.packet_size, 512);
        assert_eq!(lb.sigma, 0.8);
        assert_eq!(lb.delta, 0.2);
        assert_eq!(net.queue_process_time, Duration::from_millis(25));
        assert_eq!(net.edge_delay_scale, 0.005);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<FileConfig, _> = toml::from_str("not_a_knob = 1");
        assert!(parsed.is_err());
    }
}
