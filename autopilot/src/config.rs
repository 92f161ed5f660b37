//! Configuration loading for the autopilot.

use anyhow::{Context, bail};
use common::HostAddress;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::scanner::{HostsPolicy, ScannerSettings};
use crate::tracker::{
    TRACKER_MIN_DATA_POINTS, TRACKER_NUM_DATA_POINTS, TRACKER_TIMEOUT_PERCENTILE, Tracker,
};

/// Autopilot configuration loaded from TOML + environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct AutopilotConfig {
    /// How often every host is scanned, also the minimum time between two scans
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// How often the scan loop checks whether a scan is due
    #[serde(default = "default_scan_check_interval_secs")]
    pub scan_check_interval_secs: u64,

    /// Number of hosts fetched from the host store per page
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,

    /// Maximum number of hosts scanned concurrently
    #[serde(default = "default_scan_threads")]
    pub scan_threads: usize,

    /// Lower bound for the adaptive scan timeout
    #[serde(default = "default_scan_min_timeout_secs")]
    pub scan_min_timeout_secs: u64,

    /// Scan timeout used until enough latencies were observed
    #[serde(default = "default_scan_default_timeout_secs")]
    pub scan_default_timeout_secs: u64,

    /// Hosts offline for longer than this are removed (0 disables removal)
    #[serde(default = "default_max_downtime_hours")]
    pub max_downtime_hours: u64,

    /// Latencies required before the percentile timeout kicks in
    #[serde(default = "default_tracker_min_data_points")]
    pub tracker_min_data_points: usize,

    /// Number of latencies kept for the percentile
    #[serde(default = "default_tracker_num_data_points")]
    pub tracker_num_data_points: usize,

    /// Percentile of observed latencies used as scan timeout
    #[serde(default = "default_tracker_timeout_percentile")]
    pub tracker_timeout_percentile: f64,

    /// Hosts seeded into the host directory
    #[serde(default)]
    pub hosts: Vec<HostAddress>,
}

fn default_scan_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_scan_check_interval_secs() -> u64 {
    60
}

fn default_scan_batch_size() -> usize {
    100
}

fn default_scan_threads() -> usize {
    16
}

fn default_scan_min_timeout_secs() -> u64 {
    10
}

fn default_scan_default_timeout_secs() -> u64 {
    30
}

fn default_max_downtime_hours() -> u64 {
    14 * 24 // two weeks
}

fn default_tracker_min_data_points() -> usize {
    TRACKER_MIN_DATA_POINTS
}

fn default_tracker_num_data_points() -> usize {
    TRACKER_NUM_DATA_POINTS
}

fn default_tracker_timeout_percentile() -> f64 {
    TRACKER_TIMEOUT_PERCENTILE
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            scan_check_interval_secs: default_scan_check_interval_secs(),
            scan_batch_size: default_scan_batch_size(),
            scan_threads: default_scan_threads(),
            scan_min_timeout_secs: default_scan_min_timeout_secs(),
            scan_default_timeout_secs: default_scan_default_timeout_secs(),
            max_downtime_hours: default_max_downtime_hours(),
            tracker_min_data_points: default_tracker_min_data_points(),
            tracker_num_data_points: default_tracker_num_data_points(),
            tracker_timeout_percentile: default_tracker_timeout_percentile(),
            hosts: Vec::new(),
        }
    }
}

impl AutopilotConfig {
    /// Reject settings the scanner can't work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scan_batch_size == 0 {
            bail!("scan_batch_size must be greater than 0");
        }
        if self.scan_threads == 0 {
            bail!("scan_threads must be greater than 0");
        }
        if self.scan_check_interval_secs == 0 {
            bail!("scan_check_interval_secs must be greater than 0");
        }
        if self.tracker_num_data_points == 0 {
            bail!("tracker_num_data_points must be greater than 0");
        }
        if self.tracker_min_data_points > self.tracker_num_data_points {
            bail!(
                "tracker_min_data_points ({}) exceeds tracker_num_data_points ({})",
                self.tracker_min_data_points,
                self.tracker_num_data_points
            );
        }
        if !(self.tracker_timeout_percentile > 0.0 && self.tracker_timeout_percentile <= 100.0) {
            bail!(
                "tracker_timeout_percentile must be in (0, 100], got {}",
                self.tracker_timeout_percentile
            );
        }
        Ok(())
    }

    pub fn scanner_settings(&self) -> ScannerSettings {
        ScannerSettings {
            scan_batch_size: self.scan_batch_size,
            scan_threads: self.scan_threads,
            scan_min_interval: Duration::from_secs(self.scan_interval_secs),
            min_timeout: Duration::from_secs(self.scan_min_timeout_secs),
        }
    }

    pub fn hosts_policy(&self) -> HostsPolicy {
        HostsPolicy {
            scan_interval: Duration::from_secs(self.scan_interval_secs),
            max_downtime: Duration::from_secs(self.max_downtime_hours.saturating_mul(60 * 60)),
        }
    }

    pub fn tracker(&self) -> Tracker {
        Tracker::new(
            self.tracker_min_data_points,
            self.tracker_num_data_points,
            self.tracker_timeout_percentile,
            Duration::from_secs(self.scan_default_timeout_secs),
        )
    }

    pub fn scan_check_interval(&self) -> Duration {
        Duration::from_secs(self.scan_check_interval_secs)
    }
}

/// Load configuration from TOML file with environment variable overrides.
pub fn load_config(path: Option<&str>) -> anyhow::Result<AutopilotConfig> {
    let config_path = path.map(Path::new).or_else(|| {
        let default = Path::new("autopilot.toml");
        default.exists().then_some(default)
    });

    let config = match config_path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read config file {}", p.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", p.display()))?
        }
        None => AutopilotConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Read a variable through `lookup` and parse it, returning None if missing or parse fails.
fn env_parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn apply_env_overrides(
    mut config: AutopilotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AutopilotConfig {
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_SCAN_INTERVAL_SECS") {
        config.scan_interval_secs = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_SCAN_CHECK_INTERVAL_SECS") {
        config.scan_check_interval_secs = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_SCAN_BATCH_SIZE") {
        config.scan_batch_size = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_SCAN_THREADS") {
        config.scan_threads = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_SCAN_MIN_TIMEOUT_SECS") {
        config.scan_min_timeout_secs = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_SCAN_DEFAULT_TIMEOUT_SECS") {
        config.scan_default_timeout_secs = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_MAX_DOWNTIME_HOURS") {
        config.max_downtime_hours = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_TRACKER_MIN_DATA_POINTS") {
        config.tracker_min_data_points = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_TRACKER_NUM_DATA_POINTS") {
        config.tracker_num_data_points = v;
    }
    if let Some(v) = env_parse(&lookup, "AUTOPILOT_TRACKER_TIMEOUT_PERCENTILE") {
        config.tracker_timeout_percentile = v;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AutopilotConfig::default();
        assert_eq!(config.scan_interval_secs, 86_400);
        assert_eq!(config.scan_batch_size, 100);
        assert_eq!(config.max_downtime_hours, 336);
        assert!(config.validate().is_ok());

        let policy = config.hosts_policy();
        assert_eq!(policy.max_downtime, Duration::from_secs(14 * 24 * 3600));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
scan_batch_size = 40
scan_threads = 3

[[hosts]]
public_key = "{}"
net_address = "127.0.0.1:9982"
"#,
            "01".repeat(32)
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.scan_batch_size, 40);
        assert_eq!(config.scan_threads, 3);
        assert_eq!(config.scan_min_timeout_secs, 10);
        assert_eq!(config.hosts.len(), 1);
        assert_eq!(config.hosts[0].public_key.as_bytes(), &[1u8; 32]);
    }

    #[test]
    fn test_invalid_host_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[hosts]]
public_key = "not-hex"
net_address = "127.0.0.1:9982"
"#
        )
        .unwrap();

        assert!(load_config(file.path().to_str()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AUTOPILOT_SCAN_THREADS", "8"),
            ("AUTOPILOT_MAX_DOWNTIME_HOURS", " 24 "),
            ("AUTOPILOT_SCAN_BATCH_SIZE", "lots"),
        ]
        .into_iter()
        .collect();

        let config = apply_env_overrides(AutopilotConfig::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        });
        assert_eq!(config.scan_threads, 8);
        assert_eq!(config.max_downtime_hours, 24);
        // unparsable values are ignored
        assert_eq!(config.scan_batch_size, 100);
    }

    #[test]
    fn test_huge_max_downtime_saturates() {
        let config = apply_env_overrides(AutopilotConfig::default(), |key| {
            (key == "AUTOPILOT_MAX_DOWNTIME_HOURS").then(|| u64::MAX.to_string())
        });
        assert_eq!(config.max_downtime_hours, u64::MAX);
        assert!(config.validate().is_ok());
        assert_eq!(config.hosts_policy().max_downtime, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_validate() {
        let config = AutopilotConfig {
            scan_threads: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AutopilotConfig {
            tracker_min_data_points: 2000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AutopilotConfig {
            tracker_timeout_percentile: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
