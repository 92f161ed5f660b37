//! Autopilot - keeps the renter's view of the host network healthy.
//!
//! The autopilot periodically scans every known host to measure whether it is
//! reachable and how quickly it responds. Scan timeouts adapt to the latency
//! observed across the host population, and hosts that keep failing scans for
//! longer than the configured downtime are removed from the host set.
//!
//! - `tracker`: percentile-based scan timeout estimation
//! - `scanner`: bounded-concurrency host scans and the periodic scan loop
//! - `policy`: converts a tolerated downtime into a scan failure threshold
//! - `hosts`: the host store and prober the scanner depends on
//! - `config`: TOML + environment configuration

pub mod config;
pub mod hosts;
pub mod policy;
pub mod probe;
pub mod scanner;
pub mod tracker;

pub use policy::min_recent_scan_failures;
pub use scanner::{HostsPolicy, ScanError, ScanSummary, Scanner, ScannerSettings, run_scan_loop};
pub use tracker::Tracker;
