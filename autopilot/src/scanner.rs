//! Host scanner - pages through the host directory and scans every host.
//!
//! A scan is a sweep over all hosts returned by the host store, fanned out to
//! at most `scan_threads` concurrent probes. Each probe uses a timeout derived
//! from the latencies of previous successful probes (see `tracker`), and every
//! outcome is recorded in the host store. Once a sweep completes, hosts that
//! have been offline for longer than the tolerated downtime are removed.
//!
//! Only one sweep runs at a time, and a new sweep is only started if the
//! previous one started at least `scan_min_interval` ago. Requests that arrive
//! while scanning or too early are dropped, not queued.

use common::HostAddress;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::hosts::{HostProber, HostScan, HostStore};
use crate::policy::min_recent_scan_failures;
use crate::tracker::Tracker;

/// Errors that abort a host scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The host store failed to return a page of hosts
    #[error("failed to fetch hosts for scanning at offset {offset}: {source}")]
    HostListing {
        offset: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// Static scanner parameters.
#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Number of hosts requested from the host store per page
    pub scan_batch_size: usize,
    /// Maximum number of concurrent probes
    pub scan_threads: usize,
    /// Minimum time between the start of two scans
    pub scan_min_interval: Duration,
    /// Lower bound on the probe timeout
    pub min_timeout: Duration,
}

/// Per-scan host policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostsPolicy {
    /// How often hosts are scanned
    pub scan_interval: Duration,
    /// Downtime after which a host is removed, zero disables removal
    pub max_downtime: Duration,
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Pages requested from the host store
    pub pages: usize,
    /// Hosts probed
    pub scanned: usize,
    /// Probes that failed
    pub failed: usize,
    /// Whether paging stopped early because of shutdown
    pub interrupted: bool,
    /// Hosts removed for being offline
    pub removed: u64,
}

#[derive(Debug, Default)]
struct ScanState {
    scanning: bool,
    last_start: Option<Instant>,
}

/// Clears the scanning flag when the sweep ends, however it ends, including
/// when the task is dropped before it was first polled.
struct ScanningGuard {
    scanner: Arc<Scanner>,
}

impl Drop for ScanningGuard {
    fn drop(&mut self) {
        self.scanner.state.lock().scanning = false;
    }
}

pub struct Scanner {
    hosts: Arc<dyn HostStore>,
    prober: Arc<dyn HostProber>,
    tracker: Arc<Tracker>,
    settings: ScannerSettings,
    state: Mutex<ScanState>,
    shutdown: watch::Receiver<bool>,
}

impl Scanner {
    pub fn new(
        hosts: Arc<dyn HostStore>,
        prober: Arc<dyn HostProber>,
        tracker: Arc<Tracker>,
        settings: ScannerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            hosts,
            prober,
            tracker,
            settings,
            state: Mutex::new(ScanState::default()),
            shutdown,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scanning
    }

    /// Start time of the most recent scan.
    pub fn last_scan_start(&self) -> Option<Instant> {
        self.state.lock().last_start
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Start a scan in the background unless one is running or the previous
    /// one started less than `scan_min_interval` ago.
    ///
    /// Returns the handle of the started scan, `None` if the request was dropped.
    pub fn try_perform_host_scan(
        self: &Arc<Self>,
        policy: HostsPolicy,
    ) -> Option<JoinHandle<Result<ScanSummary, ScanError>>> {
        {
            let mut state = self.state.lock();
            if state.scanning {
                debug!("Host scan already in progress");
                return None;
            }
            if let Some(last) = state.last_start
                && last.elapsed() < self.settings.scan_min_interval
            {
                debug!(
                    since_last_secs = last.elapsed().as_secs(),
                    min_interval_secs = self.settings.scan_min_interval.as_secs(),
                    "Skipping host scan, previous scan too recent"
                );
                return None;
            }
            state.scanning = true;
            state.last_start = Some(Instant::now());
        }

        let guard = ScanningGuard {
            scanner: self.clone(),
        };
        Some(tokio::spawn(async move {
            let scanner = guard.scanner.clone();
            let result = scanner.perform_host_scan(policy).await;
            drop(guard);
            result
        }))
    }

    async fn perform_host_scan(&self, policy: HostsPolicy) -> Result<ScanSummary, ScanError> {
        let started = Instant::now();
        let batch_size = self.settings.scan_batch_size.max(1);
        let threads = self.settings.scan_threads.max(1);

        info!(
            batch_size,
            threads,
            timeout_ms = self.probe_timeout().as_millis() as u64,
            "Starting host scan"
        );

        let semaphore = Arc::new(Semaphore::new(threads));
        let mut probes = JoinSet::new();
        let mut summary = ScanSummary::default();
        let mut listing_error = None;
        let mut offset = 0;

        loop {
            if *self.shutdown.borrow() {
                info!(offset, "Shutdown requested, interrupting host scan");
                summary.interrupted = true;
                break;
            }

            let hosts = match self.hosts.hosts_for_scanning(offset, batch_size).await {
                Ok(hosts) => hosts,
                Err(source) => {
                    listing_error = Some(ScanError::HostListing { offset, source });
                    break;
                }
            };
            summary.pages += 1;
            let page_len = hosts.len();

            for host in hosts {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                let store = self.hosts.clone();
                let prober = self.prober.clone();
                let tracker = self.tracker.clone();
                let min_timeout = self.settings.min_timeout;
                probes.spawn(async move {
                    let _permit = permit;
                    scan_host(store.as_ref(), prober.as_ref(), &tracker, min_timeout, host).await
                });
            }

            if page_len < batch_size {
                break;
            }
            offset += batch_size;
        }

        // in-flight probes are allowed to finish
        while let Some(result) = probes.join_next().await {
            summary.scanned += 1;
            match result {
                Ok(true) => {}
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    warn!(error = %e, "Host scan task failed");
                    summary.failed += 1;
                }
            }
        }

        if let Some(err) = listing_error {
            error!(
                error = %err,
                scanned = summary.scanned,
                "Host scan aborted"
            );
            return Err(err);
        }

        if !summary.interrupted && !policy.max_downtime.is_zero() {
            let min_failures = min_recent_scan_failures(policy.scan_interval, policy.max_downtime);
            match self
                .hosts
                .remove_offline_hosts(min_failures, policy.max_downtime)
                .await
            {
                Ok(removed) => {
                    summary.removed = removed;
                    if removed > 0 {
                        info!(
                            removed,
                            min_recent_scan_failures = min_failures,
                            max_downtime_hours = policy.max_downtime.as_secs() / 3600,
                            "Removed offline hosts"
                        );
                    }
                }
                Err(e) => warn!(error = %e, "Failed to remove offline hosts"),
            }
        }

        info!(
            pages = summary.pages,
            scanned = summary.scanned,
            failed = summary.failed,
            interrupted = summary.interrupted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Host scan finished"
        );
        Ok(summary)
    }

    fn probe_timeout(&self) -> Duration {
        self.tracker.timeout().max(self.settings.min_timeout)
    }
}

/// Probe a single host and record the outcome. Returns whether the host was reachable.
async fn scan_host(
    store: &dyn HostStore,
    prober: &dyn HostProber,
    tracker: &Tracker,
    min_timeout: Duration,
    host: HostAddress,
) -> bool {
    let timeout = tracker.timeout().max(min_timeout);

    let scan = match prober
        .probe(host.public_key, &host.net_address, timeout)
        .await
    {
        Ok(latency) => {
            tracker.add_data_point(latency);
            debug!(
                host = %host.public_key,
                latency_ms = latency.as_millis() as u64,
                "Host scan succeeded"
            );
            HostScan {
                host_key: host.public_key,
                success: true,
                latency,
                timestamp: SystemTime::now(),
            }
        }
        Err(e) => {
            debug!(
                host = %host.public_key,
                net_address = %host.net_address,
                timeout_ms = timeout.as_millis() as u64,
                error = %e,
                "Host scan failed"
            );
            HostScan {
                host_key: host.public_key,
                success: false,
                latency: Duration::ZERO,
                timestamp: SystemTime::now(),
            }
        }
    };

    let success = scan.success;
    if let Err(e) = store.record_scan(scan).await {
        warn!(host = %host.public_key, error = %e, "Failed to record host scan");
    }
    success
}

/// Periodically try to start a host scan until shutdown is signalled.
pub async fn run_scan_loop(
    scanner: Arc<Scanner>,
    policy: HostsPolicy,
    check_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        check_interval_secs = check_interval.as_secs(),
        scan_interval_secs = policy.scan_interval.as_secs(),
        max_downtime_hours = policy.max_downtime.as_secs() / 3600,
        "Scan loop started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(handle) = scanner.try_perform_host_scan(policy) else {
                    continue;
                };
                match handle.await {
                    Ok(Ok(summary)) => debug!(?summary, "Host scan completed"),
                    Ok(Err(e)) => warn!(error = %e, "Host scan failed"),
                    Err(e) => error!(error = %e, "Host scan task panicked"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Scan loop stopped");
}
