//! Host directory and prober interfaces used by the scanner.
//!
//! The scanner only needs to page through hosts, record scan outcomes and
//! remove hosts that have been offline for too long. `MemoryHostStore` is an
//! in-memory implementation of that directory, seeded from configuration.

use anyhow::Result;
use async_trait::async_trait;
use common::{HostAddress, PublicKey};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Outcome of scanning a single host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScan {
    pub host_key: PublicKey,
    pub success: bool,
    /// Round-trip latency, zero for failed scans
    pub latency: Duration,
    pub timestamp: SystemTime,
}

/// Directory of hosts known to the renter.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Page through the hosts that should be scanned. Paging is stable for the
    /// duration of one scan.
    async fn hosts_for_scanning(&self, offset: usize, limit: usize) -> Result<Vec<HostAddress>>;

    /// Record the outcome of a scan.
    async fn record_scan(&self, scan: HostScan) -> Result<()>;

    /// Remove hosts that failed at least `min_recent_scan_failures` scans in a
    /// row and have been offline for at least `max_downtime`. Returns the
    /// number of hosts removed.
    async fn remove_offline_hosts(
        &self,
        min_recent_scan_failures: u64,
        max_downtime: Duration,
    ) -> Result<u64>;
}

/// Performs the network round-trip against a host.
#[async_trait]
pub trait HostProber: Send + Sync {
    /// Scan the host, giving up after `timeout`. Returns the observed latency.
    async fn probe(
        &self,
        host_key: PublicKey,
        net_address: &str,
        timeout: Duration,
    ) -> Result<Duration>;
}

/// Scan history of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub net_address: String,
    pub last_scan: Option<SystemTime>,
    pub last_scan_success: bool,
    /// Latency of the last successful scan
    pub last_latency: Option<Duration>,
    /// Consecutive failed scans, reset by a successful scan
    pub recent_scan_failures: u64,
    /// Time spent offline since the last successful scan
    pub recent_downtime: Duration,
    pub uptime: Duration,
    pub downtime: Duration,
}

impl HostRecord {
    fn new(net_address: String) -> Self {
        Self {
            net_address,
            last_scan: None,
            last_scan_success: false,
            last_latency: None,
            recent_scan_failures: 0,
            recent_downtime: Duration::ZERO,
            uptime: Duration::ZERO,
            downtime: Duration::ZERO,
        }
    }

    fn apply(&mut self, scan: &HostScan) {
        // attribute the time since the previous scan to the state it observed
        if let Some(prev) = self.last_scan {
            let elapsed = scan.timestamp.duration_since(prev).unwrap_or_default();
            if self.last_scan_success {
                self.uptime += elapsed;
            } else {
                self.downtime += elapsed;
                self.recent_downtime += elapsed;
            }
        }

        if scan.success {
            self.recent_scan_failures = 0;
            self.recent_downtime = Duration::ZERO;
            self.last_latency = Some(scan.latency);
        } else {
            self.recent_scan_failures += 1;
        }

        self.last_scan = Some(scan.timestamp);
        self.last_scan_success = scan.success;
    }
}

/// In-memory host directory ordered by public key.
#[derive(Debug, Default)]
pub struct MemoryHostStore {
    hosts: RwLock<BTreeMap<PublicKey, HostRecord>>,
}

impl MemoryHostStore {
    pub fn new(hosts: impl IntoIterator<Item = HostAddress>) -> Self {
        let store = Self::default();
        for host in hosts {
            store.add_host(host);
        }
        store
    }

    /// Add a host, keeping its history if it is already known.
    pub fn add_host(&self, host: HostAddress) {
        let mut hosts = self.hosts.write();
        match hosts.get_mut(&host.public_key) {
            Some(record) => record.net_address = host.net_address,
            None => {
                hosts.insert(host.public_key, HostRecord::new(host.net_address));
            }
        }
    }

    pub fn host(&self, host_key: &PublicKey) -> Option<HostRecord> {
        self.hosts.read().get(host_key).cloned()
    }

    pub fn len(&self) -> usize {
        self.hosts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HostStore for MemoryHostStore {
    async fn hosts_for_scanning(&self, offset: usize, limit: usize) -> Result<Vec<HostAddress>> {
        Ok(self
            .hosts
            .read()
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(key, record)| HostAddress {
                public_key: *key,
                net_address: record.net_address.clone(),
            })
            .collect())
    }

    async fn record_scan(&self, scan: HostScan) -> Result<()> {
        match self.hosts.write().get_mut(&scan.host_key) {
            Some(record) => record.apply(&scan),
            None => debug!(host = %scan.host_key, "Ignoring scan of unknown host"),
        }
        Ok(())
    }

    async fn remove_offline_hosts(
        &self,
        min_recent_scan_failures: u64,
        max_downtime: Duration,
    ) -> Result<u64> {
        let mut hosts = self.hosts.write();
        let before = hosts.len();
        hosts.retain(|key, record| {
            let offline = record.recent_scan_failures >= min_recent_scan_failures
                && record.recent_downtime >= max_downtime;
            if offline {
                info!(
                    host = %key,
                    net_address = %record.net_address,
                    recent_scan_failures = record.recent_scan_failures,
                    recent_downtime_secs = record.recent_downtime.as_secs(),
                    "Removing offline host"
                );
            }
            !offline
        });
        Ok((before - hosts.len()) as u64)
    }
}
