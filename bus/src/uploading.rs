//! Tracking of sectors uploaded by ongoing uploads.
//!
//! Workers register an upload with `track_upload`, report every sector they push
//! to a host with `add_sector`, and call `finish_upload` once the object has been
//! persisted. Until then, the sectors count against the capacity of the contract
//! they were uploaded to (`pending_bytes`) and are visible to repair logic
//! (`sectors`), so the same data isn't uploaded twice.
//!
//! # Renewals
//!
//! A contract can be renewed while an upload is in flight. Sectors uploaded
//! before the renewal are recorded under the old ID, sectors uploaded afterwards
//! under the new one. Queries resolve the renewal in both directions, so asking
//! about either ID yields the same answer. Only one renewal hop is kept per
//! contract: inserting a renewal drops the edge two hops back, which is fine as
//! long as a contract doesn't renew twice within the course of one upload.
//!
//! # Expiry
//!
//! Uploads whose worker crashed never get finished. Such uploads are ignored by
//! all queries once they are older than the expiry, and are removed the next time
//! any upload finishes.
//!
//! # Locking
//!
//! One lock guards the upload map and the renewal maps, and every upload has its
//! own lock for its sectors. Adding sectors to one upload never contends with
//! another upload beyond looking up the upload itself.

use common::{ContractId, Hash256, SECTOR_SIZE, UploadId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{BusError, Result};

/// Age after which an unfinished upload is ignored and pruned.
pub const UPLOAD_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Sectors uploaded so far by a single upload.
#[derive(Debug)]
struct OngoingUpload {
    started: Instant,
    contract_sectors: Mutex<HashMap<ContractId, Vec<Hash256>>>,
}

impl OngoingUpload {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            contract_sectors: Mutex::new(HashMap::new()),
        }
    }

    fn is_expired(&self, expiry: Duration) -> bool {
        self.started.elapsed() >= expiry
    }

    fn add_sector(&self, fcid: ContractId, root: Hash256) {
        self.contract_sectors
            .lock()
            .entry(fcid)
            .or_default()
            .push(root);
    }

    /// Number of sectors uploaded to the given contract, zero once expired.
    fn sector_count(&self, fcid: &ContractId, expiry: Duration) -> usize {
        if self.is_expired(expiry) {
            return 0;
        }
        self.contract_sectors.lock().get(fcid).map_or(0, Vec::len)
    }

    /// Append the sectors uploaded to the given contract to `roots`.
    fn extend_sectors(&self, fcid: &ContractId, expiry: Duration, roots: &mut Vec<Hash256>) {
        if self.is_expired(expiry) {
            return;
        }
        if let Some(sectors) = self.contract_sectors.lock().get(fcid) {
            roots.extend_from_slice(sectors);
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    uploads: HashMap<UploadId, Arc<OngoingUpload>>,
    /// renewal -> contract it was renewed from
    renewed_from: HashMap<ContractId, ContractId>,
    /// contract -> its renewal
    renewed_to: HashMap<ContractId, ContractId>,
}

/// Registry of ongoing uploads and the sectors they have pushed per contract.
#[derive(Debug)]
pub struct UploadingSectorsCache {
    inner: Mutex<CacheInner>,
    expiry: Duration,
}

impl Default for UploadingSectorsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadingSectorsCache {
    /// Create an empty cache using the default 24h expiry.
    pub fn new() -> Self {
        Self::with_expiry(UPLOAD_EXPIRY)
    }

    /// Create an empty cache with a custom upload expiry.
    pub fn with_expiry(expiry: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            expiry,
        }
    }

    /// Start tracking an upload.
    pub fn track_upload(&self, upload_id: UploadId) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.uploads.contains_key(&upload_id) {
            return Err(BusError::UploadAlreadyExists(upload_id));
        }
        inner
            .uploads
            .insert(upload_id, Arc::new(OngoingUpload::new()));
        debug!(upload_id = %upload_id, "Tracking upload");
        Ok(())
    }

    /// Record a sector the upload pushed to the given contract.
    pub fn add_sector(&self, upload_id: UploadId, fcid: ContractId, root: Hash256) -> Result<()> {
        let ongoing = self
            .inner
            .lock()
            .uploads
            .get(&upload_id)
            .cloned()
            .ok_or(BusError::UnknownUpload(upload_id))?;
        ongoing.add_sector(fcid, root);
        Ok(())
    }

    /// Record that `renewed` is the renewal of `renewed_from`.
    pub fn add_renewal(&self, renewed: ContractId, renewed_from: ContractId) {
        let mut inner = self.inner.lock();

        // drop the grandparent edge to bound memory, only valid as long as a
        // contract doesn't renew twice during one upload
        if let Some(prev) = inner.renewed_from.remove(&renewed_from) {
            inner.renewed_to.remove(&prev);
        }

        inner.renewed_from.insert(renewed, renewed_from);
        inner.renewed_to.insert(renewed_from, renewed);
        debug!(renewed = %renewed, renewed_from = %renewed_from, "Added contract renewal");
    }

    /// Resolve a contract to the newest known ID of its renewal chain and the ID
    /// that one was renewed from, if any.
    pub fn resolve_chain(&self, fcid: ContractId) -> (ContractId, Option<ContractId>) {
        let inner = self.inner.lock();
        match inner.renewed_to.get(&fcid) {
            Some(renewed) => (*renewed, Some(fcid)),
            None => (fcid, inner.renewed_from.get(&fcid).copied()),
        }
    }

    /// Number of bytes uploaded to the contract, or its renewal chain, by
    /// uploads that haven't finished yet.
    pub fn pending_bytes(&self, fcid: ContractId) -> u64 {
        let (fcid, renewed_from) = self.resolve_chain(fcid);
        let sectors: usize = self
            .snapshot()
            .iter()
            .map(|ongoing| {
                let mut n = ongoing.sector_count(&fcid, self.expiry);
                if let Some(prev) = &renewed_from {
                    n += ongoing.sector_count(prev, self.expiry);
                }
                n
            })
            .sum();
        sectors as u64 * SECTOR_SIZE
    }

    /// Roots of the sectors uploaded to the contract, or its renewal chain, by
    /// uploads that haven't finished yet.
    pub fn sectors(&self, fcid: ContractId) -> Vec<Hash256> {
        let (fcid, renewed_from) = self.resolve_chain(fcid);
        let mut roots = Vec::new();
        for ongoing in self.snapshot() {
            ongoing.extend_sectors(&fcid, self.expiry, &mut roots);
            if let Some(prev) = &renewed_from {
                ongoing.extend_sectors(prev, self.expiry, &mut roots);
            }
        }
        roots
    }

    /// Stop tracking an upload, pruning any other upload that expired.
    pub fn finish_upload(&self, upload_id: UploadId) {
        let mut inner = self.inner.lock();
        inner.uploads.remove(&upload_id);

        let before = inner.uploads.len();
        let expiry = self.expiry;
        inner.uploads.retain(|_, ongoing| !ongoing.is_expired(expiry));
        let pruned = before - inner.uploads.len();

        debug!(upload_id = %upload_id, pruned, "Finished upload");
    }

    /// Number of uploads currently tracked, including expired ones not yet pruned.
    pub fn ongoing_uploads(&self) -> usize {
        self.inner.lock().uploads.len()
    }

    fn snapshot(&self) -> Vec<Arc<OngoingUpload>> {
        self.inner.lock().uploads.values().cloned().collect()
    }
}
