//! Shared proptest strategies for property-based testing.
//!
//! This module provides reusable strategies for generating:
//! - Contract IDs, sector roots and upload IDs
//! - Sequences of sector uploads across contracts
//! - Scan latencies

use common::{ContractId, Hash256, UploadId};
use proptest::prelude::*;
use std::time::Duration;

/// Generate a random contract ID.
pub fn contract_id_strategy() -> impl Strategy<Value = ContractId> {
    any::<[u8; 32]>().prop_map(ContractId::new)
}

/// Generate a random sector root.
pub fn sector_root_strategy() -> impl Strategy<Value = Hash256> {
    any::<[u8; 32]>().prop_map(Hash256::new)
}

/// Generate a random upload ID.
pub fn upload_id_strategy() -> impl Strategy<Value = UploadId> {
    any::<[u8; 8]>().prop_map(UploadId::new)
}

/// Generate a list of sector roots to upload to a single contract.
pub fn sector_roots_strategy(max_len: usize) -> impl Strategy<Value = Vec<Hash256>> {
    prop::collection::vec(sector_root_strategy(), 0..=max_len)
}

/// Generate a sequence of (contract index, root) uploads spread over
/// `num_contracts` contracts.
pub fn sector_uploads_strategy(
    num_contracts: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<(usize, Hash256)>> {
    prop::collection::vec((0..num_contracts, sector_root_strategy()), 0..=max_len)
}

/// Generate a non-zero scan latency up to 10 seconds.
pub fn latency_strategy() -> impl Strategy<Value = Duration> {
    (1u64..10_000).prop_map(Duration::from_millis)
}
