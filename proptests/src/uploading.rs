//! Property-based tests for tracking of uploading sectors.
//!
//! Tests the following invariants:
//! - Sectors of a single upload are returned in the order they were added
//! - Pending bytes always equal the number of visible sectors times the sector size
//! - A renewal makes the old and the new contract ID report identical state
//! - Finishing an upload removes exactly its own contribution

use crate::strategies::*;
use bus::UploadingSectorsCache;
use common::{ContractId, SECTOR_SIZE};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Sectors of one upload come back in insertion order.
    #[test]
    fn prop_sector_order_preserved(
        upload_id in upload_id_strategy(),
        fcid in contract_id_strategy(),
        roots in sector_roots_strategy(64),
    ) {
        let cache = UploadingSectorsCache::new();
        cache.track_upload(upload_id).unwrap();
        for root in &roots {
            cache.add_sector(upload_id, fcid, *root).unwrap();
        }

        prop_assert_eq!(cache.sectors(fcid), roots.clone());
        prop_assert_eq!(cache.pending_bytes(fcid), roots.len() as u64 * SECTOR_SIZE);
    }

    /// Uploads spread over several contracts are accounted per contract.
    #[test]
    fn prop_pending_matches_sectors(
        upload_id in upload_id_strategy(),
        uploads in sector_uploads_strategy(4, 64),
    ) {
        let fcids: Vec<ContractId> = (0..4u8).map(|i| ContractId::new([i; 32])).collect();
        let cache = UploadingSectorsCache::new();
        cache.track_upload(upload_id).unwrap();
        for (idx, root) in &uploads {
            cache.add_sector(upload_id, fcids[*idx], *root).unwrap();
        }

        for (i, fcid) in fcids.iter().enumerate() {
            let expected: Vec<_> = uploads
                .iter()
                .filter(|(idx, _)| *idx == i)
                .map(|(_, root)| *root)
                .collect();
            prop_assert_eq!(cache.pending_bytes(*fcid), expected.len() as u64 * SECTOR_SIZE);
            prop_assert_eq!(cache.sectors(*fcid), expected);
        }
    }

    /// Both sides of a renewal see the same pending bytes, regardless of
    /// whether sectors were added before or after the renewal.
    #[test]
    fn prop_renewal_transparency(
        upload_id in upload_id_strategy(),
        before in sector_roots_strategy(32),
        after in sector_roots_strategy(32),
    ) {
        let old = ContractId::new([1; 32]);
        let new = ContractId::new([2; 32]);
        let cache = UploadingSectorsCache::new();
        cache.track_upload(upload_id).unwrap();

        for root in &before {
            cache.add_sector(upload_id, old, *root).unwrap();
        }
        cache.add_renewal(new, old);
        for root in &after {
            cache.add_sector(upload_id, new, *root).unwrap();
        }

        let expected = (before.len() + after.len()) as u64 * SECTOR_SIZE;
        prop_assert_eq!(cache.pending_bytes(old), expected);
        prop_assert_eq!(cache.pending_bytes(new), expected);
        prop_assert_eq!(cache.sectors(old).len(), before.len() + after.len());
        prop_assert_eq!(cache.resolve_chain(old), (new, Some(old)));
    }

    /// Finishing one of two uploads leaves the other's sectors intact.
    #[test]
    fn prop_finish_removes_only_own_sectors(
        (id1, id2) in (upload_id_strategy(), upload_id_strategy())
            .prop_filter("distinct upload ids", |(a, b)| a != b),
        fcid in contract_id_strategy(),
        roots1 in sector_roots_strategy(32),
        roots2 in sector_roots_strategy(32),
    ) {
        let cache = UploadingSectorsCache::new();
        cache.track_upload(id1).unwrap();
        cache.track_upload(id2).unwrap();
        for root in &roots1 {
            cache.add_sector(id1, fcid, *root).unwrap();
        }
        for root in &roots2 {
            cache.add_sector(id2, fcid, *root).unwrap();
        }

        prop_assert_eq!(
            cache.pending_bytes(fcid),
            (roots1.len() + roots2.len()) as u64 * SECTOR_SIZE
        );

        cache.finish_upload(id1);
        prop_assert_eq!(cache.sectors(fcid), roots2.clone());
        prop_assert!(cache.add_sector(id1, fcid, roots2.first().copied().unwrap_or_default()).is_err());

        cache.finish_upload(id2);
        prop_assert_eq!(cache.pending_bytes(fcid), 0);
    }
}
