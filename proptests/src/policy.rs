//! Property-based tests for the offline host policy.
//!
//! Tests the following invariants:
//! - The failure threshold never decreases as the tolerated downtime grows
//! - Downtime shorter than one scan interval tolerates no failures
//! - The threshold depends only on the ratio of downtime to scan interval

use autopilot::min_recent_scan_failures;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_monotonic_in_downtime(
        interval_secs in 1u64..1_000_000,
        d1 in 0u64..100_000_000,
        d2 in 0u64..100_000_000,
    ) {
        let (lo, hi) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
        let interval = Duration::from_secs(interval_secs);
        prop_assert!(
            min_recent_scan_failures(interval, Duration::from_secs(lo))
                <= min_recent_scan_failures(interval, Duration::from_secs(hi))
        );
    }

    #[test]
    fn prop_zero_below_one_interval(
        interval_secs in 1u64..1_000_000,
        fraction in 0.0f64..0.999,
    ) {
        let interval = Duration::from_secs(interval_secs);
        let downtime = interval.mul_f64(fraction);
        prop_assert_eq!(min_recent_scan_failures(interval, downtime), 0);
    }

    #[test]
    fn prop_scale_invariant(
        interval_secs in 1u64..100_000,
        scans in 0u64..1_000,
        factor in 1u64..100,
    ) {
        let a = min_recent_scan_failures(
            Duration::from_secs(interval_secs),
            Duration::from_secs(interval_secs * scans),
        );
        let b = min_recent_scan_failures(
            Duration::from_secs(interval_secs * factor),
            Duration::from_secs(interval_secs * scans * factor),
        );
        prop_assert_eq!(a, b);
        prop_assert!(a <= scans);
    }
}
