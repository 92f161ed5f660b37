//! Property-based tests for the scan timeout tracker.
//!
//! Tests the following invariants:
//! - The timeout is always one of the retained latencies once enough are recorded
//! - Only the most recent `num_data_points` latencies influence the timeout
//! - A higher percentile never yields a lower timeout

use crate::strategies::*;
use autopilot::Tracker;
use proptest::prelude::*;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The timeout is drawn from the recorded latencies, bounded by their range.
    #[test]
    fn prop_timeout_is_observed_latency(
        latencies in prop::collection::vec(latency_strategy(), 1..200),
        percentile in 1.0f64..=100.0,
    ) {
        let tracker = Tracker::new(1, 1000, percentile, DEFAULT_TIMEOUT);
        for l in &latencies {
            tracker.add_data_point(*l);
        }

        let timeout = tracker.timeout();
        prop_assert!(latencies.contains(&timeout));
        prop_assert!(timeout <= *latencies.iter().max().unwrap());
        prop_assert!(timeout >= *latencies.iter().min().unwrap());
    }

    /// Below the minimum number of data points the default is used.
    #[test]
    fn prop_default_below_min_data_points(
        latencies in prop::collection::vec(latency_strategy(), 0..25),
    ) {
        let tracker = Tracker::new(25, 1000, 99.0, DEFAULT_TIMEOUT);
        for l in &latencies {
            tracker.add_data_point(*l);
        }
        prop_assert_eq!(tracker.timeout(), DEFAULT_TIMEOUT);
    }

    /// Only the most recent window of latencies counts.
    #[test]
    fn prop_window_holds_most_recent(
        latencies in prop::collection::vec(latency_strategy(), 1..300),
        capacity in 1usize..50,
    ) {
        let tracker = Tracker::new(1, capacity, 100.0, DEFAULT_TIMEOUT);
        for l in &latencies {
            tracker.add_data_point(*l);
        }

        let window = &latencies[latencies.len().saturating_sub(capacity)..];
        prop_assert_eq!(tracker.len(), window.len());
        prop_assert_eq!(tracker.timeout(), *window.iter().max().unwrap());
    }

    /// The timeout is monotonic in the percentile.
    #[test]
    fn prop_percentile_monotonic(
        latencies in prop::collection::vec(latency_strategy(), 1..200),
        p1 in 1.0f64..=100.0,
        p2 in 1.0f64..=100.0,
    ) {
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let low = Tracker::new(1, 1000, lo, DEFAULT_TIMEOUT);
        let high = Tracker::new(1, 1000, hi, DEFAULT_TIMEOUT);
        for l in &latencies {
            low.add_data_point(*l);
            high.add_data_point(*l);
        }
        prop_assert!(low.timeout() <= high.timeout());
    }
}
