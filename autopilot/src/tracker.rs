//! Adaptive scan timeouts.
//!
//! Keeps the latencies of the most recent successful scans and derives the scan
//! timeout from a percentile of them, so slow host populations get more slack
//! and fast ones don't wait on dead hosts for longer than needed.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Minimum number of data points before the percentile is used.
pub const TRACKER_MIN_DATA_POINTS: usize = 25;

/// Number of data points kept in the sample buffer.
pub const TRACKER_NUM_DATA_POINTS: usize = 1000;

/// Percentile of observed latencies used as the timeout.
pub const TRACKER_TIMEOUT_PERCENTILE: f64 = 99.0;

/// Timeout used until enough data points are collected.
pub const TRACKER_DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Percentile tracker over a ring buffer of recent scan latencies.
#[derive(Debug)]
pub struct Tracker {
    min_data_points: usize,
    num_data_points: usize,
    percentile: f64,
    default_timeout: Duration,
    data: Mutex<VecDeque<Duration>>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(
            TRACKER_MIN_DATA_POINTS,
            TRACKER_NUM_DATA_POINTS,
            TRACKER_TIMEOUT_PERCENTILE,
            TRACKER_DEFAULT_TIMEOUT,
        )
    }
}

impl Tracker {
    pub fn new(
        min_data_points: usize,
        num_data_points: usize,
        percentile: f64,
        default_timeout: Duration,
    ) -> Self {
        let num_data_points = num_data_points.max(1);
        Self {
            min_data_points,
            num_data_points,
            percentile: percentile.clamp(0.0, 100.0),
            default_timeout,
            data: Mutex::new(VecDeque::with_capacity(num_data_points)),
        }
    }

    /// Add the latency of a successful scan, evicting the oldest one when full.
    pub fn add_data_point(&self, latency: Duration) {
        if latency.is_zero() {
            return;
        }
        let mut data = self.data.lock();
        if data.len() == self.num_data_points {
            data.pop_front();
        }
        data.push_back(latency);
    }

    /// Current scan timeout.
    pub fn timeout(&self) -> Duration {
        let mut sorted: Vec<Duration> = {
            let data = self.data.lock();
            if data.len() < self.min_data_points || data.is_empty() {
                return self.default_timeout;
            }
            data.iter().copied().collect()
        };
        sorted.sort_unstable();

        // nearest-rank percentile
        let n = sorted.len();
        let rank = (self.percentile * n as f64 / 100.0).ceil() as usize;
        sorted[rank.clamp(1, n) - 1]
    }

    /// Number of data points currently held.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
