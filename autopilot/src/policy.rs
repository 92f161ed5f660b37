//! Offline host policy.

use std::time::Duration;

/// Minimum number of consecutive recent scan failures before a host that has
/// been down for `max_downtime` may be removed, given hosts are scanned once
/// every `scan_interval`.
///
/// Not every scan within the downtime window is required to fail: the
/// threshold is five sevenths of the scans that fit in the window, rounded up,
/// which allows for scans that were skipped or delayed. A downtime shorter than
/// one scan interval yields 0.
pub fn min_recent_scan_failures(scan_interval: Duration, max_downtime: Duration) -> u64 {
    if scan_interval.is_zero() {
        return 0;
    }
    let scans =
        u64::try_from(max_downtime.as_nanos() / scan_interval.as_nanos()).unwrap_or(u64::MAX);
    scans.saturating_mul(5).div_ceil(7)
}
