//! Property-based tests for the renter coordination layer.
//!
//! This crate contains proptest-based property tests for verifying
//! invariants of the bus and autopilot components.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all property tests
//! cargo test -p proptests
//!
//! # Run with more test cases (slower but more thorough)
//! PROPTEST_CASES=10000 cargo test -p proptests
//!
//! # Run specific test module
//! cargo test -p proptests uploading
//! ```
//!
//! ## Test Categories
//!
//! - **Uploading tests**: sector tracking (ordering, renewals, finishing uploads)
//! - **Tracker tests**: percentile timeouts (bounds, window, percentile ordering)
//! - **Policy tests**: scan failure threshold (monotonicity, scaling)

// Re-export common for use in test modules
pub use common;

/// Shared test strategies and helpers.
pub mod strategies;

// Test modules
#[cfg(test)]
mod policy;
#[cfg(test)]
mod tracker;
#[cfg(test)]
mod uploading;
