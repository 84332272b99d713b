//! # Composable Aggregate Testing
//!
//! Testing utilities and helpers for event-sourced aggregates.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then harness for aggregate operations
//! - Assertion helpers for uncommitted changes
//! - Log output for tests
//!
//! ## Example
//!
//! ```ignore
//! use composable_aggregate_testing::{AggregateTest, assertions};
//!
//! #[test]
//! fn adding_a_line_records_one_change() {
//!     AggregateTest::<Order>::new()
//!         .given(order_history())
//!         .when(|order| order.add_line(LineId(3)))
//!         .then_state(|order| assert_eq!(order.lines.len(), 1))
//!         .then_uncommitted(|changes| {
//!             assertions::assert_event_types(changes, &["LineAdded.v1"]);
//!         })
//!         .run();
//! }
//! ```

use chrono::{DateTime, Utc};
use composable_aggregate_core::environment::Clock;


pub use aggregate_test::{AggregateTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making event timestamps reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_aggregate_testing::mocks::FixedClock;
    /// use composable_aggregate_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Route `tracing` output to the test harness.
///
/// Honors `RUST_LOG` (e.g. `RUST_LOG=composable_aggregate_core=trace`) and is
/// safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
