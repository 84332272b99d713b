//! Aggregate version numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number of the last event applied to an aggregate.
///
/// Versions start at [`Version::NONE`] (`-1`) for an aggregate that has never
/// been persisted and advance by exactly one per event, regardless of which
/// entity in the tree the event targets. The first event of a stream therefore
/// has version `0`.
///
/// # Examples
///
/// ```
/// use composable_aggregate_core::version::Version;
///
/// let v = Version::NONE;
/// assert!(v.is_none());
/// assert_eq!(v.next(), Version::new(0));
/// assert_eq!(Version::new(4) + 3, Version::new(7));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(i64);

impl Version {
    /// The version of an aggregate with no committed events.
    pub const NONE: Self = Self(-1);

    /// Create a version with the given value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true if no event has been committed yet.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 < 0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Advance by a number of events.
impl std::ops::Add<usize> for Version {
    type Output = Self;

    #[allow(clippy::cast_possible_wrap)] // event counts never approach i64::MAX
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_none() {
        assert_eq!(Version::default(), Version::NONE);
        assert!(Version::NONE.is_none());
        assert!(!Version::new(0).is_none());
    }

    #[test]
    fn next_version() {
        let v0 = Version::NONE.next();
        assert_eq!(v0, Version::new(0));
        assert_eq!(v0.next(), Version::new(1));
    }

    #[test]
    fn version_arithmetic_and_ordering() {
        assert_eq!(Version::NONE + 1, Version::new(0));
        assert_eq!(Version::new(5) + 3, Version::new(8));
        assert!(Version::NONE < Version::new(0));
    }

    #[test]
    fn conversions_and_display() {
        let version = Version::from(42_i64);
        assert_eq!(version.value(), 42);
        assert_eq!(i64::from(version), 42);
        assert_eq!(format!("{}", Version::NONE), "-1");
    }
}
