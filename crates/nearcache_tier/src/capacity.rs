// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

/// The entry bound of a local tier.
///
/// Configuration surfaces express capacity as a signed integer where `-1` means
/// unbounded; [`Capacity::from_raw`] converts that form.
///
/// # Examples
///
/// ```
/// use nearcache_tier::Capacity;
///
/// assert_eq!(Capacity::from_raw(-1), Some(Capacity::Unbounded));
/// assert_eq!(Capacity::from_raw(100), Some(Capacity::Bounded(100)));
/// assert_eq!(Capacity::from_raw(-7), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capacity {
    /// No eviction takes place.
    Unbounded,
    /// At most this many entries are held.
    Bounded(u64),
}

impl Capacity {
    /// Raw configuration value that stands for [`Capacity::Unbounded`].
    pub const UNBOUNDED_RAW: i64 = -1;

    /// Parses the raw configuration form.
    ///
    /// Returns `None` for negative values other than [`Self::UNBOUNDED_RAW`].
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            Self::UNBOUNDED_RAW => Some(Self::Unbounded),
            bound => u64::try_from(bound).ok().map(Self::Bounded),
        }
    }

    /// Returns the raw configuration form.
    #[must_use]
    pub fn to_raw(self) -> i64 {
        match self {
            Self::Unbounded => Self::UNBOUNDED_RAW,
            Self::Bounded(bound) => i64::try_from(bound).unwrap_or(i64::MAX),
        }
    }

    /// Returns the bound, or `None` when unbounded.
    #[must_use]
    pub fn bound(self) -> Option<u64> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(bound) => Some(bound),
        }
    }

    /// Returns `true` for [`Capacity::Bounded`].
    #[must_use]
    pub fn is_bounded(self) -> bool {
        matches!(self, Self::Bounded(_))
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Bounded(bound) => write!(f, "{bound} entries"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip_for_accepted_values() {
        for raw in [-1, 0, 1, 4096] {
            let capacity = Capacity::from_raw(raw).expect("accepted raw value");
            assert_eq!(capacity.to_raw(), raw);
        }
    }

    #[test]
    fn bound_reports_limit() {
        assert_eq!(Capacity::Bounded(10).bound(), Some(10));
        assert_eq!(Capacity::Unbounded.bound(), None);
        assert!(Capacity::Bounded(0).is_bounded());
        assert!(!Capacity::Unbounded.is_bounded());
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Capacity::Unbounded.to_string(), "unbounded");
        assert_eq!(Capacity::Bounded(3).to_string(), "3 entries");
    }
}
