//! Accumulated warping cost newtype.

use std::cmp::Ordering;
use std::fmt;

/// Accumulated cost of a warping path. Lower is a better match.
///
/// [`Score::NO_MATCH`] (negative infinity) is reported when a pairing
/// produced no hypothesis at all.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    /// Sentinel reported as the best score of an empty hypothesis list.
    pub const NO_MATCH: Self = Self(f64::NEG_INFINITY);

    /// Create a score from a raw accumulated cost.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw accumulated cost.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return true unless this is the [`Score::NO_MATCH`] sentinel.
    #[must_use]
    pub fn is_match(self) -> bool {
        self.0 != f64::NEG_INFINITY
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
