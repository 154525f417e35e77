//! Per-policy step rules consumed by the shared trellis fill.

use crate::config::{AlignConfig, Policy};
use crate::trellis::Step;

/// Which first-row cells may begin a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartRule {
    /// Only the corner `(0, 0)`.
    Corner,
    /// Any column that is a multiple of the stride.
    EveryNth(usize),
}

/// Which last-row cells may end a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndRule {
    /// Only the corner `(rows - 1, cols - 1)`.
    Corner,
    /// Any column of the last row.
    AnyColumn,
}

/// A constraint that depends on the history of a path, not just its cell.
///
/// Each one splits a trellis cell into slots, one per distinguishable path
/// state, so the cheapest path is kept separately for every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathLimit {
    Unlimited,
    /// Longest allowed run of consecutive vertical or horizontal steps.
    ///
    /// Slot 0 holds paths whose last step was neither; slots `1..=n` hold
    /// vertical runs of that length and `n+1..=2n` horizontal runs.
    Run(usize),
    /// Largest allowed distance from the diagonal through the path's start column.
    ///
    /// Slot `k` holds the path that started at column `col - row - radius + k`.
    Band(usize),
}

/// Predicates that distinguish the alignment policies over the shared recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepRules {
    pub(crate) start: StartRule,
    pub(crate) end: EndRule,
    pub(crate) limit: PathLimit,
}

impl StepRules {
    pub(crate) fn for_config(config: &AlignConfig) -> Self {
        let free = Self {
            start: StartRule::EveryNth(1),
            end: EndRule::AnyColumn,
            limit: PathLimit::Unlimited,
        };
        match config.policy {
            Policy::FreeFrame | Policy::Segmental => free,
            Policy::FixFrame => Self {
                start: StartRule::Corner,
                end: EndRule::Corner,
                ..free
            },
            Policy::SlopeConstrained => Self {
                limit: PathLimit::Run(config.slope_limit),
                ..free
            },
            Policy::DiagonalBand => Self {
                start: StartRule::EveryNth(config.band_stride),
                limit: PathLimit::Band(config.band_radius),
                ..free
            },
        }
    }

    /// Shrink the limit to the largest value that can matter on a
    /// `rows × cols` trellis.
    ///
    /// No run is longer than `max(rows, cols)` and no cell lies further than
    /// that from any diagonal, so clamping changes no result and bounds the
    /// slot count.
    #[must_use]
    pub(crate) fn fitted(mut self, rows: usize, cols: usize) -> Self {
        let cap = rows.max(cols);
        self.limit = match self.limit {
            PathLimit::Unlimited => PathLimit::Unlimited,
            PathLimit::Run(n) => PathLimit::Run(n.min(cap)),
            PathLimit::Band(radius) => PathLimit::Band(radius.min(cap)),
        };
        self
    }

    /// Number of path states tracked per cell.
    pub(crate) fn slots(&self) -> usize {
        match self.limit {
            PathLimit::Unlimited => 1,
            PathLimit::Run(n) => 2 * n + 1,
            PathLimit::Band(radius) => 2 * radius + 1,
        }
    }

    /// Return true if a path may begin at first-row column `col`.
    pub(crate) fn starts_at(&self, col: usize) -> bool {
        match self.start {
            StartRule::Corner => col == 0,
            StartRule::EveryNth(stride) => col % stride == 0,
        }
    }

    /// Slot of cell `(row, col)` reached by `step` from a predecessor in slot
    /// `prev`, for a path that began at column `origin`.
    ///
    /// Returns `None` when the extended path breaks the limit.
    pub(crate) fn slot_for(
        &self,
        row: usize,
        col: usize,
        origin: usize,
        step: Step,
        prev: Option<usize>,
    ) -> Option<usize> {
        match self.limit {
            PathLimit::Unlimited => Some(0),
            PathLimit::Run(n) => {
                let run = match (step, prev) {
                    (Step::Vertical, Some(p)) if (1..=n).contains(&p) => p + 1,
                    (Step::Horizontal, Some(p)) if p > n => p - n + 1,
                    (Step::Vertical | Step::Horizontal, _) => 1,
                    _ => return Some(0),
                };
                if run > n {
                    return None;
                }
                Some(if step == Step::Vertical { run } else { n + run })
            }
            PathLimit::Band(radius) => (origin + row + radius)
                .checked_sub(col)
                .filter(|&k| k <= 2 * radius),
        }
    }
}
