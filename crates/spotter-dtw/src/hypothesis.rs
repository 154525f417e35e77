//! Top-N non-overlapping match regions.

use tracing::debug;

use crate::score::Score;
use crate::sequence::TimeSpan;
use crate::trellis::{Lattice, Trellis};

/// One candidate match region in the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    score: Score,
    span: TimeSpan,
    end_cell: (usize, usize),
}

impl Hypothesis {
    /// Accumulated cost of the path. Lower is better.
    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    /// Absolute document frames `[start, end)` covered by the match.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        self.span
    }

    /// First matched document frame.
    #[must_use]
    pub fn start(&self) -> usize {
        self.span.start()
    }

    /// One past the last matched document frame.
    #[must_use]
    pub fn end(&self) -> usize {
        self.span.end()
    }

    pub(crate) fn end_cell(&self) -> (usize, usize) {
        self.end_cell
    }
}

/// Select up to `n` hypotheses from the legal end cells of `trellis`.
///
/// Candidates are ranked by cost, then earlier start, then shorter span, and
/// accepted greedily unless they overlap a region already claimed.
pub(crate) fn extract<L: Lattice + ?Sized>(trellis: &Trellis, lattice: &L, n: usize) -> Vec<Hypothesis> {
    if n == 0 {
        return Vec::new();
    }
    let Some(last_row) = trellis.rows().checked_sub(1) else {
        return Vec::new();
    };

    let mut candidates: Vec<Hypothesis> = trellis
        .end_columns()
        .into_iter()
        .map(|col| Hypothesis {
            score: Score::new(trellis.cost(last_row, col)),
            span: lattice.document_frames(trellis.origin(last_row, col), col),
            end_cell: (last_row, col),
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then(a.start().cmp(&b.start()))
            .then(a.span.len().cmp(&b.span.len()))
            .then(a.end_cell.1.cmp(&b.end_cell.1))
    });

    let total = candidates.len();
    let mut claimed: Vec<TimeSpan> = Vec::new();
    let mut accepted = Vec::with_capacity(n.min(total));
    for candidate in candidates {
        if accepted.len() == n {
            break;
        }
        if claimed.iter().any(|c| c.overlaps(&candidate.span)) {
            continue;
        }
        claimed.push(candidate.span);
        accepted.push(candidate);
    }

    debug!(candidates = total, accepted = accepted.len(), "hypotheses extracted");
    accepted
}
