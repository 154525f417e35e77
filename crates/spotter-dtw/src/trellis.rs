//! Cumulative-cost trellis shared by every alignment policy.
//!
//! A [`Lattice`] supplies the local costs between query units (rows) and
//! document units (columns); units are either raw frames or basic segments.
//! [`Trellis::fill`] runs one recurrence over any lattice, with the policy
//! differences carried by [`StepRules`].

use std::borrow::Cow;

use crate::error::DtwError;
use crate::kernel::KernelFn;
use crate::rules::{EndRule, StepRules};
use crate::segment::Segmentation;
use crate::sequence::{FeatureView, TimeSpan};

/// Units and local costs of one query/document pairing.
pub(crate) trait Lattice {
    /// Number of query units.
    fn rows(&self) -> usize;

    /// Number of document units.
    fn cols(&self) -> usize;

    /// Local cost of pairing query unit `row` with document unit `col`.
    fn local_cost(&self, row: usize, col: usize) -> f64;

    /// First document unit of a multi-unit run closing at `col`, if any.
    fn document_run(&self, _col: usize) -> Option<usize> {
        None
    }

    /// First query unit of a multi-unit run closing at `row`, if any.
    fn query_run(&self, _row: usize) -> Option<usize> {
        None
    }

    /// Cost of query unit `row` absorbing the whole document run closing at `col`.
    fn document_run_cost(&self, _row: usize, _col: usize) -> f64 {
        f64::INFINITY
    }

    /// Cost of the whole query run closing at `row` absorbed by document unit `col`.
    fn query_run_cost(&self, _row: usize, _col: usize) -> f64 {
        f64::INFINITY
    }

    /// Absolute document frames covered by units `first..=last`.
    fn document_frames(&self, first: usize, last: usize) -> TimeSpan;

    /// Absolute `(query, document)` frames matched when `(row, col)` is entered by `step`.
    fn matched_frames(&self, row: usize, col: usize, step: Step) -> (TimeSpan, TimeSpan);
}

/// Frame-by-frame lattice over two views.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameLattice<'a> {
    query: FeatureView<'a>,
    document: FeatureView<'a>,
    kernel: KernelFn,
}

impl<'a> FrameLattice<'a> {
    pub(crate) fn new(query: FeatureView<'a>, document: FeatureView<'a>, kernel: KernelFn) -> Self {
        Self {
            query,
            document,
            kernel,
        }
    }
}

impl Lattice for FrameLattice<'_> {
    fn rows(&self) -> usize {
        self.query.len()
    }

    fn cols(&self) -> usize {
        self.document.len()
    }

    fn local_cost(&self, row: usize, col: usize) -> f64 {
        (self.kernel)(self.query.frame(row), self.document.frame(col))
    }

    fn document_frames(&self, first: usize, last: usize) -> TimeSpan {
        let offset = self.document.offset();
        TimeSpan::new_unchecked(offset + first, offset + last + 1)
    }

    fn matched_frames(&self, row: usize, col: usize, _step: Step) -> (TimeSpan, TimeSpan) {
        let q = self.query.offset() + row;
        let d = self.document.offset() + col;
        (
            TimeSpan::new_unchecked(q, q + 1),
            TimeSpan::new_unchecked(d, d + 1),
        )
    }
}

/// Basic-segment lattice with super-segment jumps on both sides.
#[derive(Debug, Clone)]
pub(crate) struct SegmentLattice<'a> {
    query: Cow<'a, Segmentation>,
    document: Cow<'a, Segmentation>,
    kernel: KernelFn,
}

impl<'a> SegmentLattice<'a> {
    pub(crate) fn new(
        query: Cow<'a, Segmentation>,
        document: Cow<'a, Segmentation>,
        kernel: KernelFn,
    ) -> Self {
        Self {
            query,
            document,
            kernel,
        }
    }

    /// Kernel cost of two representatives weighted by their mean frame count.
    fn weighted(&self, q_mean: &[f64], q_len: usize, d_mean: &[f64], d_len: usize) -> f64 {
        (self.kernel)(q_mean, d_mean) * (q_len + d_len) as f64 / 2.0
    }
}

impl Lattice for SegmentLattice<'_> {
    fn rows(&self) -> usize {
        self.query.len()
    }

    fn cols(&self) -> usize {
        self.document.len()
    }

    fn local_cost(&self, row: usize, col: usize) -> f64 {
        let q = &self.query.basic()[row];
        let d = &self.document.basic()[col];
        self.weighted(q.mean(), q.len(), d.mean(), d.len())
    }

    fn document_run(&self, col: usize) -> Option<usize> {
        self.document.closing_super(col).map(|s| s.members().start)
    }

    fn query_run(&self, row: usize) -> Option<usize> {
        self.query.closing_super(row).map(|s| s.members().start)
    }

    fn document_run_cost(&self, row: usize, col: usize) -> f64 {
        let q = &self.query.basic()[row];
        match self.document.closing_super(col) {
            Some(s) => self.weighted(q.mean(), q.len(), s.mean(), s.span().len()),
            None => f64::INFINITY,
        }
    }

    fn query_run_cost(&self, row: usize, col: usize) -> f64 {
        let d = &self.document.basic()[col];
        match self.query.closing_super(row) {
            Some(s) => self.weighted(s.mean(), s.span().len(), d.mean(), d.len()),
            None => f64::INFINITY,
        }
    }

    fn document_frames(&self, first: usize, last: usize) -> TimeSpan {
        let basic = self.document.basic();
        TimeSpan::new_unchecked(basic[first].span().start(), basic[last].span().end())
    }

    fn matched_frames(&self, row: usize, col: usize, step: Step) -> (TimeSpan, TimeSpan) {
        let q = self.query.basic()[row].span();
        let d = self.document.basic()[col].span();
        match step {
            Step::DocumentJump => (
                q,
                self.document.closing_super(col).map_or(d, |s| s.span()),
            ),
            Step::QueryJump => (self.query.closing_super(row).map_or(q, |s| s.span()), d),
            _ => (q, d),
        }
    }
}

/// How a cell was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Unreached,
    /// First cell of a path.
    Start,
    Diagonal,
    /// From the previous query unit, same document unit.
    Vertical,
    /// From the previous document unit, same query unit.
    Horizontal,
    /// Query unit absorbed a whole document super-segment.
    DocumentJump,
    /// Document unit absorbed a whole query super-segment.
    QueryJump,
}

/// Best way found so far into one slot of a cell.
#[derive(Debug, Clone, Copy)]
struct Entry {
    cost: f64,
    origin: usize,
    step: Step,
    /// Slot of the predecessor cell.
    back: usize,
}

impl Entry {
    const UNREACHED: Self = Self {
        cost: f64::INFINITY,
        origin: 0,
        step: Step::Unreached,
        back: 0,
    };
}

/// Completed cumulative-cost matrix with back-pointers.
///
/// Each cell holds one entry per path state the step rules distinguish
/// ([`StepRules::slots`]); slot `s` of cell `(row, col)` lives at flat index
/// `(row * cols + col) * slots + s`. `origin` holds the document unit where
/// the best path into the slot started. Cell-level reads use the cheapest
/// slot, the lowest slot winning ties.
#[derive(Debug, Clone)]
pub(crate) struct Trellis {
    rows: usize,
    cols: usize,
    slots: usize,
    end: EndRule,
    entries: Vec<Entry>,
}

impl Trellis {
    /// Fill the trellis row by row.
    ///
    /// Predecessors are tried in the order start, diagonal, vertical,
    /// horizontal, document jump, query jump.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::NonFiniteCost`] | a local or jump cost is NaN |
    pub(crate) fn fill<L: Lattice + ?Sized>(lattice: &L, rules: &StepRules) -> Result<Self, DtwError> {
        let rows = lattice.rows();
        let cols = lattice.cols();
        let rules = rules.fitted(rows, cols);
        let slots = rules.slots();
        let mut trellis = Self {
            rows,
            cols,
            slots,
            end: rules.end,
            entries: vec![Entry::UNREACHED; rows * cols * slots],
        };

        for row in 0..rows {
            for col in 0..cols {
                let cell = (row, col);
                let local = finite_or_err(lattice.local_cost(row, col), row, col)?;

                if row == 0 && rules.starts_at(col) {
                    trellis.begin(&rules, cell, col, local, Step::Start);
                }
                if row > 0 && col > 0 {
                    trellis.extend(&rules, cell, (row - 1, col - 1), local, Step::Diagonal);
                }
                if row > 0 {
                    trellis.extend(&rules, cell, (row - 1, col), local, Step::Vertical);
                }
                if col > 0 {
                    trellis.extend(&rules, cell, (row, col - 1), local, Step::Horizontal);
                }

                if let Some(first) = lattice.document_run(col) {
                    let jump = finite_or_err(lattice.document_run_cost(row, col), row, col)?;
                    if row == 0 {
                        if rules.starts_at(first) {
                            trellis.begin(&rules, cell, first, jump, Step::DocumentJump);
                        }
                    } else if first > 0 {
                        trellis.extend(&rules, cell, (row - 1, first - 1), jump, Step::DocumentJump);
                    }
                }
                if let Some(first) = lattice.query_run(row) {
                    let jump = finite_or_err(lattice.query_run_cost(row, col), row, col)?;
                    if first == 0 {
                        if rules.starts_at(col) {
                            trellis.begin(&rules, cell, col, jump, Step::QueryJump);
                        }
                    } else if col > 0 {
                        trellis.extend(&rules, cell, (first - 1, col - 1), jump, Step::QueryJump);
                    }
                }
            }
        }

        Ok(trellis)
    }

    fn index(&self, row: usize, col: usize, slot: usize) -> usize {
        (row * self.cols + col) * self.slots + slot
    }

    /// Replace a slot's entry when `entry` is strictly cheaper, so earlier offers win ties.
    fn offer(&mut self, (row, col): (usize, usize), slot: usize, entry: Entry) {
        let i = self.index(row, col, slot);
        if entry.cost < self.entries[i].cost {
            self.entries[i] = entry;
        }
    }

    /// Open a path at `cell` that began in document unit `origin`.
    fn begin(&mut self, rules: &StepRules, cell: (usize, usize), origin: usize, cost: f64, step: Step) {
        if let Some(slot) = rules.slot_for(cell.0, cell.1, origin, step, None) {
            self.offer(
                cell,
                slot,
                Entry {
                    cost,
                    origin,
                    step,
                    back: 0,
                },
            );
        }
    }

    /// Offer every reached slot of `prev` into `cell`, each landing in the
    /// slot the step rules assign to the extended path.
    fn extend(&mut self, rules: &StepRules, cell: (usize, usize), prev: (usize, usize), local: f64, step: Step) {
        for back in 0..self.slots {
            let p = self.entries[self.index(prev.0, prev.1, back)];
            if p.cost == f64::INFINITY {
                continue;
            }
            if let Some(slot) = rules.slot_for(cell.0, cell.1, p.origin, step, Some(back)) {
                self.offer(
                    cell,
                    slot,
                    Entry {
                        cost: p.cost + local,
                        origin: p.origin,
                        step,
                        back,
                    },
                );
            }
        }
    }

    /// Cheapest reached slot of `(row, col)`.
    fn best_slot(&self, row: usize, col: usize) -> Option<usize> {
        let base = self.index(row, col, 0);
        let cell = &self.entries[base..base + self.slots];
        let mut best: Option<usize> = None;
        for (slot, entry) in cell.iter().enumerate() {
            if entry.cost == f64::INFINITY {
                continue;
            }
            if best.is_none_or(|b| entry.cost < cell[b].cost) {
                best = Some(slot);
            }
        }
        best
    }

    fn best_entry(&self, row: usize, col: usize) -> Entry {
        self.best_slot(row, col)
            .map_or(Entry::UNREACHED, |slot| self.entries[self.index(row, col, slot)])
    }

    /// Number of query units.
    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    /// Number of document units.
    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    /// Accumulated cost of the best path into `(row, col)`.
    pub(crate) fn cost(&self, row: usize, col: usize) -> f64 {
        self.best_entry(row, col).cost
    }

    /// Document unit where the best path into `(row, col)` started.
    pub(crate) fn origin(&self, row: usize, col: usize) -> usize {
        self.best_entry(row, col).origin
    }

    /// Columns of the last row that are legal, reachable end cells.
    pub(crate) fn end_columns(&self) -> Vec<usize> {
        let Some(last_row) = self.rows.checked_sub(1) else {
            return Vec::new();
        };
        let columns = match self.end {
            EndRule::AnyColumn => 0..self.cols,
            EndRule::Corner => self.cols.saturating_sub(1)..self.cols,
        };
        columns
            .filter(|&col| self.cost(last_row, col).is_finite())
            .collect()
    }

    /// Follow back-pointers from the best path into `(row, col)` to its start.
    ///
    /// Returns the visited cells with the step that entered each, start
    /// first. An unreached cell yields an empty trace.
    pub(crate) fn trace<L: Lattice + ?Sized>(
        &self,
        lattice: &L,
        row: usize,
        col: usize,
    ) -> Vec<(usize, usize, Step)> {
        let mut cells = Vec::new();
        let Some(mut slot) = self.best_slot(row, col) else {
            return cells;
        };
        let (mut r, mut c) = (row, col);
        loop {
            let entry = self.entries[self.index(r, c, slot)];
            debug_assert_ne!(entry.step, Step::Unreached, "traced into an unreached slot");
            cells.push((r, c, entry.step));
            let prev = match entry.step {
                Step::Unreached | Step::Start => None,
                Step::Diagonal => Some((r - 1, c - 1)),
                Step::Vertical => Some((r - 1, c)),
                Step::Horizontal => Some((r, c - 1)),
                Step::DocumentJump => lattice
                    .document_run(c)
                    .filter(|_| r > 0)
                    .map(|first| (r - 1, first - 1)),
                Step::QueryJump => lattice
                    .query_run(r)
                    .filter(|&first| first > 0)
                    .map(|first| (first - 1, c - 1)),
            };
            match prev {
                Some(p) => {
                    (r, c) = p;
                    slot = entry.back;
                }
                None => break,
            }
        }
        cells.reverse();
        cells
    }
}

fn finite_or_err(cost: f64, row: usize, col: usize) -> Result<f64, DtwError> {
    if cost.is_nan() {
        return Err(DtwError::NonFiniteCost {
            query: row,
            document: col,
        });
    }
    Ok(cost)
}
