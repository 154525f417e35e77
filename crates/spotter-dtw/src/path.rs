//! Frame-level warping paths recovered by backtracking.

use crate::sequence::TimeSpan;

/// A single step of a warping path: absolute query frame `query` is aligned to
/// absolute document frame `document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpingStep {
    /// Frame index in the query sequence.
    pub query: usize,
    /// Frame index in the document sequence.
    pub document: usize,
}

/// An ordered, monotone sequence of warping steps from a hypothesis' start to its end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarpingPath(Vec<WarpingStep>);

impl WarpingPath {
    /// Expand matched unit pairs (frame spans on both sides) into frame steps.
    ///
    /// Each pair is walked along its longer side while the shorter side is
    /// interpolated linearly; indices are clamped so the path never moves
    /// backwards when consecutive pairs share a unit.
    pub(crate) fn from_unit_pairs(pairs: impl IntoIterator<Item = (TimeSpan, TimeSpan)>) -> Self {
        let mut steps: Vec<WarpingStep> = Vec::new();
        for (q, d) in pairs {
            let n = q.len().max(d.len());
            for k in 0..n {
                let mut step = WarpingStep {
                    query: q.start() + k * q.len() / n,
                    document: d.start() + k * d.len() / n,
                };
                if let Some(last) = steps.last() {
                    step.query = step.query.max(last.query);
                    step.document = step.document.max(last.document);
                    if step == *last {
                        continue;
                    }
                }
                steps.push(step);
            }
        }
        Self(steps)
    }

    /// Return the warping steps as a slice.
    #[must_use]
    pub fn steps(&self) -> &[WarpingStep] {
        &self.0
    }

    /// Return the number of steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a WarpingPath {
    type Item = &'a WarpingStep;
    type IntoIter = std::slice::Iter<'a, WarpingStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
