//! Pairwise alignment of a query against a document.

use std::borrow::Cow;

use tracing::{debug, instrument};

use crate::config::{AlignConfig, Policy};
use crate::error::DtwError;
use crate::hypothesis::{Hypothesis, extract};
use crate::path::WarpingPath;
use crate::rules::StepRules;
use crate::score::Score;
use crate::segment::Segmentation;
use crate::sequence::{FeatureSequence, FeatureView, TimeSpan};
use crate::trellis::{FrameLattice, Lattice, SegmentLattice, Trellis};

/// Ranked hypotheses of one pairing, with a path per hypothesis when requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    /// Non-overlapping match regions, best first.
    pub hypotheses: Vec<Hypothesis>,
    /// One path per hypothesis, present only when backtracking was requested.
    pub paths: Option<Vec<WarpingPath>>,
}

impl Alignment {
    /// The "no possible alignment" result.
    pub(crate) fn none(config: &AlignConfig) -> Self {
        Self {
            hypotheses: Vec::new(),
            paths: config.backtrack.then(Vec::new),
        }
    }

    /// Score of the best hypothesis, or [`Score::NO_MATCH`] when there is none.
    #[must_use]
    pub fn best_score(&self) -> Score {
        self.hypotheses
            .first()
            .map_or(Score::NO_MATCH, Hypothesis::score)
    }

    /// Best hypothesis, if any.
    #[must_use]
    pub fn best(&self) -> Option<&Hypothesis> {
        self.hypotheses.first()
    }

    /// Number of hypotheses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// Return true if no hypothesis was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Units<'a> {
    Frames(FrameLattice<'a>),
    Segments(SegmentLattice<'a>),
}

/// A validated query/document pairing, ready to run.
///
/// Construction checks the configuration and inputs and, for the segmental
/// policy, builds both segmentations; [`run`](Aligner::run) fills the trellis
/// and extracts hypotheses.
#[derive(Debug, Clone)]
pub struct Aligner<'a> {
    units: Units<'a>,
    rules: StepRules,
    policy: Policy,
    n_hypotheses: usize,
    backtrack: bool,
}

impl<'a> Aligner<'a> {
    /// Pair two frame windows under `config`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidParameter`] | `config` is out of range |
    /// | [`DtwError::DimensionMismatch`] | frame dimensions differ |
    /// | [`DtwError::EmptySequence`] | either window has no frames (degenerate) |
    #[instrument(skip_all, fields(policy = %config.policy, query = query.len(), document = document.len()))]
    pub fn new(
        query: FeatureView<'a>,
        document: FeatureView<'a>,
        config: &AlignConfig,
    ) -> Result<Self, DtwError> {
        config.validate()?;
        check_dimensions(query.dim(), document.dim())?;
        if query.is_empty() {
            return Err(DtwError::EmptySequence { role: "query" });
        }
        if document.is_empty() {
            return Err(DtwError::EmptySequence { role: "document" });
        }

        let kernel = config.kernel.function();
        let units = if config.policy.uses_segments() {
            let q = Segmentation::build(query, &config.segment)?;
            let d = Segmentation::build(document, &config.segment)?;
            Units::Segments(SegmentLattice::new(Cow::Owned(q), Cow::Owned(d), kernel))
        } else {
            Units::Frames(FrameLattice::new(query, document, kernel))
        };
        Ok(Self::assemble(units, config))
    }

    /// Pair two precomputed segmentations under the segmental policy.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidParameter`] | `config` is out of range or not segmental |
    /// | [`DtwError::DimensionMismatch`] | segment dimensions differ |
    pub fn from_segments(
        query: &'a Segmentation,
        document: &'a Segmentation,
        config: &AlignConfig,
    ) -> Result<Self, DtwError> {
        config.validate()?;
        if !config.policy.uses_segments() {
            return Err(DtwError::InvalidParameter {
                name: "policy",
                value: config.policy.to_string(),
                reason: "precomputed segments need the segmental policy",
            });
        }
        check_dimensions(query.dim(), document.dim())?;
        let units = Units::Segments(SegmentLattice::new(
            Cow::Borrowed(query),
            Cow::Borrowed(document),
            config.kernel.function(),
        ));
        Ok(Self::assemble(units, config))
    }

    fn assemble(units: Units<'a>, config: &AlignConfig) -> Self {
        Self {
            units,
            rules: StepRules::for_config(config),
            policy: config.policy,
            n_hypotheses: config.n_hypotheses,
            backtrack: config.backtrack,
        }
    }

    /// Fill the trellis and extract the top hypotheses.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::NonFiniteCost`] | the kernel produced NaN for some cell |
    #[instrument(skip(self), fields(policy = %self.policy))]
    pub fn run(&self) -> Result<Alignment, DtwError> {
        match &self.units {
            Units::Frames(lattice) => self.run_on(lattice),
            Units::Segments(lattice) => self.run_on(lattice),
        }
    }

    fn run_on<L: Lattice>(&self, lattice: &L) -> Result<Alignment, DtwError> {
        if self.n_hypotheses == 0 {
            return Ok(Alignment {
                hypotheses: Vec::new(),
                paths: self.backtrack.then(Vec::new),
            });
        }

        let trellis = Trellis::fill(lattice, &self.rules)?;
        debug!(rows = trellis.rows(), cols = trellis.cols(), "trellis filled");

        let hypotheses = extract(&trellis, lattice, self.n_hypotheses);
        let paths = self.backtrack.then(|| {
            hypotheses
                .iter()
                .map(|h| {
                    let (row, col) = h.end_cell();
                    WarpingPath::from_unit_pairs(
                        trellis
                            .trace(lattice, row, col)
                            .into_iter()
                            .map(|(r, c, step)| lattice.matched_frames(r, c, step)),
                    )
                })
                .collect()
        });

        Ok(Alignment { hypotheses, paths })
    }
}

fn check_dimensions(query: usize, document: usize) -> Result<(), DtwError> {
    if query != document {
        return Err(DtwError::DimensionMismatch { query, document });
    }
    Ok(())
}

/// Turn a degenerate construction error into an empty alignment.
pub(crate) fn absorb_degenerate(
    aligner: Result<Aligner<'_>, DtwError>,
    config: &AlignConfig,
) -> Result<Alignment, DtwError> {
    match aligner {
        Ok(aligner) => aligner.run(),
        Err(e) if e.is_degenerate() => {
            debug!(error = %e, "no possible alignment");
            Ok(Alignment::none(config))
        }
        Err(e) => Err(e),
    }
}

/// Align `query` against `document`, each optionally restricted to a span.
///
/// An empty effective window is not an error: the result simply has no
/// hypotheses and its best score is [`Score::NO_MATCH`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DtwError::InvalidTimeSpan`] | a span ends past its sequence |
/// | [`DtwError::InvalidParameter`] | `config` is out of range |
/// | [`DtwError::DimensionMismatch`] | frame dimensions differ |
/// | [`DtwError::NonFiniteCost`] | the kernel produced NaN |
pub fn align(
    query: &FeatureSequence,
    query_span: Option<TimeSpan>,
    document: &FeatureSequence,
    document_span: Option<TimeSpan>,
    config: &AlignConfig,
) -> Result<Alignment, DtwError> {
    let q = query.view(query_span)?;
    let d = document.view(document_span)?;
    absorb_degenerate(Aligner::new(q, d, config), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentConfig;
    use crate::kernel::Kernel;

    fn scalar(values: &[f64]) -> FeatureSequence {
        FeatureSequence::from_flat(values.to_vec(), 1).unwrap()
    }

    fn span(start: usize, end: usize) -> Option<TimeSpan> {
        Some(TimeSpan::new(start, end).unwrap())
    }

    #[test]
    fn embedded_query_is_found() {
        let q = scalar(&[1.0, 2.0, 3.0]);
        let d = scalar(&[5.0, 1.0, 2.0, 3.0, 9.0]);
        let config = AlignConfig::new(Policy::FreeFrame).with_n_hypotheses(1);
        let result = align(&q, None, &d, None, &config).unwrap();
        assert_eq!(result.len(), 1);
        let best = result.best().unwrap();
        assert_eq!((best.start(), best.end()), (1, 4));
        assert_eq!(result.best_score().value(), 0.0);
        assert!(result.paths.is_none());
    }

    #[test]
    fn spans_are_reported_in_absolute_frames() {
        let q = scalar(&[0.0, 1.0, 2.0, 3.0]);
        let d = scalar(&[9.0, 9.0, 9.0, 1.0, 2.0, 3.0, 9.0]);
        let config = AlignConfig::new(Policy::FreeFrame)
            .with_n_hypotheses(1)
            .with_backtrack(true);
        let result = align(&q, span(1, 4), &d, span(2, 7), &config).unwrap();
        let best = result.best().unwrap();
        assert_eq!((best.start(), best.end()), (3, 6));
        let path = &result.paths.as_ref().unwrap()[0];
        let steps: Vec<(usize, usize)> = path.steps().iter().map(|s| (s.query, s.document)).collect();
        assert_eq!(steps, vec![(1, 3), (2, 4), (3, 5)]);
    }

    #[test]
    fn empty_span_means_no_alignment() {
        let q = scalar(&[1.0, 2.0]);
        let d = scalar(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let config = AlignConfig::default().with_backtrack(true);
        let result = align(&q, None, &d, span(5, 5), &config).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.best_score(), Score::NO_MATCH);
        assert_eq!(result.paths, Some(Vec::new()));
    }

    #[test]
    fn aligner_rejects_empty_window() {
        let q = scalar(&[1.0]);
        let d = scalar(&[1.0, 2.0]);
        let err = Aligner::new(q.as_view(), d.view(span(1, 1)).unwrap(), &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, DtwError::EmptySequence { role: "document" }));
        assert!(err.is_degenerate());
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let q = FeatureSequence::from_flat(vec![1.0, 2.0], 2).unwrap();
        let d = scalar(&[1.0, 2.0]);
        let err = align(&q, None, &d, None, &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, DtwError::DimensionMismatch { query: 2, document: 1 }));
    }

    #[test]
    fn span_past_end_is_rejected() {
        let q = scalar(&[1.0]);
        let d = scalar(&[1.0, 2.0]);
        let err = align(&q, None, &d, span(0, 3), &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, DtwError::InvalidTimeSpan { .. }));
    }

    #[test]
    fn nan_cost_propagates() {
        let q = FeatureSequence::from_flat(vec![0.0, 0.0], 2).unwrap();
        let d = FeatureSequence::from_flat(vec![0.3, 0.7], 2).unwrap();
        let config = AlignConfig::new(Policy::FreeFrame).with_kernel(Kernel::LogInnerProduct);
        let err = align(&q, None, &d, None, &config).unwrap_err();
        assert!(matches!(err, DtwError::NonFiniteCost { .. }));
    }

    #[test]
    fn zero_hypotheses_requested() {
        let q = scalar(&[1.0]);
        let d = scalar(&[1.0, 2.0]);
        let config = AlignConfig::default().with_n_hypotheses(0);
        assert!(align(&q, None, &d, None, &config).unwrap().is_empty());
    }

    #[test]
    fn segmental_matches_stretched_query() {
        // query is the document pattern spoken twice as slowly
        let q = scalar(&[0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0]);
        let d = scalar(&[9.0, 9.0, 0.0, 0.0, 5.0, 5.0, 9.0, 9.0]);
        let segment = SegmentConfig::new(0.5, 1.0).unwrap().with_width(4);
        let config = AlignConfig::new(Policy::Segmental)
            .with_segment(segment)
            .with_n_hypotheses(1)
            .with_backtrack(true);
        let result = align(&q, None, &d, None, &config).unwrap();
        let best = result.best().unwrap();
        assert_eq!((best.start(), best.end()), (2, 6));
        assert_eq!(best.score().value(), 0.0);
        let path = &result.paths.as_ref().unwrap()[0];
        assert_eq!(path.steps().first().map(|s| (s.query, s.document)), Some((0, 2)));
        assert_eq!(path.steps().last().map(|s| (s.query, s.document)), Some((7, 5)));
    }

    #[test]
    fn from_segments_requires_segmental_policy() {
        let q = scalar(&[1.0, 2.0]);
        let seg = Segmentation::build(q.as_view(), &SegmentConfig::default()).unwrap();
        let err = Aligner::from_segments(&seg, &seg, &AlignConfig::new(Policy::FreeFrame)).unwrap_err();
        assert!(matches!(err, DtwError::InvalidParameter { name: "policy", .. }));
    }
}
