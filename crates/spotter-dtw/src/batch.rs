//! Every-query-against-every-document search, parallel across pairs.

use std::ops::Index;

use rayon::prelude::*;
use tracing::{info, instrument};

use crate::config::AlignConfig;
use crate::engine::{Aligner, Alignment, absorb_degenerate};
use crate::error::DtwError;
use crate::segment::Segmentation;
use crate::sequence::{FeatureSequence, FeatureView, TimeSpan};

/// One side of a search: a sequence and its optional restriction.
#[derive(Debug, Clone, Copy)]
pub struct SearchInput<'a> {
    pub sequence: &'a FeatureSequence,
    pub span: Option<TimeSpan>,
}

impl<'a> SearchInput<'a> {
    #[must_use]
    pub fn new(sequence: &'a FeatureSequence, span: Option<TimeSpan>) -> Self {
        Self { sequence, span }
    }
}

/// Query-major grid of alignments, one per query×document pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchGrid {
    n_queries: usize,
    n_documents: usize,
    data: Vec<Alignment>,
}

impl SearchGrid {
    /// Return the number of queries (rows).
    #[must_use]
    pub fn n_queries(&self) -> usize {
        self.n_queries
    }

    /// Return the number of documents (columns).
    #[must_use]
    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    /// Return true if the grid holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the alignment of `query` against `document`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[must_use]
    pub fn get(&self, query: usize, document: usize) -> &Alignment {
        assert!(query < self.n_queries, "query index {query} out of bounds for {} queries", self.n_queries);
        assert!(
            document < self.n_documents,
            "document index {document} out of bounds for {} documents",
            self.n_documents
        );
        &self.data[query * self.n_documents + document]
    }

    /// Return the alignments of `query` against every document.
    #[must_use]
    pub fn row(&self, query: usize) -> &[Alignment] {
        let start = query * self.n_documents;
        &self.data[start..start + self.n_documents]
    }

    /// Iterate over `(query, document, alignment)` in query-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Alignment)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(k, a)| (k / self.n_documents, k % self.n_documents, a))
    }
}

impl Index<(usize, usize)> for SearchGrid {
    type Output = Alignment;

    fn index(&self, (query, document): (usize, usize)) -> &Self::Output {
        self.get(query, document)
    }
}

/// A resolved input window, with its segmentation when the policy needs one.
struct Prepared<'a> {
    view: FeatureView<'a>,
    segments: Option<Segmentation>,
}

fn prepare<'a>(inputs: &[SearchInput<'a>], config: &AlignConfig) -> Result<Vec<Prepared<'a>>, DtwError> {
    inputs
        .par_iter()
        .map(|input| {
            let view = input.sequence.view(input.span)?;
            let segments = if config.policy.uses_segments() && !view.is_empty() {
                Some(Segmentation::build(view, &config.segment)?)
            } else {
                None
            };
            Ok(Prepared { view, segments })
        })
        .collect()
}

/// Align every query against every document under one configuration.
///
/// Each input window is resolved (and segmented, for the segmental policy)
/// once and shared read-only across its pairs. Pairs are aligned in parallel.
/// Empty windows produce empty alignments rather than errors.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DtwError::InvalidParameter`] | `config` is out of range |
/// | [`DtwError::InvalidTimeSpan`] | an input span ends past its sequence |
/// | [`DtwError::Pair`] | a pair failed fatally; carries both indices |
#[instrument(skip_all, fields(queries = queries.len(), documents = documents.len(), policy = %config.policy))]
pub fn search_all(
    queries: &[SearchInput<'_>],
    documents: &[SearchInput<'_>],
    config: &AlignConfig,
) -> Result<SearchGrid, DtwError> {
    config.validate()?;
    let prepared_queries = prepare(queries, config)?;
    let prepared_documents = prepare(documents, config)?;

    let n_documents = documents.len();
    let total_pairs = queries.len() * n_documents;

    let data: Vec<Alignment> = (0..total_pairs)
        .into_par_iter()
        .map(|flat_idx| {
            let (qi, di) = (flat_idx / n_documents, flat_idx % n_documents);
            let (q, d) = (&prepared_queries[qi], &prepared_documents[di]);
            let aligner = match (&q.segments, &d.segments) {
                (Some(qs), Some(ds)) => Aligner::from_segments(qs, ds, config),
                _ => Aligner::new(q.view, d.view, config),
            };
            absorb_degenerate(aligner, config).map_err(|source| DtwError::Pair {
                query: qi,
                document: di,
                source: Box::new(source),
            })
        })
        .collect::<Result<_, _>>()?;

    let matched = data.iter().filter(|a| !a.is_empty()).count();
    info!(pairs = total_pairs, matched, "search complete");

    Ok(SearchGrid {
        n_queries: queries.len(),
        n_documents,
        data,
    })
}
