//! JSON result writer for search outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use spotter_dtw::{AlignConfig, Alignment, SearchGrid};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ExperimentName, FeatureFile};

/// Writes search results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_search.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Path of the search artifact for this experiment.
    #[must_use]
    pub fn search_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_search.json", self.experiment.as_str()))
    }

    /// Write every pair of a search grid to `{experiment}_search.json`.
    ///
    /// `queries` and `documents` must be the inputs the grid was computed
    /// from, in the same order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The artifact cannot be encoded |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(pairs = queries.len() * documents.len()))]
    pub fn write_search(
        &self,
        queries: &[FeatureFile],
        documents: &[FeatureFile],
        config: &AlignConfig,
        grid: &SearchGrid,
    ) -> Result<PathBuf, IoError> {
        debug_assert_eq!(grid.n_queries(), queries.len());
        debug_assert_eq!(grid.n_documents(), documents.len());
        let path = self.search_path();

        let pairs = grid
            .iter()
            .map(|(qi, di, alignment)| PairEntry::new(qi, di, alignment))
            .collect();
        let artifact = SearchArtifact {
            experiment: self.experiment.as_str(),
            policy: config.policy().name(),
            kernel: config.kernel().name(),
            n_hypotheses: config.n_hypotheses(),
            queries: queries.iter().map(FeatureFile::name).collect(),
            documents: documents.iter().map(FeatureFile::name).collect(),
            pairs,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "search result written");
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct SearchArtifact<'a> {
    experiment: &'a str,
    policy: &'static str,
    kernel: &'static str,
    n_hypotheses: usize,
    queries: Vec<String>,
    documents: Vec<String>,
    pairs: Vec<PairEntry>,
}

#[derive(Serialize)]
struct PairEntry {
    query: usize,
    document: usize,
    /// `None` when there is no hypothesis; JSON has no `-inf`.
    best_score: Option<f64>,
    hypotheses: Vec<HypothesisEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<Vec<[usize; 2]>>>,
}

impl PairEntry {
    fn new(query: usize, document: usize, alignment: &Alignment) -> Self {
        Self {
            query,
            document,
            best_score: alignment.best().map(|h| h.score().value()),
            hypotheses: alignment
                .hypotheses
                .iter()
                .map(|h| HypothesisEntry {
                    score: h.score().value(),
                    start: h.start(),
                    end: h.end(),
                })
                .collect(),
            paths: alignment.paths.as_ref().map(|paths| {
                paths
                    .iter()
                    .map(|p| p.steps().iter().map(|s| [s.query, s.document]).collect())
                    .collect()
            }),
        }
    }
}

#[derive(Serialize)]
struct HypothesisEntry {
    score: f64,
    start: usize,
    end: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotter_dtw::{FeatureSequence, Policy, SearchInput, TimeSpan, search_all};
    use tempfile::TempDir;

    fn file(name: &str, values: &[f64]) -> FeatureFile {
        FeatureFile::new(
            PathBuf::from(name),
            FeatureSequence::from_flat(values.to_vec(), 1).unwrap(),
        )
    }

    fn run(
        queries: &[FeatureFile],
        documents: &[FeatureFile],
        doc_span: Option<TimeSpan>,
        config: &AlignConfig,
    ) -> SearchGrid {
        let q: Vec<SearchInput<'_>> = queries.iter().map(|f| SearchInput::new(f.sequence(), None)).collect();
        let d: Vec<SearchInput<'_>> = documents
            .iter()
            .map(|f| SearchInput::new(f.sequence(), doc_span))
            .collect();
        search_all(&q, &d, config).unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_search_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("test_run".into()).unwrap()).unwrap();
        let queries = vec![file("q1.csv", &[1.0, 2.0, 3.0])];
        let documents = vec![file("d1.csv", &[5.0, 1.0, 2.0, 3.0, 9.0]), file("d2.csv", &[0.0, 0.0])];
        let config = AlignConfig::new(Policy::FreeFrame).with_n_hypotheses(2);
        let grid = run(&queries, &documents, None, &config);

        let path = writer.write_search(&queries, &documents, &config, &grid).unwrap();
        assert_eq!(path, dir.path().join("test_run_search.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "test_run");
        assert_eq!(content["policy"], "free-frame");
        assert_eq!(content["kernel"], "euclidean");
        assert_eq!(content["n_hypotheses"], 2);
        assert_eq!(content["queries"][0], "q1.csv");
        assert_eq!(content["documents"].as_array().unwrap().len(), 2);

        let pairs = content["pairs"].as_array().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0]["query"], 0);
        assert_eq!(pairs[0]["document"], 0);
        assert_eq!(pairs[0]["best_score"], 0.0);
        assert_eq!(pairs[0]["hypotheses"][0]["start"], 1);
        assert_eq!(pairs[0]["hypotheses"][0]["end"], 4);
        assert!(pairs[0].get("paths").is_none());
    }

    #[test]
    fn empty_alignment_has_null_best_score() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("empty".into()).unwrap()).unwrap();
        let queries = vec![file("q.csv", &[1.0])];
        let documents = vec![file("d.csv", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])];
        let config = AlignConfig::default().with_backtrack(true);
        let grid = run(&queries, &documents, Some(TimeSpan::new(5, 5).unwrap()), &config);

        let path = writer.write_search(&queries, &documents, &config, &grid).unwrap();
        let content = read_json(&path);
        let pair = &content["pairs"][0];
        assert!(pair["best_score"].is_null());
        assert_eq!(pair["hypotheses"].as_array().unwrap().len(), 0);
        assert_eq!(pair["paths"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn paths_written_when_backtracking() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("paths".into()).unwrap()).unwrap();
        let queries = vec![file("q.csv", &[1.0, 2.0])];
        let documents = vec![file("d.csv", &[7.0, 1.0, 2.0])];
        let config = AlignConfig::new(Policy::FreeFrame)
            .with_n_hypotheses(1)
            .with_backtrack(true);
        let grid = run(&queries, &documents, None, &config);

        let path = writer.write_search(&queries, &documents, &config, &grid).unwrap();
        let content = read_json(&path);
        let steps = &content["pairs"][0]["paths"][0];
        assert_eq!(steps, &serde_json::json!([[0, 1], [1, 2]]));
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = ResultWriter::new(&nested, ExperimentName::new("x".into()).unwrap()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.search_path(), nested.join("x_search.json"));
    }
}
