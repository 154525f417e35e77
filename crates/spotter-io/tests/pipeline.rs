//! End-to-end integration tests: feature files -> search -> JSON -> deserialize.

use std::fs;
use std::path::{Path, PathBuf};

use spotter_dtw::{AlignConfig, Policy, SearchInput, search_all};
use spotter_io::{
    ExperimentName, FeatureFile, FeatureReader, IoError, ResultWriter, expand_feature_arg,
    read_time_spans,
};
use tempfile::TempDir;

/// Write a plain (uncompressed, no CRC) HTK file of `dim`-wide frames.
fn write_htk(path: &Path, dim: usize, frames: &[f32]) {
    let n_samples = (frames.len() / dim) as i32;
    let mut bytes = Vec::new();
    bytes.extend(n_samples.to_be_bytes());
    bytes.extend(100_000i32.to_be_bytes());
    bytes.extend(((dim * 4) as i16).to_be_bytes());
    bytes.extend(6u16.to_be_bytes()); // MFCC
    for v in frames {
        bytes.extend(v.to_be_bytes());
    }
    fs::write(path, bytes).unwrap();
}

/// Two-dimensional frames tracing the values `xs` on both axes.
fn ramp(xs: &[f32]) -> Vec<f32> {
    xs.iter().flat_map(|&x| [x, -x]).collect()
}

fn read_all(paths: &[PathBuf]) -> Vec<FeatureFile> {
    paths
        .iter()
        .map(|p| FeatureReader::new(p).read().expect("fixture should parse"))
        .collect()
}

#[test]
fn search_round_trip() {
    let dir = TempDir::new().unwrap();
    let d = dir.path();

    // 1. Feature files: one query, two documents behind a list, one CSV document
    write_htk(&d.join("q1.mfc"), 2, &ramp(&[1.0, 2.0, 3.0]));
    write_htk(&d.join("d1.mfc"), 2, &ramp(&[5.0, 1.0, 2.0, 3.0, 9.0]));
    write_htk(&d.join("d2.fbank"), 2, &ramp(&[9.0, 9.0, 1.0, 2.0, 3.0, 0.0, 0.0]));
    fs::write(d.join("d3.csv"), "7,-7\n8,-8\n").unwrap();
    fs::write(
        d.join("docs.lst"),
        format!(
            "{}\n{}\n{}\n",
            d.join("d1.mfc").display(),
            d.join("d2.fbank").display(),
            d.join("d3.csv").display()
        ),
    )
    .unwrap();
    fs::write(d.join("doc_spans.txt"), "\n0-4\n").unwrap();

    // 2. Expand arguments and read
    let query_paths = expand_feature_arg(&d.join("q1.mfc")).unwrap();
    let doc_paths = expand_feature_arg(&d.join("docs.lst")).unwrap();
    assert_eq!(query_paths.len(), 1);
    assert_eq!(doc_paths.len(), 3);
    let queries = read_all(&query_paths);
    let documents = read_all(&doc_paths);
    assert_eq!(documents[1].sequence().len(), 7);
    assert_eq!(documents[2].sequence().dim(), 2);

    let query_spans = read_time_spans("", queries.len()).unwrap();
    let doc_spans = read_time_spans(d.join("doc_spans.txt").to_str().unwrap(), documents.len()).unwrap();

    // 3. Search
    let q_inputs: Vec<SearchInput<'_>> = queries
        .iter()
        .zip(&query_spans)
        .map(|(f, &span)| SearchInput::new(f.sequence(), span))
        .collect();
    let d_inputs: Vec<SearchInput<'_>> = documents
        .iter()
        .zip(&doc_spans)
        .map(|(f, &span)| SearchInput::new(f.sequence(), span))
        .collect();
    let config = AlignConfig::new(Policy::FreeFrame)
        .with_n_hypotheses(1)
        .with_backtrack(true);
    let grid = search_all(&q_inputs, &d_inputs, &config).unwrap();

    assert_eq!(grid[(0, 0)].best().map(|h| (h.start(), h.end())), Some((1, 4)));
    // d2 is restricted to [0, 4), which cuts the match short
    let restricted = grid[(0, 1)].best().unwrap();
    assert!(restricted.end() <= 4);
    assert!(restricted.score().value() > 0.0);

    // 4. Write JSON artifact
    let out = TempDir::new().unwrap();
    let writer = ResultWriter::new(out.path(), ExperimentName::new("search_rt".into()).unwrap()).unwrap();
    let json_path = writer.write_search(&queries, &documents, &config, &grid).unwrap();

    // 5. Deserialize back and verify
    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "search_rt");
    assert_eq!(content["policy"], "free-frame");
    assert_eq!(content["documents"].as_array().unwrap().len(), 3);

    let pairs = content["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0]["best_score"], 0.0);
    assert_eq!(pairs[0]["hypotheses"][0]["start"], 1);
    assert_eq!(pairs[0]["hypotheses"][0]["end"], 4);
    assert_eq!(pairs[0]["paths"][0], serde_json::json!([[0, 1], [1, 2], [2, 3]]));
    for pair in pairs {
        assert!(pair["best_score"].is_number());
    }
}

#[test]
fn segmental_search_over_htk_files() {
    let dir = TempDir::new().unwrap();
    let q = dir.path().join("q.htk");
    let doc = dir.path().join("d.plp");
    write_htk(&q, 2, &ramp(&[0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0]));
    write_htk(&doc, 2, &ramp(&[9.0, 9.0, 0.0, 0.0, 5.0, 5.0, 9.0, 9.0]));
    let queries = read_all(&[q]);
    let documents = read_all(&[doc]);

    let config = AlignConfig::new(Policy::Segmental).with_n_hypotheses(1);
    let grid = search_all(
        &[SearchInput::new(queries[0].sequence(), None)],
        &[SearchInput::new(documents[0].sequence(), None)],
        &config,
    )
    .unwrap();
    let best = grid[(0, 0)].best().unwrap();
    assert!(best.start() >= 2 && best.end() <= 6, "got {}", best.span());
}

#[test]
fn reader_errors_surface_with_paths() {
    let dir = TempDir::new().unwrap();

    let jagged = dir.path().join("jagged.csv");
    fs::write(&jagged, "1,2\n3\n").unwrap();
    let err = FeatureReader::new(&jagged).read().unwrap_err();
    assert!(matches!(err, IoError::InconsistentRowLength { .. }));
    assert!(err.to_string().contains("jagged.csv"));

    let truncated = dir.path().join("short.mfc");
    fs::write(&truncated, [0u8, 0, 0, 2, 0, 1, 134, 160, 0, 4, 0, 6, 63, 128, 0, 0]).unwrap();
    let err = FeatureReader::new(&truncated).read().unwrap_err();
    assert!(matches!(err, IoError::TruncatedHtk { expected: 8, got: 4, .. }));

    let wav = dir.path().join("audio.wav");
    fs::write(&wav, "RIFF").unwrap();
    assert!(matches!(
        FeatureReader::new(&wav).read().unwrap_err(),
        IoError::UnknownExtension { .. }
    ));
}
