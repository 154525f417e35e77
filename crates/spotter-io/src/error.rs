//! I/O error types for spotter-io.

use std::path::PathBuf;

use spotter_dtw::DtwError;

/// Errors from feature files, file lists, time spans and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when an input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a path has no recognised extension.
    #[error("unknown file extension \"{extension}\" for {path}")]
    UnknownExtension {
        /// Path that was classified.
        path: PathBuf,
        /// Extension found (empty when there is none).
        extension: String,
    },

    /// Returned when a `.lst` or `.scp` list names no files.
    #[error("file list {path} is empty")]
    EmptyFileList {
        /// Path to the list.
        path: PathBuf,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a feature file holds zero frames.
    #[error("no frames in {path}")]
    EmptyFeatureFile {
        /// Path to the feature file.
        path: PathBuf,
    },

    /// Returned when a CSV row has a different width than the first row.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        got: usize,
    },

    /// Returned when a CSV cell is NaN, Inf, or not a float at all.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when an HTK header is structurally invalid.
    #[error("invalid HTK header in {path}: {reason}")]
    InvalidHtkHeader {
        /// Path to the HTK file.
        path: PathBuf,
        /// What is wrong with the header.
        reason: String,
    },

    /// Returned for compressed (`_C`) or CRC-protected (`_K`) HTK parameter kinds.
    #[error("unsupported HTK parameter kind {kind:#06x} in {path}")]
    UnsupportedHtkKind {
        /// Path to the HTK file.
        path: PathBuf,
        /// Raw `parmKind` field.
        kind: u16,
    },

    /// Returned when an HTK file ends before all declared samples.
    #[error("truncated HTK data in {path}: expected {expected} bytes, found {got}")]
    TruncatedHtk {
        /// Path to the HTK file.
        path: PathBuf,
        /// Bytes declared by the header.
        expected: usize,
        /// Bytes actually present after the header.
        got: usize,
    },

    /// Returned when decoded frames fail feature validation.
    #[error("invalid features in {path}")]
    InvalidFeatures {
        /// Path to the feature file.
        path: PathBuf,
        /// Validation failure.
        source: DtwError,
    },

    /// Returned when a literal time span cannot be parsed.
    #[error("malformed time span \"{text}\": expected \"<start>-<end>\" or \"<start> <end>\"")]
    MalformedTimeSpan {
        /// The offending text.
        text: String,
    },

    /// Returned when a row of a time-span file cannot be parsed.
    #[error("{path}:{line}: malformed time span \"{text}\"")]
    MalformedTimeSpanRow {
        /// Path to the span file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The offending row.
        text: String,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result artifact cannot be serialized.
    #[error("cannot serialize result for {path}")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
