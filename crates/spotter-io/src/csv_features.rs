//! Headerless CSV feature reader: one frame per row.

use std::path::{Path, PathBuf};

use spotter_dtw::FeatureSequence;
use tracing::{debug, instrument};

use crate::IoError;

/// Reads frames from a CSV file with no header row.
///
/// Every row is one frame and must have the same number of columns as the
/// first row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyFeatureFile`] | Zero rows |
/// | [`IoError::InconsistentRowLength`] | Row width differs from the first row |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct CsvFeatureReader {
    path: PathBuf,
}

impl CsvFeatureReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureSequence, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so ragged rows surface as InconsistentRowLength
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut dim: Option<usize> = None;
        let mut data = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            let expected = *dim.get_or_insert(record.len());
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            for (col_index, raw) in record.iter().enumerate() {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })?;
                data.push(value);
            }
        }

        let Some(dim) = dim.filter(|_| !data.is_empty()) else {
            return Err(IoError::EmptyFeatureFile {
                path: self.path.clone(),
            });
        };
        debug!(frames = data.len() / dim, dim, "read CSV features");

        FeatureSequence::from_flat(data, dim).map_err(|e| IoError::InvalidFeatures {
            path: self.path.clone(),
            source: e,
        })
    }
}
