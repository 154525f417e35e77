//! Feature file reading, dispatched on the file extension.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::IoError;
use crate::csv_features::CsvFeatureReader;
use crate::domain::FeatureFile;
use crate::htk::HtkReader;

/// On-disk feature formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFormat {
    /// HTK parameter file (`.mfc`, `.fbank`, `.htk`, `.plp`).
    Htk,
    /// Headerless CSV, one frame per row (`.csv`).
    Csv,
}

impl FeatureFormat {
    /// Classify a path by its extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownExtension`] for anything not listed on the variants.
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let extension = extension_of(path);
        match extension.as_str() {
            "mfc" | "fbank" | "htk" | "plp" => Ok(Self::Htk),
            "csv" => Ok(Self::Csv),
            _ => Err(IoError::UnknownExtension {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Lower-cased extension without the dot, or an empty string.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Reads a feature file of any supported format.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::UnknownExtension`] | Extension names no supported format |
/// | any reader error | See [`HtkReader`] and [`CsvFeatureReader`] |
pub struct FeatureReader {
    path: PathBuf,
}

impl FeatureReader {
    /// Create a new reader for the given path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read, decode and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureFile, IoError> {
        let sequence = match FeatureFormat::from_path(&self.path)? {
            FeatureFormat::Htk => HtkReader::new(&self.path).read()?.1,
            FeatureFormat::Csv => CsvFeatureReader::new(&self.path).read()?,
        };
        info!(frames = sequence.len(), dim = sequence.dim(), "features loaded");
        Ok(FeatureFile::new(self.path.clone(), sequence))
    }
}
