//! Domain types for spotter-io.

use std::path::{Path, PathBuf};

use spotter_dtw::FeatureSequence;

use crate::IoError;

/// A feature sequence together with the file it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFile {
    path: PathBuf,
    sequence: FeatureSequence,
}

impl FeatureFile {
    pub(crate) fn new(path: PathBuf, sequence: FeatureSequence) -> Self {
        Self { path, sequence }
    }

    /// Return the source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the decoded frames.
    #[must_use]
    pub fn sequence(&self) -> &FeatureSequence {
        &self.sequence
    }

    /// Return the path as displayed in reports.
    #[must_use]
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        assert!(ExperimentName::new("query-run_01".to_string()).is_ok());
    }

    #[test]
    fn experiment_name_rejects_separators() {
        for bad in ["", "a b", "../up", "x.y"] {
            assert!(
                matches!(ExperimentName::new(bad.to_string()), Err(IoError::InvalidExperimentName { .. })),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn feature_file_name_is_path() {
        let seq = FeatureSequence::from_flat(vec![1.0], 1).unwrap();
        let file = FeatureFile::new(PathBuf::from("data/q1.mfc"), seq);
        assert_eq!(file.name(), "data/q1.mfc");
        assert_eq!(file.sequence().len(), 1);
    }
}
