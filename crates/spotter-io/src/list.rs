//! Expansion of feature arguments into concrete file paths.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::IoError;
use crate::reader::{FeatureFormat, extension_of};

/// Expand a feature argument into the files it names.
///
/// A `.lst` or `.scp` argument is a list of whitespace-separated paths, used
/// exactly as written. A path with a feature extension names itself.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | The list file cannot be read |
/// | [`IoError::EmptyFileList`] | The list names no files |
/// | [`IoError::UnknownExtension`] | Neither a list nor a feature file |
#[instrument(fields(arg = %arg.display()))]
pub fn expand_feature_arg(arg: &Path) -> Result<Vec<PathBuf>, IoError> {
    let paths = match extension_of(arg).as_str() {
        "lst" | "scp" => {
            let content = std::fs::read_to_string(arg).map_err(|e| IoError::FileNotFound {
                path: arg.to_path_buf(),
                source: e,
            })?;
            let paths: Vec<PathBuf> = content.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(IoError::EmptyFileList {
                    path: arg.to_path_buf(),
                });
            }
            paths
        }
        _ => {
            FeatureFormat::from_path(arg)?;
            vec![arg.to_path_buf()]
        }
    };
    info!(n_files = paths.len(), "feature argument expanded");
    Ok(paths)
}
