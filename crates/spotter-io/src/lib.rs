//! File I/O, validation, and serialization for the spotter pipeline.

mod csv_features;
mod domain;
mod error;
mod htk;
mod list;
mod reader;
mod timespan;
mod writer;

pub use csv_features::CsvFeatureReader;
pub use domain::{ExperimentName, FeatureFile};
pub use error::IoError;
pub use htk::{HtkHeader, HtkReader};
pub use list::expand_feature_arg;
pub use reader::{FeatureFormat, FeatureReader};
pub use timespan::{parse_time_span, read_time_spans};
pub use writer::ResultWriter;
