//! Query-by-example alignment with dynamic time warping.
//!
//! Pure math library, zero I/O. Aligns a query feature sequence against a
//! document under one of several warping policies (free-frame, fixed-frame,
//! slope-constrained, segmental, diagonal-band), extracts the top-N
//! non-overlapping match regions and optionally backtracks frame-level paths.

mod batch;
mod config;
mod engine;
mod error;
mod hypothesis;
mod kernel;
mod path;
mod rules;
mod score;
mod segment;
mod sequence;
mod trellis;

pub use batch::{SearchGrid, SearchInput, search_all};
pub use config::{AlignConfig, Policy, SegmentConfig};
pub use engine::{Aligner, Alignment, align};
pub use error::DtwError;
pub use hypothesis::Hypothesis;
pub use kernel::{Kernel, KernelFn, euclidean, log_inner_product};
pub use path::{WarpingPath, WarpingStep};
pub use score::Score;
pub use segment::{Segment, Segmentation, SuperSegment};
pub use sequence::{FeatureSequence, FeatureView, TimeSpan};
