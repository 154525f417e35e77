//! Error types for feature sequences, configuration and alignment.

/// Errors from sequence validation, engine configuration and trellis computation.
#[derive(Debug, thiserror::Error)]
pub enum DtwError {
    /// Returned when a query or document has no frames after time-span restriction.
    ///
    /// This is a degenerate-input condition, not a fatal one: the pair-level
    /// [`align`](crate::align) entry point and [`search_all`](crate::search_all)
    /// turn it into an empty hypothesis list.
    #[error("{role} sequence has no frames in its effective time span")]
    EmptySequence {
        /// Which side of the pairing was empty (`"query"` or `"document"`).
        role: &'static str,
    },

    /// Returned when a feature sequence is built from zero frames.
    #[error("feature sequence must contain at least one frame")]
    NoFrames,

    /// Returned when frames are built with a feature dimension of zero.
    #[error("feature dimension must be at least 1")]
    ZeroDimension,

    /// Returned when a frame does not have the same dimension as the first frame.
    #[error("frame {frame} has dimension {got}, expected {expected}")]
    RaggedFrame {
        /// Position of the offending frame.
        frame: usize,
        /// Dimension of the first frame.
        expected: usize,
        /// Dimension of the offending frame.
        got: usize,
    },

    /// Returned when a flat buffer length is not a multiple of the feature dimension.
    #[error("buffer of {len} values cannot be split into frames of dimension {dim}")]
    PartialFrame {
        /// Length of the flat buffer.
        len: usize,
        /// Requested feature dimension.
        dim: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite feature value at frame {frame}, dimension {dim}")]
    NonFiniteValue {
        /// Frame index of the first non-finite value.
        frame: usize,
        /// Dimension index within that frame.
        dim: usize,
    },

    /// Returned when query and document frames have different dimensions.
    #[error("feature dimension mismatch: query has {query}, document has {document}")]
    DimensionMismatch {
        /// Query feature dimension.
        query: usize,
        /// Document feature dimension.
        document: usize,
    },

    /// Returned when a time span is reversed or reaches past the end of the sequence.
    #[error("invalid time span [{start}, {end}) for a sequence of {len} frames")]
    InvalidTimeSpan {
        /// Requested start frame.
        start: usize,
        /// Requested end frame (exclusive).
        end: usize,
        /// Number of frames in the sequence (`usize::MAX` when not known).
        len: usize,
    },

    /// Returned when a distance kernel yields NaN for a trellis cell.
    #[error("distance kernel produced NaN at query unit {query}, document unit {document}")]
    NonFiniteCost {
        /// Query unit (frame or segment) index within the trellis.
        query: usize,
        /// Document unit (frame or segment) index within the trellis.
        document: usize,
    },

    /// Returned when a distance kernel selection code is not recognised.
    #[error("unknown distance kernel code {code} (expected 0 = euclidean, 1 = log inner product)")]
    UnknownKernel {
        /// The rejected selection code.
        code: u8,
    },

    /// Returned when an alignment policy selection code is not recognised.
    #[error("unknown alignment policy code {code} (expected 0..=4)")]
    UnknownPolicy {
        /// The rejected selection code.
        code: u8,
    },

    /// Returned when a configuration parameter is outside its valid range.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value, rendered as text.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// Wraps an error raised while aligning one pair of a batch.
    #[error("query {query} vs document {document}: {source}")]
    Pair {
        /// Query index within the batch.
        query: usize,
        /// Document index within the batch.
        document: usize,
        /// The underlying error.
        source: Box<DtwError>,
    },
}

impl DtwError {
    /// Return true if this error describes a degenerate input that should be
    /// reported as "no hypotheses" rather than aborting a batch.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::EmptySequence { .. } => true,
            Self::Pair { source, .. } => source.is_degenerate(),
            _ => false,
        }
    }
}
