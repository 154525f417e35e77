//! Alignment policy selection and configuration builders.

use std::fmt;

use crate::error::DtwError;
use crate::kernel::Kernel;

/// Structural policy that decides which warping paths are legal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Two-level matching over basic segments with super-segment jumps.
    Segmental,

    /// Subsequence match whose vertical and horizontal runs are bounded.
    #[default]
    SlopeConstrained,

    /// Unconstrained subsequence match: the query may start and end anywhere
    /// in the document.
    FreeFrame,

    /// Whole-sequence match from `(0, 0)` to the last cell.
    FixFrame,

    /// Subsequence match confined to a band around the diagonal through the
    /// path's start column (segmental DTW in the Park–Glass sense).
    DiagonalBand,
}

impl Policy {
    /// Resolve a numeric selection code.
    ///
    /// | Code | Policy |
    /// |---|---|
    /// | 0 | [`Policy::Segmental`] |
    /// | 1 | [`Policy::SlopeConstrained`] |
    /// | 2 | [`Policy::FreeFrame`] |
    /// | 3 | [`Policy::FixFrame`] |
    /// | 4 | [`Policy::DiagonalBand`] |
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::UnknownPolicy`] | `code > 4` |
    pub fn from_code(code: u8) -> Result<Self, DtwError> {
        match code {
            0 => Ok(Self::Segmental),
            1 => Ok(Self::SlopeConstrained),
            2 => Ok(Self::FreeFrame),
            3 => Ok(Self::FixFrame),
            4 => Ok(Self::DiagonalBand),
            _ => Err(DtwError::UnknownPolicy { code }),
        }
    }

    /// Short human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Segmental => "segmental",
            Self::SlopeConstrained => "slope-constrained",
            Self::FreeFrame => "free-frame",
            Self::FixFrame => "fix-frame",
            Self::DiagonalBand => "diagonal-band",
        }
    }

    /// Return true if the policy compares segments rather than frames.
    #[must_use]
    pub fn uses_segments(self) -> bool {
        matches!(self, Self::Segmental)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of the two-level segment builder.
///
/// # Defaults
///
/// | Parameter        | Default |
/// |------------------|---------|
/// | `bseg_ratio`     | 0.5     |
/// | `superseg_ratio` | 4.0     |
/// | `width`          | 3       |
/// | `gran`           | 3       |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentConfig {
    pub(crate) bseg_ratio: f64,
    pub(crate) superseg_ratio: f64,
    pub(crate) width: usize,
    pub(crate) gran: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            bseg_ratio: 0.5,
            superseg_ratio: 4.0,
            width: 3,
            gran: 3,
        }
    }
}

impl SegmentConfig {
    /// Create a segment configuration with the given merge ratios and default widths.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidParameter`] | `bseg_ratio` outside `(0, 1]` or `superseg_ratio < 1` |
    pub fn new(bseg_ratio: f64, superseg_ratio: f64) -> Result<Self, DtwError> {
        let config = Self {
            bseg_ratio,
            superseg_ratio,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the maximum number of frames in a basic segment.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set how many basic-segment widths a super-segment may span.
    #[must_use]
    pub fn with_gran(mut self, gran: usize) -> Self {
        self.gran = gran;
        self
    }

    /// Target fraction of basic segments per frame.
    #[must_use]
    pub fn bseg_ratio(&self) -> f64 {
        self.bseg_ratio
    }

    /// Target number of basic segments per super-segment.
    #[must_use]
    pub fn superseg_ratio(&self) -> f64 {
        self.superseg_ratio
    }

    /// Maximum frames per basic segment.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Maximum span of a super-segment, in basic-segment widths.
    #[must_use]
    pub fn gran(&self) -> usize {
        self.gran
    }

    pub(crate) fn validate(&self) -> Result<(), DtwError> {
        if !(self.bseg_ratio > 0.0 && self.bseg_ratio <= 1.0) {
            return Err(invalid("bseg_ratio", self.bseg_ratio, "must lie in (0, 1]"));
        }
        if !(self.superseg_ratio >= 1.0 && self.superseg_ratio.is_finite()) {
            return Err(invalid(
                "superseg_ratio",
                self.superseg_ratio,
                "must be a finite value of at least 1",
            ));
        }
        if self.width == 0 {
            return Err(invalid("width", self.width, "must be at least 1"));
        }
        if self.gran == 0 {
            return Err(invalid("gran", self.gran, "must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for one query×document alignment.
///
/// Construct via [`AlignConfig::new`], then chain `with_*` methods to override
/// defaults. Parameters are validated when an [`Aligner`](crate::Aligner) is built.
///
/// # Defaults
///
/// | Parameter      | Default                        |
/// |----------------|--------------------------------|
/// | `kernel`       | [`Kernel::Euclidean`]          |
/// | `n_hypotheses` | 5                              |
/// | `backtrack`    | false                          |
/// | `slope_limit`  | 2                              |
/// | `band_radius`  | 10                             |
/// | `band_stride`  | 1                              |
/// | `segment`      | [`SegmentConfig::default`]     |
#[derive(Debug, Clone, PartialEq)]
pub struct AlignConfig {
    pub(crate) policy: Policy,
    pub(crate) kernel: Kernel,
    pub(crate) n_hypotheses: usize,
    pub(crate) backtrack: bool,
    pub(crate) slope_limit: usize,
    pub(crate) band_radius: usize,
    pub(crate) band_stride: usize,
    pub(crate) segment: SegmentConfig,
}

impl AlignConfig {
    /// Create a configuration for `policy` with default parameters.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            kernel: Kernel::Euclidean,
            n_hypotheses: 5,
            backtrack: false,
            slope_limit: 2,
            band_radius: 10,
            band_stride: 1,
            segment: SegmentConfig::default(),
        }
    }

    /// Set the local distance kernel.
    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set how many non-overlapping hypotheses to extract per pairing.
    #[must_use]
    pub fn with_n_hypotheses(mut self, n_hypotheses: usize) -> Self {
        self.n_hypotheses = n_hypotheses;
        self
    }

    /// Request a frame-level warping path for every hypothesis.
    #[must_use]
    pub fn with_backtrack(mut self, backtrack: bool) -> Self {
        self.backtrack = backtrack;
        self
    }

    /// Set the maximum number of consecutive vertical (or horizontal) steps
    /// allowed by [`Policy::SlopeConstrained`].
    #[must_use]
    pub fn with_slope_limit(mut self, slope_limit: usize) -> Self {
        self.slope_limit = slope_limit;
        self
    }

    /// Set the band radius used by [`Policy::DiagonalBand`].
    #[must_use]
    pub fn with_band_radius(mut self, band_radius: usize) -> Self {
        self.band_radius = band_radius;
        self
    }

    /// Set the spacing between legal start columns for [`Policy::DiagonalBand`].
    #[must_use]
    pub fn with_band_stride(mut self, band_stride: usize) -> Self {
        self.band_stride = band_stride;
        self
    }

    /// Set the segment builder parameters used by [`Policy::Segmental`].
    #[must_use]
    pub fn with_segment(mut self, segment: SegmentConfig) -> Self {
        self.segment = segment;
        self
    }

    /// Return the alignment policy.
    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Return the local distance kernel.
    #[must_use]
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Return the requested number of hypotheses.
    #[must_use]
    pub fn n_hypotheses(&self) -> usize {
        self.n_hypotheses
    }

    /// Return true if warping paths are requested.
    #[must_use]
    pub fn backtrack(&self) -> bool {
        self.backtrack
    }

    /// Return the segment builder parameters.
    #[must_use]
    pub fn segment(&self) -> &SegmentConfig {
        &self.segment
    }

    pub(crate) fn validate(&self) -> Result<(), DtwError> {
        match self.policy {
            Policy::SlopeConstrained if self.slope_limit == 0 => {
                Err(invalid("slope_limit", self.slope_limit, "must be at least 1"))
            }
            Policy::DiagonalBand if self.band_stride == 0 => {
                Err(invalid("band_stride", self.band_stride, "must be at least 1"))
            }
            Policy::Segmental => self.segment.validate(),
            _ => Ok(()),
        }
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

fn invalid(name: &'static str, value: impl fmt::Display, reason: &'static str) -> DtwError {
    DtwError::InvalidParameter {
        name,
        value: value.to_string(),
        reason,
    }
}
