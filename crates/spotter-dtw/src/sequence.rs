//! Feature sequences, zero-copy windowed views and time spans.

use std::fmt;

use crate::error::DtwError;

/// A half-open frame range `[start, end)`.
///
/// Used both to restrict a sequence before alignment and to report where a
/// hypothesis lies in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpan {
    start: usize,
    end: usize,
}

impl TimeSpan {
    /// Create a span, validating `start <= end`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidTimeSpan`] | `start > end` |
    pub fn new(start: usize, end: usize) -> Result<Self, DtwError> {
        if start > end {
            return Err(DtwError::InvalidTimeSpan {
                start,
                end,
                len: usize::MAX,
            });
        }
        Ok(Self { start, end })
    }

    /// The span covering a whole sequence of `len` frames.
    #[must_use]
    pub fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    pub(crate) fn new_unchecked(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "reversed span [{start}, {end})");
        Self { start, end }
    }

    /// First frame of the span.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last frame of the span.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of frames covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Return true if the span covers no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Return true if the two spans share at least one frame.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Return true if `other` lies entirely inside this span.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Owned, validated sequence of fixed-dimension feature frames.
///
/// Guaranteed to hold at least one frame, a non-zero dimension and only
/// finite values. Frames are stored row-major in one flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    data: Vec<f64>,
    dim: usize,
}

impl FeatureSequence {
    /// Build a sequence from one vector per frame.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::NoFrames`] | `frames` is empty |
    /// | [`DtwError::ZeroDimension`] | The first frame is empty |
    /// | [`DtwError::RaggedFrame`] | A frame's length differs from the first frame's |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn from_frames(frames: Vec<Vec<f64>>) -> Result<Self, DtwError> {
        let dim = frames.first().ok_or(DtwError::NoFrames)?.len();
        if dim == 0 {
            return Err(DtwError::ZeroDimension);
        }
        let mut data = Vec::with_capacity(frames.len() * dim);
        for (frame, values) in frames.into_iter().enumerate() {
            if values.len() != dim {
                return Err(DtwError::RaggedFrame {
                    frame,
                    expected: dim,
                    got: values.len(),
                });
            }
            data.extend(values);
        }
        Self::from_flat(data, dim)
    }

    /// Build a sequence from a row-major buffer of `dim`-wide frames.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::ZeroDimension`] | `dim` is zero |
    /// | [`DtwError::NoFrames`] | `data` is empty |
    /// | [`DtwError::PartialFrame`] | `data.len()` is not a multiple of `dim` |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn from_flat(data: Vec<f64>, dim: usize) -> Result<Self, DtwError> {
        if dim == 0 {
            return Err(DtwError::ZeroDimension);
        }
        if data.is_empty() {
            return Err(DtwError::NoFrames);
        }
        if data.len() % dim != 0 {
            return Err(DtwError::PartialFrame {
                len: data.len(),
                dim,
            });
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(DtwError::NonFiniteValue {
                frame: index / dim,
                dim: index % dim,
            });
        }
        Ok(Self { data, dim })
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Always `false` for a constructed sequence. Provided to satisfy the
    /// `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Feature dimension of every frame.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Borrow frame `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[must_use]
    pub fn frame(&self, index: usize) -> &[f64] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Borrow the whole sequence as a view.
    #[must_use]
    pub fn as_view(&self) -> FeatureView<'_> {
        FeatureView {
            data: &self.data,
            dim: self.dim,
            offset: 0,
        }
    }

    /// Borrow the frames inside `span`, or the whole sequence when `span` is `None`.
    ///
    /// An empty span yields an empty view; the engine reports such pairings as
    /// having no hypotheses.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidTimeSpan`] | `span.end()` is past the last frame |
    pub fn view(&self, span: Option<TimeSpan>) -> Result<FeatureView<'_>, DtwError> {
        let Some(span) = span else {
            return Ok(self.as_view());
        };
        let len = self.len();
        if span.end > len {
            return Err(DtwError::InvalidTimeSpan {
                start: span.start,
                end: span.end,
                len,
            });
        }
        Ok(FeatureView {
            data: &self.data[span.start * self.dim..span.end * self.dim],
            dim: self.dim,
            offset: span.start,
        })
    }
}

impl TryFrom<Vec<Vec<f64>>> for FeatureSequence {
    type Error = DtwError;

    fn try_from(frames: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_frames(frames)
    }
}

/// Borrowed window over a [`FeatureSequence`]. Zero-copy.
///
/// Frame indices passed to [`frame`](Self::frame) are relative to the window;
/// [`offset`](Self::offset) maps them back to absolute sequence positions.
#[derive(Debug, Clone, Copy)]
pub struct FeatureView<'a> {
    data: &'a [f64],
    dim: usize,
    offset: usize,
}

impl<'a> FeatureView<'a> {
    /// Number of frames in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Return true if the window covers no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Feature dimension of every frame.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Absolute index of the window's first frame.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The absolute span this window covers.
    #[must_use]
    pub fn span(&self) -> TimeSpan {
        TimeSpan::new_unchecked(self.offset, self.offset + self.len())
    }

    /// Borrow frame `index`, relative to the window start.
    #[must_use]
    pub fn frame(&self, index: usize) -> &'a [f64] {
        debug_assert!(
            index < self.len(),
            "frame {index} outside window of {} frames",
            self.len()
        );
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Iterate over the frames in the window.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &'a [f64]> + 'a {
        self.data.chunks_exact(self.dim)
    }
}
