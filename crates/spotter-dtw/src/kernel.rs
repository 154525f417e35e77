//! Local distance kernels between two feature frames.

use std::fmt;

use crate::error::DtwError;

/// A local distance between two equal-length frames. Lower is more similar.
pub type KernelFn = fn(&[f64], &[f64]) -> f64;

/// Selectable local distance kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Kernel {
    /// Euclidean norm of the frame difference.
    #[default]
    Euclidean,

    /// Negative log of the inner product of the two frames, each normalised
    /// to unit L1 mass. Suited to posteriorgram features.
    LogInnerProduct,
}

impl Kernel {
    /// Resolve a numeric selection code: `0` is Euclidean, `1` is log inner product.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::UnknownKernel`] | `code` is not 0 or 1 |
    pub fn from_code(code: u8) -> Result<Self, DtwError> {
        match code {
            0 => Ok(Self::Euclidean),
            1 => Ok(Self::LogInnerProduct),
            _ => Err(DtwError::UnknownKernel { code }),
        }
    }

    /// Return the kernel as a plain function value.
    #[must_use]
    pub fn function(self) -> KernelFn {
        match self {
            Self::Euclidean => euclidean,
            Self::LogInnerProduct => log_inner_product,
        }
    }

    /// Short human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::LogInnerProduct => "log-inner-product",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `sqrt(sum_k (a_k - b_k)^2)`.
#[must_use]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// `-ln(sum_k p_k q_k)` with `p = a / sum(a)` and `q = b / sum(b)`.
///
/// Returns `+inf` for orthogonal frames and NaN when either frame has zero or
/// negative mass; the trellis rejects NaN costs.
#[must_use]
pub fn log_inner_product(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mass_a: f64 = a.iter().sum();
    let mass_b: f64 = b.iter().sum();
    if mass_a <= 0.0 || mass_b <= 0.0 {
        return f64::NAN;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    -(dot / (mass_a * mass_b)).ln()
}
