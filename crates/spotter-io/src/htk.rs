//! HTK parameter file reader.
//!
//! Layout: a 12-byte big-endian header followed by `n_samples` frames of
//! `sample_size / 4` big-endian `f32` values.
//!
//! | Offset | Type  | Field         |
//! |--------|-------|---------------|
//! | 0      | `i32` | `n_samples`   |
//! | 4      | `i32` | `samp_period` (100 ns units) |
//! | 8      | `i16` | `samp_size` (bytes per frame) |
//! | 10     | `i16` | `parm_kind`   |

use std::path::{Path, PathBuf};

use spotter_dtw::FeatureSequence;
use tracing::{debug, instrument};

use crate::IoError;

const HEADER_LEN: usize = 12;
/// `_C` qualifier: compressed 16-bit data.
const KIND_COMPRESSED: u16 = 0o2000;
/// `_K` qualifier: trailing CRC checksum.
const KIND_CRC: u16 = 0o10000;

/// Decoded HTK header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtkHeader {
    /// Number of frames.
    pub n_samples: usize,
    /// Frame period in 100 ns units.
    pub sample_period: u32,
    /// Bytes per frame.
    pub sample_size: usize,
    /// Raw parameter kind, base kind plus qualifier bits.
    pub parm_kind: u16,
}

impl HtkHeader {
    /// Number of `f32` values per frame.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.sample_size / 4
    }

    fn parse(path: &Path, bytes: &[u8]) -> Result<Self, IoError> {
        let invalid = |reason: String| IoError::InvalidHtkHeader {
            path: path.to_path_buf(),
            reason,
        };
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(invalid(format!("{} bytes is shorter than the header", bytes.len())));
        };
        let n_samples = i32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let sample_period = i32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let sample_size = i16::from_be_bytes([header[8], header[9]]);
        let parm_kind = u16::from_be_bytes([header[10], header[11]]);

        let n_samples = usize::try_from(n_samples)
            .map_err(|_| invalid(format!("negative sample count {n_samples}")))?;
        let sample_period = u32::try_from(sample_period)
            .map_err(|_| invalid(format!("negative sample period {sample_period}")))?;
        let sample_size = usize::try_from(sample_size)
            .ok()
            .filter(|&s| s > 0 && s % 4 == 0)
            .ok_or_else(|| invalid(format!("sample size {sample_size} is not a positive multiple of 4")))?;

        if parm_kind & (KIND_COMPRESSED | KIND_CRC) != 0 {
            return Err(IoError::UnsupportedHtkKind {
                path: path.to_path_buf(),
                kind: parm_kind,
            });
        }

        Ok(Self {
            n_samples,
            sample_period,
            sample_size,
            parm_kind,
        })
    }
}

/// Reads one HTK parameter file into a [`FeatureSequence`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::InvalidHtkHeader`] | Short header, negative fields, bad sample size |
/// | [`IoError::UnsupportedHtkKind`] | Compressed or CRC-protected data |
/// | [`IoError::EmptyFeatureFile`] | Header declares zero samples |
/// | [`IoError::TruncatedHtk`] | Fewer data bytes than declared |
/// | [`IoError::InvalidFeatures`] | A decoded value is NaN or infinite |
pub struct HtkReader {
    path: PathBuf,
}

impl HtkReader {
    /// Create a new reader for the given HTK file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and decode the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<(HtkHeader, FeatureSequence), IoError> {
        let bytes = std::fs::read(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let header = HtkHeader::parse(&self.path, &bytes)?;
        debug!(
            n_samples = header.n_samples,
            dim = header.dim(),
            parm_kind = header.parm_kind,
            "read HTK header"
        );

        if header.n_samples == 0 {
            return Err(IoError::EmptyFeatureFile {
                path: self.path.clone(),
            });
        }

        let body = &bytes[HEADER_LEN..];
        let expected = header.n_samples.saturating_mul(header.sample_size);
        if body.len() < expected {
            return Err(IoError::TruncatedHtk {
                path: self.path.clone(),
                expected,
                got: body.len(),
            });
        }

        let data: Vec<f64> = body[..expected]
            .chunks_exact(4)
            .map(|b| f64::from(f32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            .collect();
        let sequence =
            FeatureSequence::from_flat(data, header.dim()).map_err(|e| IoError::InvalidFeatures {
                path: self.path.clone(),
                source: e,
            })?;
        Ok((header, sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn htk_bytes(n_samples: i32, sample_size: i16, parm_kind: u16, values: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(n_samples.to_be_bytes());
        bytes.extend(100_000i32.to_be_bytes());
        bytes.extend(sample_size.to_be_bytes());
        bytes.extend(parm_kind.to_be_bytes());
        for v in values {
            bytes.extend(v.to_be_bytes());
        }
        bytes
    }

    fn write_htk(bytes: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_mfcc() {
        // MFCC_E = 6 | 0o100
        let f = write_htk(&htk_bytes(3, 8, 6 | 0o100, &[1.0, 2.0, 3.0, 4.0, 5.5, -6.0]));
        let (header, seq) = HtkReader::new(f.path()).read().unwrap();
        assert_eq!(header.n_samples, 3);
        assert_eq!(header.sample_period, 100_000);
        assert_eq!(header.dim(), 2);
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.dim(), 2);
        assert_eq!(seq.frame(2), &[5.5, -6.0]);
    }

    #[test]
    fn compressed_kind_rejected() {
        let f = write_htk(&htk_bytes(1, 4, 6 | KIND_COMPRESSED, &[1.0]));
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::UnsupportedHtkKind { .. }));
    }

    #[test]
    fn crc_kind_rejected() {
        let f = write_htk(&htk_bytes(1, 4, 9 | KIND_CRC, &[1.0]));
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::UnsupportedHtkKind { .. }));
    }

    #[test]
    fn truncated_body_rejected() {
        let f = write_htk(&htk_bytes(4, 8, 6, &[1.0, 2.0, 3.0]));
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::TruncatedHtk { expected: 32, got: 12, .. }));
    }

    #[test]
    fn odd_sample_size_rejected() {
        let f = write_htk(&htk_bytes(1, 6, 6, &[1.0, 2.0]));
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidHtkHeader { .. }));
    }

    #[test]
    fn short_header_rejected() {
        let f = write_htk(&[0, 0, 0, 1]);
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidHtkHeader { .. }));
    }

    #[test]
    fn zero_samples_is_empty() {
        let f = write_htk(&htk_bytes(0, 4, 6, &[]));
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyFeatureFile { .. }));
    }

    #[test]
    fn nan_value_rejected() {
        let f = write_htk(&htk_bytes(2, 4, 6, &[1.0, f32::NAN]));
        let err = HtkReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidFeatures { .. }));
    }

    #[test]
    fn missing_file() {
        let err = HtkReader::new(Path::new("/nonexistent/q.mfc")).read().unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
