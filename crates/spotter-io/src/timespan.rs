//! Time-span arguments: literal spans and per-feature span files.

use std::path::Path;

use spotter_dtw::TimeSpan;
use tracing::{debug, instrument, warn};

use crate::IoError;
use crate::reader::extension_of;

/// Parse `"<start>-<end>"` or `"<start> <end>"`: two digit runs joined by
/// exactly one hyphen or one space.
///
/// Surrounding whitespace is ignored and an empty string means no restriction.
///
/// # Errors
///
/// Returns [`IoError::MalformedTimeSpan`] when the text is not of that form
/// or `start > end`.
pub fn parse_time_span(text: &str) -> Result<Option<TimeSpan>, IoError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let malformed = || IoError::MalformedTimeSpan {
        text: text.to_string(),
    };
    let (start, end) = trimmed.split_once(['-', ' ']).ok_or_else(malformed)?;
    let start = frame_index(start).ok_or_else(malformed)?;
    let end = frame_index(end).ok_or_else(malformed)?;
    TimeSpan::new(start, end).map(Some).map_err(|_| malformed())
}

fn frame_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Resolve a time-span argument for `n` features.
///
/// A `.txt` argument is a file with one span per line, line `i` applying to
/// feature `i`; empty lines leave a feature unrestricted and rows past `n`
/// are ignored with a warning. Any other argument is a literal span applied
/// to the first feature only.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | The span file cannot be read |
/// | [`IoError::MalformedTimeSpanRow`] | A row of the span file is malformed |
/// | [`IoError::MalformedTimeSpan`] | The literal span is malformed |
#[instrument]
pub fn read_time_spans(arg: &str, n: usize) -> Result<Vec<Option<TimeSpan>>, IoError> {
    let mut spans = vec![None; n];
    let path = Path::new(arg);

    if extension_of(path) != "txt" {
        let span = parse_time_span(arg)?;
        if let Some(first) = spans.first_mut() {
            *first = span;
        }
        return Ok(spans);
    }

    let content = std::fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    for (index, line) in content.lines().enumerate() {
        if index >= n {
            warn!(
                path = %path.display(),
                features = n,
                "more time-span rows than features, ignoring the rest"
            );
            break;
        }
        spans[index] = parse_time_span(line).map_err(|_| IoError::MalformedTimeSpanRow {
            path: path.to_path_buf(),
            line: index + 1,
            text: line.to_string(),
        })?;
    }
    debug!(restricted = spans.iter().filter(|s| s.is_some()).count(), "time spans read");
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn span(start: usize, end: usize) -> Option<TimeSpan> {
        Some(TimeSpan::new(start, end).unwrap())
    }

    #[test]
    fn hyphen_and_space_forms() {
        assert_eq!(parse_time_span("10-20").unwrap(), span(10, 20));
        assert_eq!(parse_time_span("10 20").unwrap(), span(10, 20));
        assert_eq!(parse_time_span(" 3-3\r").unwrap(), span(3, 3));
    }

    #[test]
    fn only_one_separator_allowed() {
        for bad in ["10  20", "10 - 20", "10- 20", "10 -20", "10\t20"] {
            assert!(
                matches!(parse_time_span(bad), Err(IoError::MalformedTimeSpan { .. })),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn empty_means_unrestricted() {
        assert_eq!(parse_time_span("").unwrap(), None);
        assert_eq!(parse_time_span("   ").unwrap(), None);
    }

    #[test]
    fn malformed_spans_rejected() {
        for bad in ["10", "a-b", "10-", "-5-10", "20-10", "1.5-3", "+5-10", "10-20-30"] {
            assert!(
                matches!(parse_time_span(bad), Err(IoError::MalformedTimeSpan { .. })),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn literal_applies_to_first_feature_only() {
        let spans = read_time_spans("5-9", 3).unwrap();
        assert_eq!(spans, vec![span(5, 9), None, None]);
        assert_eq!(read_time_spans("", 2).unwrap(), vec![None, None]);
    }

    #[test]
    fn file_rows_map_to_features() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spans.txt");
        fs::write(&path, "0-10\n\n4 8\n").unwrap();
        let spans = read_time_spans(path.to_str().unwrap(), 4).unwrap();
        assert_eq!(spans, vec![span(0, 10), None, span(4, 8), None]);
    }

    #[test]
    fn extra_rows_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spans.txt");
        fs::write(&path, "0-1\n2-3\nnot a span\n").unwrap();
        let spans = read_time_spans(path.to_str().unwrap(), 2).unwrap();
        assert_eq!(spans, vec![span(0, 1), span(2, 3)]);
    }

    #[test]
    fn malformed_row_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spans.txt");
        fs::write(&path, "0-1\noops\n").unwrap();
        let err = read_time_spans(path.to_str().unwrap(), 5).unwrap_err();
        assert!(matches!(err, IoError::MalformedTimeSpanRow { line: 2, .. }));
    }

    #[test]
    fn missing_span_file() {
        let err = read_time_spans("/nonexistent/spans.txt", 1).unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
