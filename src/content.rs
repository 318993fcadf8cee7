//! # Content Classification and Titles
//!
//! Pure functions over the leading bytes of a payload. The store never
//! inspects more than [`SAMPLE_BYTES`](crate::model::SAMPLE_BYTES) of
//! content to decide how to label an item, so all of these operate on a
//! prefix, not the full payload.
//!
//! ## Classification
//!
//! A payload is binary when its sample contains a NUL byte, or when more
//! than 30% of the sample is control characters other than tab, newline and
//! carriage return. Everything else is treated as text, including invalid
//! UTF-8 (decoded lossily for title purposes).
//!
//! ## Titles
//!
//! The title of a text item is its first non-empty line, sanitized: control
//! characters become spaces, whitespace runs collapse to a single space,
//! and the result is trimmed. Binary and empty payloads get fixed
//! sentinels so lists always have something to show.

/// Title used for payloads classified as binary.
pub const BINARY_TITLE: &str = "[binary content]";

/// Title used when no printable content is available.
pub const EMPTY_TITLE: &str = "[empty]";

/// Fraction of non-text bytes above which a sample is considered binary.
const NON_TEXT_THRESHOLD: f64 = 0.30;

/// Classify a content sample as binary or text.
pub fn is_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    let mut non_text = 0usize;
    for &b in sample {
        if b == 0 {
            return true;
        }
        if b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r') {
            non_text += 1;
        }
    }
    non_text as f64 / sample.len() as f64 > NON_TEXT_THRESHOLD
}

/// Derive a display title from a content sample.
pub fn generate_title(sample: &[u8], is_binary: bool) -> String {
    if is_binary {
        return BINARY_TITLE.to_string();
    }
    if sample.is_empty() {
        return EMPTY_TITLE.to_string();
    }

    let text = String::from_utf8_lossy(sample);
    let title = match text.lines().find(|line| !line.trim().is_empty()) {
        Some(line) => sanitize(line),
        None => sanitize(&text),
    };

    if title.is_empty() {
        EMPTY_TITLE.to_string()
    } else {
        title
    }
}

/// Replace control characters with spaces, collapse whitespace runs and
/// trim the ends.
pub fn sanitize(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shorten a title to at most `max_len` characters, appending `...` when
/// anything was cut.
pub fn truncate_title(s: &str, max_len: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len < 3 {
        return ".".repeat(max_len);
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{}...", head)
}
