//! # Core Data Model
//!
//! The store keeps one file per item and encodes everything it needs for
//! identity and ordering in the filename itself. An [`Item`] is therefore a
//! *descriptor*: it is reconstructed from the directory listing and the file
//! contents on every read, never persisted separately.
//!
//! ## Filename Format
//!
//! ```text
//! 2024-03-01T09-15-30.123456+02-00.txt
//! └──────────┬───────────┘└──┬──┘└┬─┘
//!      date + time         offset  extension
//! ```
//!
//! - Microseconds are always six digits.
//! - The offset is a literal `Z` for UTC, otherwise `±HH-MM`.
//! - The `.txt` extension is historical and says nothing about the payload.
//!
//! [`format_timestamp`] and [`parse_timestamp`] are exact inverses of each
//! other; the round-trip property is what makes the filename a usable
//! identity.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default bound on the number of items kept in the stack.
pub const MAX_STACK_SIZE: usize = 20;

/// Number of leading payload bytes used for classification and titles.
pub const SAMPLE_BYTES: usize = 4096;

/// Maximum length of a derived or caller-supplied title.
pub const MAX_TITLE_LEN: usize = 80;

/// Extension of content files. Retained for backward compatibility with
/// older stores; binary payloads use it too.
pub const CONTENT_FILE_EXT: &str = ".txt";

/// Directory holding content files, relative to the filesystem root.
pub const STORE_DIR: &str = "history";

/// Directory the pre-stack layout kept its files in.
pub const LEGACY_DIR: &str = "content";

/// Marker file whose presence suppresses repeated migration.
pub const MIGRATION_MARKER: &str = ".migration_complete";

/// Descriptor of one stack entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Instant the item was pushed, microsecond resolution, offset
    /// preserved.
    pub timestamp: DateTime<FixedOffset>,
    /// Filename stem; round-trips with the on-disk filename.
    pub id: String,
    /// Display label derived from the content (or supplied at push time).
    pub title: String,
    /// Exact payload size in bytes.
    pub size: u64,
    pub is_binary: bool,
    /// Lowercase hex SHA-256 of the full payload.
    pub sha256: String,
}

impl Item {
    /// Name of the content file backing this item.
    pub fn filename(&self) -> String {
        format!("{}{}", self.id, CONTENT_FILE_EXT)
    }
}

/// Format an instant as a filename stem, e.g.
/// `2024-03-01T09-15-30.123456Z` or `2024-03-01T09-15-30.123456-05-00`.
pub fn format_timestamp(t: &DateTime<FixedOffset>) -> String {
    let micros = t.timestamp_subsec_micros();
    let offset_secs = t.offset().local_minus_utc();
    if offset_secs == 0 {
        format!("{}.{:06}Z", t.format("%Y-%m-%dT%H-%M-%S"), micros)
    } else {
        let sign = if offset_secs < 0 { '-' } else { '+' };
        let abs = offset_secs.abs();
        format!(
            "{}.{:06}{}{:02}-{:02}",
            t.format("%Y-%m-%dT%H-%M-%S"),
            micros,
            sign,
            abs / 3600,
            (abs % 3600) / 60
        )
    }
}

/// Parse a filename stem back into the instant it encodes.
///
/// Returns `None` for anything that does not match the store's format
/// exactly; enumeration uses that to ignore foreign files.
pub fn parse_timestamp(stem: &str) -> Option<DateTime<FixedOffset>> {
    // Date, `T`, time, dot and six digits of microseconds: 26 bytes,
    // followed by the offset (`Z` or `±HH-MM`).
    if !stem.is_ascii() || stem.len() < 27 {
        return None;
    }
    let (local_part, offset_part) = stem.split_at(26);
    let naive = NaiveDateTime::parse_from_str(local_part, "%Y-%m-%dT%H-%M-%S%.6f").ok()?;
    let offset = parse_offset(offset_part)?;
    naive.and_local_timezone(offset).single()
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    if s == "Z" {
        return FixedOffset::east_opt(0);
    }
    let bytes = s.as_bytes();
    if bytes.len() != 6 || bytes[3] != b'-' {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = s[1..3].parse().ok()?;
    let minutes: i32 = s[4..6].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
