//! Upload bookkeeping helpers: safe filenames, hashes, and human-readable sizes and ages.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const MAX_FILENAME_LEN: usize = 255;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").expect("filename pattern compiles"));

/// Replace anything other than word characters, `-`, and `.` with `_`, keeping at most 255
/// bytes and preserving the extension when truncating.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = UNSAFE_FILENAME_CHARS.replace_all(filename, "_").into_owned();
    if sanitized.len() <= MAX_FILENAME_LEN {
        return sanitized;
    }

    let (stem, ext) = match sanitized.rfind('.') {
        Some(dot) if dot > 0 => sanitized.split_at(dot),
        _ => (sanitized.as_str(), ""),
    };
    let mut budget = MAX_FILENAME_LEN.saturating_sub(ext.len());
    while !stem.is_char_boundary(budget.min(stem.len())) {
        budget -= 1;
    }
    format!("{}{}", &stem[..budget.min(stem.len())], ext)
}

/// SHA-256 of the content, hex encoded.
pub fn file_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Format a byte count as `B`, `KB`, `MB`, or `GB` with one decimal.
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".into();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Describe how long ago an RFC3339 timestamp was, relative to `now`.
///
/// Unparseable timestamps are returned unchanged.
pub fn format_age(timestamp: &str, now: OffsetDateTime) -> String {
    let Ok(then) = OffsetDateTime::parse(timestamp, &Rfc3339) else {
        return timestamp.to_string();
    };
    let elapsed = now - then;
    let days = elapsed.whole_days();
    let seconds = elapsed.whole_seconds();

    if days > 0 {
        format!("{days} days ago")
    } else if seconds > 3600 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds > 60 {
        format!("{} minutes ago", seconds / 60)
    } else {
        "Just now".into()
    }
}
