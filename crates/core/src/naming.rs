//! Filename generation, title derivation, and display formatting.
//!
//! Stored filenames carry an epoch-millisecond suffix so repeated uploads of
//! the same document never collide on disk (within the same millisecond they
//! still can; the suffix is an identifier, not a lock). Titles shown to
//! students come from the metadata catalog when present and are otherwise
//! reconstructed from the stored filename by undoing this generation scheme.

use chrono::{DateTime, Local};

/// Generates the on-disk filename for an upload.
///
/// The original base name is sanitized (every character outside
/// `[A-Za-z0-9_-]` becomes `_`), the epoch-millisecond timestamp is
/// appended, and the original extension is preserved.
pub fn stored_file_name(original: &str, timestamp_millis: i64) -> String {
    let (base, ext) = split_extension(original);
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{sanitized}_{timestamp_millis}{ext}")
}

/// Splits a filename into base and extension (extension keeps its dot).
///
/// Only a final dot-delimited segment that contains neither another dot nor
/// a path separator counts as an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext = &name[idx + 1..];
            if !ext.is_empty() && !ext.contains('/') && !ext.contains('.') {
                (&name[..idx], &name[idx..])
            } else {
                (name, "")
            }
        }
        _ => (name, ""),
    }
}

/// Derives a display title from a stored filename.
///
/// Undoes [`stored_file_name`]: strips the extension, strips a trailing
/// 13-digit timestamp suffix, turns underscores into spaces, and title-cases
/// the first letter of each word.
pub fn derive_title(filename: &str) -> String {
    let (base, _ext) = split_extension(filename);
    let base = strip_timestamp_suffix(base);
    let spaced = base.replace('_', " ");

    let mut title = String::with_capacity(spaced.len());
    let mut prev_is_word = false;
    for ch in spaced.chars() {
        let is_word = ch.is_ascii_alphanumeric();
        if is_word && !prev_is_word {
            title.extend(ch.to_uppercase());
        } else {
            title.push(ch);
        }
        prev_is_word = is_word;
    }
    title
}

/// Removes a trailing `_` plus 13-digit millisecond suffix, if present.
fn strip_timestamp_suffix(base: &str) -> &str {
    let len = crate::constants::TIMESTAMP_SUFFIX_LEN;
    if base.len() > len && base.is_char_boundary(base.len() - len) {
        let (head, tail) = base.split_at(base.len() - len);
        if head.ends_with('_') && tail.bytes().all(|b| b.is_ascii_digit()) {
            return &head[..head.len() - 1];
        }
    }
    base
}

/// Formats a byte count as the human-readable string shown in listings.
///
/// Matches the client's expectations: base 1024, two decimals with trailing
/// zeros trimmed, units from Bytes to GB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    let mut rendered = format!("{value:.2}");
    if rendered.contains('.') {
        rendered = rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    }
    format!("{rendered} {}", UNITS[exponent])
}

/// Renders a timestamp as the short date string used for upload/modified dates.
pub fn short_date(timestamp: DateTime<Local>) -> String {
    timestamp.format("%d/%m/%Y").to_string()
}
