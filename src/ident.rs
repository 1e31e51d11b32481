//! Preset name sanitization
//! ------------------------
//! Single source of truth for turning a client-supplied preset name into a
//! file stem that stays inside its target folder.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::backend::PRESET_EXTENSION;

/// Longest file name most filesystems accept, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Longest file stem we will produce, in bytes. Leaves room for the extension.
pub const MAX_NAME_BYTES: usize = MAX_FILE_NAME_BYTES - PRESET_EXTENSION.len();

static ILLEGAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/?<>\\:*|"]"#).unwrap());
static CONTROL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1f\x{80}-\x{9f}]").unwrap());
static ONLY_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.+$").unwrap());
static LEADING_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.+").unwrap());
static WINDOWS_RESERVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").unwrap());
static TRAILING_DOTS_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\. ]+$").unwrap());

/// Sanitize a raw preset name into a filesystem-safe stem.
///
/// Returns an empty string when nothing usable is left; callers treat that as
/// an invalid name.
pub fn sanitize_name(raw: &str) -> String {
    let nfc: String = raw.nfc().collect();
    let s = ILLEGAL.replace_all(&nfc, "");
    let s = CONTROL.replace_all(&s, "");
    if ONLY_DOTS.is_match(&s) {
        return String::new();
    }
    let s = LEADING_DOTS.replace(&s, "");
    if WINDOWS_RESERVED.is_match(&s) {
        return String::new();
    }
    let s = TRAILING_DOTS_SPACES.replace(&s, "");
    let truncated = truncate_bytes(&s, MAX_NAME_BYTES);
    TRAILING_DOTS_SPACES.replace(truncated, "").into_owned()
}

/// Cut `s` to at most `max` bytes without splitting a character.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Sanitize and reject empty results in one step.
pub fn sanitized_or_none(raw: Option<&str>) -> Option<String> {
    let name = sanitize_name(raw?);
    if name.is_empty() { None } else { Some(name) }
}
