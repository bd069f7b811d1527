//! Drive share-link parsing.
//!
//! Shareable links embed the file id either as a path segment
//! (`.../file/d/<id>/view`) or as a query parameter (`?id=<id>`).

use once_cell::sync::Lazy;
use regex::Regex;

/// File ids are at least 25 chars of alphanumerics, hyphen, underscore.
static FILE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/d/|id=)([-\w]{25,})").expect("file-id regex is valid"));

/// Extract the file id embedded in a share link.
///
/// Returns the first captured token, or `None` when the text contains no
/// recognized convention. Never panics on malformed input.
pub fn extract_file_id(link: &str) -> Option<&str> {
    FILE_ID_RE
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
