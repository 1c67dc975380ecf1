//! First-capture-group search over text or raw bytes.

use regex::bytes;
use regex::Regex;

/// First capture group of the first pattern that matches `text`.
///
/// Patterns are tried in order; a pattern without a capture group never
/// matches.
pub fn match1<'t>(text: &'t str, patterns: &[&Regex]) -> Option<&'t str> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// [`match1`] over bytes that may not be valid UTF-8.
pub fn match1_bytes<'h>(haystack: &'h [u8], patterns: &[&bytes::Regex]) -> Option<&'h [u8]> {
    patterns.iter().find_map(|re| {
        re.captures(haystack)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_bytes())
    })
}
