//! `\uXXXX` escape normalisation
//!
//! Pages often embed JSON-ish strings with literal `\u4f60` escapes. This
//! turns them back into characters without touching anything else.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\u([0-9A-Fa-f]{4})").expect("escape pattern is valid"));

const HIGH_SURROGATES: std::ops::Range<u32> = 0xD800..0xDC00;
const LOW_SURROGATES: std::ops::Range<u32> = 0xDC00..0xE000;

/// Replace every `\uXXXX` escape (exactly four hex digits) with its character.
///
/// An adjacent high/low surrogate pair becomes one supplementary character.
/// A lone surrogate has no `char` representation and is left as written.
///
/// ```
/// use textfetch::unicodize;
///
/// assert_eq!(unicodize(r"caf\u00e9 \ud83d\ude00"), "café 😀");
/// assert_eq!(unicodize("plain"), "plain");
/// ```
pub fn unicodize(text: &str) -> Cow<'_, str> {
    let mut escapes = ESCAPE.captures_iter(text).peekable();
    if escapes.peek().is_none() {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    while let Some(caps) = escapes.next() {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let Some(unit) = code_unit(&caps[1]) else {
            out.push_str(whole.as_str());
            continue;
        };

        if HIGH_SURROGATES.contains(&unit) {
            let pair = escapes.peek().and_then(|next| {
                let next_whole = next.get(0)?;
                let low = code_unit(&next[1])?;
                if next_whole.start() != whole.end() || !LOW_SURROGATES.contains(&low) {
                    return None;
                }
                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                char::from_u32(combined).map(|ch| (ch, next_whole.end()))
            });
            if let Some((ch, end)) = pair {
                escapes.next();
                out.push(ch);
                last = end;
                continue;
            }
        }

        match char::from_u32(unit) {
            Some(ch) => out.push(ch),
            None => out.push_str(whole.as_str()),
        }
    }

    out.push_str(&text[last..]);
    Cow::Owned(out)
}

fn code_unit(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}
