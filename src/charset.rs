//! Charset resolution and lossy decoding
//!
//! Resolution order: explicit caller choice, the `charset=` parameter of
//! `Content-Type`, a `charset=` declaration inside the body (meta tags),
//! then UTF-8. Decoding never fails; undecodable bytes become U+FFFD.

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::{bytes, Regex};

use crate::matcher::{match1, match1_bytes};

pub const DEFAULT_CHARSET: &str = "utf-8";

static CONTENT_TYPE_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"charset=([\w-]+)").expect("charset pattern is valid"));

static BODY_CHARSET_QUOTED: Lazy<bytes::Regex> = Lazy::new(|| {
    bytes::Regex::new(r#"charset="([\w-]+)"#).expect("quoted charset pattern is valid")
});

static BODY_CHARSET_BARE: Lazy<bytes::Regex> =
    Lazy::new(|| bytes::Regex::new(r"charset=([\w-]+)").expect("charset pattern is valid"));

/// How the caller wants the body decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharsetOverride {
    /// Decode with this label, skipping detection
    Label(String),
    /// Don't decode, hand back the bytes
    Ignore,
}

/// `charset=` parameter of a `Content-Type` value.
pub fn from_content_type(content_type: &str) -> Option<&str> {
    match1(content_type, &[&CONTENT_TYPE_CHARSET])
}

/// Charset declared inside the document, quoted form first.
pub fn sniff_body(body: &[u8]) -> Option<String> {
    match1_bytes(body, &[&BODY_CHARSET_QUOTED, &BODY_CHARSET_BARE])
        .map(|label| String::from_utf8_lossy(label).into_owned())
}

/// Pick the charset label for a body when the caller didn't choose one.
pub fn resolve(content_type: Option<&str>, body: &[u8]) -> String {
    content_type
        .and_then(from_content_type)
        .map(str::to_string)
        .or_else(|| sniff_body(body))
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

/// Text decoded from a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Label the decode was asked for
    pub charset: String,
    /// Canonical name of the encoding actually used
    pub encoding: &'static str,
    /// Some bytes were invalid and replaced with U+FFFD
    pub lossy: bool,
    /// The label was unknown and UTF-8 was used instead
    pub fallback: bool,
}

impl DecodedText {
    /// The charset was probably wrong for this body.
    pub fn suspicious(&self) -> bool {
        self.lossy || self.fallback
    }
}

/// Decode `bytes` as `label`, replacing invalid sequences.
///
/// A byte-order mark is kept as part of the text, like any other bytes.
/// Labels resolve through the WHATWG table, so `iso-8859-1` and `latin1`
/// decode as windows-1252 (0x80-0x9F become punctuation, not C1 controls).
pub fn decode(bytes: &[u8], label: &str) -> DecodedText {
    let (encoding, fallback) = match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => (encoding, false),
        None => (UTF_8, true),
    };
    let (text, lossy) = encoding.decode_without_bom_handling(bytes);

    DecodedText {
        text: text.into_owned(),
        charset: label.to_string(),
        encoding: encoding.name(),
        lossy,
        fallback,
    }
}
