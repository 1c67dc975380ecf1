//! Retrieval request/result types.

use reqwest::header::HeaderMap;

use crate::charset::{CharsetOverride, DecodedText};

/// Which headers go out with a request.
#[derive(Debug, Clone, Default)]
pub enum HeaderSelection {
    /// Client profile, including `Accept-Encoding`
    #[default]
    Full,
    /// Client profile without `Accept-Encoding`
    NoCompression,
    /// Exactly these headers
    Custom(HeaderMap),
}

/// A single content retrieval.
///
/// ```
/// use textfetch::RetrievalRequest;
///
/// let request = RetrievalRequest::new("https://example.com/")
///     .without_compression()
///     .charset("gbk");
/// assert_eq!(request.url(), "https://example.com/");
/// ```
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub(crate) url: String,
    pub(crate) headers: HeaderSelection,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) charset: Option<CharsetOverride>,
}

impl RetrievalRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderSelection::Full,
            body: None,
            charset: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send exactly `headers` instead of the client profile.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = HeaderSelection::Custom(headers);
        self
    }

    /// Use the client profile minus `Accept-Encoding`.
    #[must_use]
    pub fn without_compression(mut self) -> Self {
        self.headers = HeaderSelection::NoCompression;
        self
    }

    /// Attach a request body; the request becomes a POST.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Decode with `label` and skip detection.
    ///
    /// The label `ignore` (any case) is the same as [`ignore_charset`](Self::ignore_charset).
    #[must_use]
    pub fn charset(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.charset = Some(if label.eq_ignore_ascii_case("ignore") {
            CharsetOverride::Ignore
        } else {
            CharsetOverride::Label(label)
        });
        self
    }

    /// Return the (decompressed) bytes without decoding.
    #[must_use]
    pub fn ignore_charset(mut self) -> Self {
        self.charset = Some(CharsetOverride::Ignore);
        self
    }
}

/// Outcome of [`FetchClient::retrieve`](super::FetchClient::retrieve).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieved {
    Text(DecodedText),
    /// Charset was [`CharsetOverride::Ignore`]
    Bytes(Vec<u8>),
}

impl Retrieved {
    /// Decoded text, if the body was decoded.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Retrieved::Text(decoded) => Some(&decoded.text),
            Retrieved::Bytes(_) => None,
        }
    }

    /// Text, with raw bytes read as lossy UTF-8.
    pub fn into_string(self) -> String {
        match self {
            Retrieved::Text(decoded) => decoded.text,
            Retrieved::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Raw bytes, with text re-encoded as UTF-8.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Retrieved::Text(decoded) => decoded.text.into_bytes(),
            Retrieved::Bytes(bytes) => bytes,
        }
    }
}
