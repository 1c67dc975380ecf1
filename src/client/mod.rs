//! Content retrieval pipeline
//!
//! [`FetchClient`] owns the header profile, the default handler registry and
//! the active transport. Build one at startup, configure it, then share it by
//! reference:
//!
//! ```rust,no_run
//! use textfetch::{FetchClient, Handler, RedirectPolicy};
//!
//! # fn example() -> textfetch::Result<()> {
//! let client = FetchClient::new()?;
//! client.add_header("Referer", "https://www.example.com/")?;
//! client.add_default_handler(Handler::Redirect(RedirectPolicy::Limited(5)));
//! client.install_default_handlers()?;
//!
//! let html = client.get_content("https://www.example.com/")?;
//! let target = client.location("https://bit.ly/xyz", None)?;
//! # Ok(())
//! # }
//! ```

mod request;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, instrument, warn};

pub use request::{HeaderSelection, RetrievalRequest, Retrieved};

use crate::charset::{self, CharsetOverride};
use crate::decompress::{gunzip, inflate_raw};
use crate::error::Result;
use crate::handlers::{Handler, HandlerRegistry};
use crate::headers::HeaderProfile;
use crate::matcher::match1;
use crate::transport::{ReqwestTransport, ResponseMeta, Transport, TransportRequest};

static CONTENT_ENCODING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Content-Encoding:\s*([\w-]+)").expect("content-encoding pattern is valid")
});

/// Builds a transport from the registered handlers.
pub type TransportFactory = dyn Fn(&[Handler]) -> Result<Arc<dyn Transport>> + Send + Sync;

/// HTTP helper with browser headers, decompression and charset detection.
pub struct FetchClient {
    headers: RwLock<HeaderProfile>,
    registry: Mutex<HandlerRegistry>,
    transport: RwLock<Arc<dyn Transport>>,
    factory: Box<TransportFactory>,
}

impl FetchClient {
    /// Client with the default Firefox profile and a plain `reqwest` transport.
    pub fn new() -> Result<Self> {
        Self::with_profile(HeaderProfile::default())
    }

    /// Client sending `profile` headers.
    pub fn with_profile(profile: HeaderProfile) -> Result<Self> {
        Self::with_factory(profile, |handlers| {
            let transport: Arc<dyn Transport> =
                Arc::new(ReqwestTransport::with_handlers(handlers)?);
            Ok(transport)
        })
    }

    /// Client whose transports come from `factory`.
    ///
    /// The initial transport is built with no handlers.
    pub fn with_factory<F>(profile: HeaderProfile, factory: F) -> Result<Self>
    where
        F: Fn(&[Handler]) -> Result<Arc<dyn Transport>> + Send + Sync + 'static,
    {
        let transport = factory(&[])?;
        Ok(Self {
            headers: RwLock::new(profile),
            registry: Mutex::new(HandlerRegistry::new()),
            transport: RwLock::new(transport),
            factory: Box::new(factory),
        })
    }

    // ─── Header profile ─────────────────────────────────────────────────────

    /// Add or override an outbound header for all later requests.
    pub fn add_header(&self, key: &str, value: &str) -> Result<()> {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_header(key, value)
    }

    /// Snapshot of the current header profile.
    pub fn header_profile(&self) -> HeaderProfile {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ─── Default handlers ───────────────────────────────────────────────────

    /// Register `handler`, replacing any handler of the same family.
    ///
    /// Takes effect on the next [`install_default_handlers`](Self::install_default_handlers).
    pub fn add_default_handler(&self, handler: Handler) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(handler);
    }

    /// Registered handlers, in order.
    pub fn default_handlers(&self) -> Vec<Handler> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers()
            .to_vec()
    }

    /// Build a transport from the registered handlers and make it active.
    ///
    /// Requests already in flight finish on the transport they started with.
    pub fn install_default_handlers(&self) -> Result<()> {
        let handlers = self.default_handlers();
        let transport = (self.factory)(&handlers)?;
        *self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = transport;
        debug!(count = handlers.len(), "Installed default handlers");
        Ok(())
    }

    fn transport(&self) -> Arc<dyn Transport> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn select_headers(&self, selection: HeaderSelection) -> HeaderMap {
        let profile = self.headers.read().unwrap_or_else(PoisonError::into_inner);
        match selection {
            HeaderSelection::Custom(headers) => headers,
            HeaderSelection::Full => profile.full().clone(),
            HeaderSelection::NoCompression => profile.without_compression().clone(),
        }
    }

    fn headers_or_profile(&self, headers: Option<&HeaderMap>) -> HeaderMap {
        match headers {
            Some(headers) => headers.clone(),
            None => self.select_headers(HeaderSelection::Full),
        }
    }

    // ─── Redirect resolution ────────────────────────────────────────────────

    /// Metadata of `url` after redirects, without downloading the body.
    ///
    /// Sends HEAD; a server answering 405 gets the same request as GET, whose
    /// body is dropped unread. `headers` defaults to the full profile.
    #[instrument(skip(self, headers))]
    pub fn head_response(&self, url: &str, headers: Option<&HeaderMap>) -> Result<ResponseMeta> {
        let transport = self.transport();
        let mut request = TransportRequest::new(Method::HEAD, url, self.headers_or_profile(headers));

        match transport.send(&request) {
            Ok(response) => Ok(response.close()),
            Err(e) if e.is_method_not_allowed() => {
                debug!("HEAD not allowed, retrying as GET");
                request.method = Method::GET;
                Ok(transport.send(&request)?.close())
            }
            Err(e) => Err(e),
        }
    }

    /// Final URL of `url` after redirects.
    pub fn location(&self, url: &str, headers: Option<&HeaderMap>) -> Result<String> {
        Ok(self.head_response(url, headers)?.url)
    }

    /// Final URL and response headers of `url`.
    pub fn location_and_header(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
    ) -> Result<(String, HeaderMap)> {
        let meta = self.head_response(url, headers)?;
        Ok((meta.url, meta.headers))
    }

    // ─── Content ────────────────────────────────────────────────────────────

    /// Run the full pipeline: request, decompress, detect charset, decode.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub fn retrieve(&self, request: RetrievalRequest) -> Result<Retrieved> {
        let RetrievalRequest {
            url,
            headers,
            body,
            charset,
        } = request;
        debug!("get_content> URL: {url}");

        let method = if body.is_some() {
            Method::POST
        } else {
            Method::GET
        };
        let mut outbound = TransportRequest::new(method, url.as_str(), self.select_headers(headers));
        outbound.body = body;

        let (meta, raw) = self.transport().send(&outbound)?.read_body()?;

        let data = match content_encoding(&meta).as_deref() {
            Some("gzip") => gunzip(&raw)?,
            Some("deflate") => inflate_raw(&raw)?,
            _ => raw,
        };

        let label = match charset {
            Some(CharsetOverride::Ignore) => return Ok(Retrieved::Bytes(data)),
            Some(CharsetOverride::Label(label)) => label,
            None => {
                let content_type = meta
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok());
                charset::resolve(content_type, &data)
            }
        };
        debug!("get_content> Charset: {label}");

        let decoded = charset::decode(&data, &label);
        if decoded.suspicious() {
            warn!(charset = %label, "wrong charset for {url}");
        }
        Ok(Retrieved::Text(decoded))
    }

    /// Body of `url` as text, using the full header profile.
    pub fn get_content(&self, url: &str) -> Result<String> {
        Ok(self.retrieve(RetrievalRequest::new(url))?.into_string())
    }

    /// Decompressed body of `url`, not decoded.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self
            .retrieve(RetrievalRequest::new(url).ignore_charset())?
            .into_bytes())
    }

    /// POST `body` to `url` and return the response text.
    pub fn post_content(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<String> {
        Ok(self
            .retrieve(RetrievalRequest::new(url).body(body))?
            .into_string())
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("headers", &self.headers)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// `Content-Encoding` from the typed headers, else from the raw header block.
fn content_encoding(meta: &ResponseMeta) -> Option<String> {
    if let Some(value) = meta.headers.get(CONTENT_ENCODING) {
        return value.to_str().ok().map(|v| v.trim().to_ascii_lowercase());
    }
    meta.raw_headers
        .as_deref()
        .and_then(|raw| match1(raw, &[&CONTENT_ENCODING_LINE]))
        .map(str::to_ascii_lowercase)
}
