//! `textfetch` - fetch a URL as text
//!
//! # Features
//!
//! - **Browser headers**: Firefox/Chrome/Safari profiles, with and without
//!   compression negotiation
//! - **Compression**: gzip and raw deflate bodies decoded in-process
//! - **Charset detection**: `Content-Type`, in-document `charset=`, UTF-8
//!   fallback; decoding never fails
//! - **Redirect resolution**: HEAD with automatic GET fallback on 405
//! - **Pluggable transport**: redirect/proxy/cookie/timeout handlers
//!   installed as one swap
//!
//! # Example
//!
//! ```rust,no_run
//! use textfetch::{FetchClient, RetrievalRequest};
//!
//! fn main() -> anyhow::Result<()> {
//!     let client = FetchClient::new()?;
//!     let html = client.get_content("https://example.com")?;
//!     println!("Fetched {} chars", html.chars().count());
//!
//!     let page = client.retrieve(RetrievalRequest::new("https://example.cn").charset("gbk"))?;
//!     println!("{}", page.into_string());
//!     Ok(())
//! }
//! ```

pub mod charset;
pub mod client;
pub mod config;
pub mod decompress;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod legacy;
pub mod matcher;
pub mod transport;
pub mod unicode;

pub use charset::{CharsetOverride, DecodedText};
pub use client::{FetchClient, HeaderSelection, RetrievalRequest, Retrieved};
pub use config::Config;
pub use decompress::{gunzip, inflate_raw};
pub use error::{FetchError, Result};
pub use handlers::{Handler, HandlerKind, HandlerRegistry, RedirectPolicy};
pub use headers::HeaderProfile;
#[allow(deprecated)]
pub use legacy::{url_info, url_size, urls_size, UrlInfo};
pub use matcher::match1;
pub use transport::{ReqwestTransport, ResponseMeta, Transport, TransportRequest, TransportResponse};
pub use unicode::unicodize;

/// Version of textfetch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
