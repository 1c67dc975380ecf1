//! HTTP transport seam
//!
//! The retrieval pipeline only needs "send a request, get status, final URL,
//! headers and a readable body back". [`Transport`] captures that; the
//! production implementation wraps a blocking `reqwest` client built from the
//! registered [`Handler`]s.
//!
//! Contract for implementations:
//! - redirects are followed according to the handlers, and the returned
//!   metadata describes the final response
//! - 4xx/5xx answers come back as [`FetchError::Status`]
//! - the body is not touched until the caller asks for it; dropping the
//!   response releases the connection

use std::fmt;
use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::handlers::{Handler, RedirectPolicy};

/// One outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
            body: None,
        }
    }
}

/// Everything about a response except its body.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// URL after all redirects
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Header block as text, for transports that only expose it that way
    pub raw_headers: Option<String>,
}

impl ResponseMeta {
    pub fn new(url: impl Into<String>, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            url: url.into(),
            status,
            headers,
            raw_headers: None,
        }
    }
}

/// Response with an unread body.
pub struct TransportResponse {
    meta: ResponseMeta,
    body: Box<dyn Read + Send>,
}

impl TransportResponse {
    pub fn new(meta: ResponseMeta, body: impl Read + Send + 'static) -> Self {
        Self {
            meta,
            body: Box::new(body),
        }
    }

    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    /// Read the whole body into memory.
    pub fn read_body(mut self) -> Result<(ResponseMeta, Vec<u8>)> {
        let mut data = Vec::new();
        self.body.read_to_end(&mut data)?;
        Ok((self.meta, data))
    }

    /// Discard the body unread and keep the metadata.
    pub fn close(self) -> ResponseMeta {
        let Self { meta, body } = self;
        drop(body);
        meta
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Something that can carry a [`TransportRequest`] to a server.
pub trait Transport: Send + Sync {
    fn send(&self, request: &TransportRequest) -> Result<TransportResponse>;
}

/// Blocking `reqwest` transport.
///
/// Content decoding is switched off so bodies arrive exactly as sent; the
/// pipeline undoes gzip/deflate itself.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Transport with no extra handlers: follows up to 10 redirects.
    pub fn new() -> Result<Self> {
        Self::with_handlers(&[])
    }

    /// Build a client with `handlers` applied in order.
    pub fn with_handlers(handlers: &[Handler]) -> Result<Self> {
        let mut builder = Client::builder()
            .no_gzip()
            .no_deflate()
            .redirect(redirect_policy(RedirectPolicy::default()));

        for handler in handlers {
            debug!("Applying handler {handler}");
            builder = match handler {
                Handler::Redirect(policy) => builder.redirect(redirect_policy(*policy)),
                Handler::Proxy(url) => builder.proxy(reqwest::Proxy::all(url.as_str())?),
                Handler::Cookies => builder.cookie_store(true),
                Handler::Timeout(duration) => builder.timeout(*duration),
            };
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status();
        let url = response.url().to_string();
        debug!(
            method = %request.method,
            status = %status,
            final_url = %url,
            content_encoding = ?response.headers().get(reqwest::header::CONTENT_ENCODING),
            "Response received"
        );

        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status { status, url });
        }

        let meta = ResponseMeta::new(url, status, response.headers().clone());
        Ok(TransportResponse::new(meta, response))
    }
}

fn redirect_policy(policy: RedirectPolicy) -> reqwest::redirect::Policy {
    match policy {
        RedirectPolicy::Limited(max) => reqwest::redirect::Policy::limited(max),
        RedirectPolicy::None => reqwest::redirect::Policy::none(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use reqwest::header::{CONTENT_ENCODING, LOCATION};
    use url::Url;

    use super::*;
    use crate::client::{FetchClient, RetrievalRequest};

    const PAGE: &str = "<p>caf\u{e9} \u{201c}q\u{201d}</p>";

    fn meta() -> ResponseMeta {
        ResponseMeta::new("http://h/final", StatusCode::OK, HeaderMap::new())
    }

    #[test]
    fn read_body_returns_all_bytes() {
        let response = TransportResponse::new(meta(), Cursor::new(b"hello".to_vec()));
        let (meta, body) = response.read_body().unwrap();
        assert_eq!(meta.url, "http://h/final");
        assert_eq!(body, b"hello");
    }

    #[test]
    fn close_keeps_metadata() {
        let response = TransportResponse::new(meta(), Cursor::new(b"ignored".to_vec()));
        let meta = response.close();
        assert_eq!(meta.status, StatusCode::OK);
        assert!(meta.raw_headers.is_none());
    }

    #[test]
    fn builds_without_handlers() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn builds_with_every_handler_family() {
        let handlers = [
            Handler::Redirect(RedirectPolicy::None),
            Handler::Proxy(Url::parse("http://127.0.0.1:3128").unwrap()),
            Handler::Cookies,
            Handler::Timeout(Duration::from_secs(5)),
        ];
        assert!(ReqwestTransport::with_handlers(&handlers).is_ok());
    }

    #[test]
    fn invalid_url_is_a_transport_error() {
        let transport = ReqwestTransport::new().unwrap();
        let request = TransportRequest::new(Method::GET, "not a url", HeaderMap::new());
        let err = transport.send(&request).unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    // ─── Local server ────────────────────────────────────────────────────────

    /// Serve HTTP/1.1 on a loopback port, one request per connection.
    ///
    /// Returns the base URL and the `METHOD /path` lines seen so far.
    fn serve<F>(respond: F) -> (String, Arc<Mutex<Vec<String>>>)
    where
        F: Fn(&str, &str) -> Vec<u8> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
                    continue;
                }
                // Drain headers up to the blank line
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) <= 2 {
                        break;
                    }
                }

                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();
                log.lock().unwrap().push(format!("{method} {path}"));

                let _ = stream.write_all(&respond(&method, &path));
            }
        });

        (base, seen)
    }

    fn reply(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
            body.len()
        );
        for (name, value) in headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// `/start` refuses HEAD and redirects GET to `/final`, which serves a
    /// gzip-encoded page.
    fn redirecting_server() -> (String, Arc<Mutex<Vec<String>>>) {
        let body = gzip(PAGE.as_bytes());
        serve(move |method, path| match (method, path) {
            ("HEAD", "/start") => reply("405 Method Not Allowed", &[("Allow", "GET")], b""),
            (_, "/start") => reply("302 Found", &[("Location", "/final")], b""),
            ("HEAD", "/final") => reply("200 OK", &[("Content-Type", "text/html")], b""),
            (_, "/final") => reply(
                "200 OK",
                &[
                    ("Content-Type", "text/html; charset=utf-8"),
                    ("Content-Encoding", "gzip"),
                ],
                &body,
            ),
            _ => reply("404 Not Found", &[], b""),
        })
    }

    #[test]
    fn method_not_allowed_is_a_status_error() {
        let (base, _) = redirecting_server();
        let transport = ReqwestTransport::new().unwrap();
        let request = TransportRequest::new(Method::HEAD, format!("{base}/start"), HeaderMap::new());

        let err = transport.send(&request).unwrap_err();
        assert!(err.is_method_not_allowed());
        match &err {
            FetchError::Status { status, url } => {
                assert_eq!(*status, StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(url, &format!("{base}/start"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn not_found_is_a_status_error() {
        let (base, _) = redirecting_server();
        let transport = ReqwestTransport::new().unwrap();
        let request = TransportRequest::new(Method::GET, format!("{base}/missing"), HeaderMap::new());

        let err = transport.send(&request).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(!err.is_method_not_allowed());
    }

    #[test]
    fn redirects_are_followed_and_body_stays_compressed() {
        let (base, seen) = redirecting_server();
        let transport = ReqwestTransport::new().unwrap();
        let request = TransportRequest::new(Method::GET, format!("{base}/start"), HeaderMap::new());

        let response = transport.send(&request).unwrap();
        assert_eq!(response.meta().url, format!("{base}/final"));
        assert_eq!(response.meta().headers[CONTENT_ENCODING], "gzip");

        let (_, body) = response.read_body().unwrap();
        assert_eq!(body, gzip(PAGE.as_bytes()));
        assert_eq!(*seen.lock().unwrap(), ["GET /start", "GET /final"]);
    }

    #[test]
    fn disabled_redirects_return_the_3xx() {
        let (base, _) = redirecting_server();
        let transport =
            ReqwestTransport::with_handlers(&[Handler::Redirect(RedirectPolicy::None)]).unwrap();
        let request = TransportRequest::new(Method::GET, format!("{base}/start"), HeaderMap::new());

        let meta = transport.send(&request).unwrap().close();
        assert_eq!(meta.status, StatusCode::FOUND);
        assert_eq!(meta.url, format!("{base}/start"));
        assert_eq!(meta.headers[LOCATION], "/final");
    }

    #[test]
    fn client_location_falls_back_to_get_over_the_network() {
        let (base, seen) = redirecting_server();
        let client = FetchClient::new().unwrap();

        let location = client.location(&format!("{base}/start"), None).unwrap();
        assert_eq!(location, format!("{base}/final"));
        assert_eq!(
            *seen.lock().unwrap(),
            ["HEAD /start", "GET /start", "GET /final"]
        );
    }

    #[test]
    fn client_retrieve_decompresses_served_gzip() {
        let (base, _) = redirecting_server();
        let client = FetchClient::new().unwrap();

        let retrieved = client
            .retrieve(RetrievalRequest::new(format!("{base}/start")))
            .unwrap();
        assert_eq!(retrieved.as_text(), Some(PAGE));
    }
}
