//! Error taxonomy for the retrieval pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// Retrieval errors
///
/// A `405 Method Not Allowed` answer to HEAD never surfaces here; the
/// pipeline retries it as GET. Charset mismatches are logged, not raised.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP Error {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("malformed {encoding} payload: {source}")]
    Decompression {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// True when the server refused the request method.
    pub fn is_method_not_allowed(&self) -> bool {
        self.status() == Some(StatusCode::METHOD_NOT_ALLOWED)
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reports_405() {
        let err = FetchError::Status {
            status: StatusCode::METHOD_NOT_ALLOWED,
            url: "http://h/".to_string(),
        };
        assert!(err.is_method_not_allowed());
        assert_eq!(err.to_string(), "HTTP Error 405 Method Not Allowed for http://h/");
    }

    #[test]
    fn other_errors_have_no_status() {
        let err = FetchError::InvalidHeader("bad".to_string());
        assert!(err.status().is_none());
        assert!(!err.is_method_not_allowed());
    }
}
