//! HTTP client trait abstraction.
//!
//! The polling transport only needs GET. Keeping it behind a trait lets
//! tests drive the poll loop with canned responses.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a new response with headers.
    pub fn with_headers(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HttpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request timeout: {0}")]
    Timeout(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP error: {0}")]
    Other(String),
}

/// Trait for HTTP client operations.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_new() {
        let response = Response::new(200, "Hello");
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
        assert_eq!(response.body, Bytes::from("Hello"));
    }

    #[test]
    fn test_response_is_success() {
        assert!(Response::new(200, Bytes::new()).is_success());
        assert!(Response::new(204, Bytes::new()).is_success());
        assert!(!Response::new(300, Bytes::new()).is_success());
        assert!(!Response::new(410, Bytes::new()).is_success());
        assert!(!Response::new(500, Bytes::new()).is_success());
    }

    #[test]
    fn test_response_text() {
        let response = Response::new(200, "[]");
        assert_eq!(response.text().unwrap(), "[]");
    }

    #[test]
    fn test_http_error_display() {
        assert_eq!(
            HttpError::ConnectionFailed("refused".to_string()).to_string(),
            "Connection failed: refused"
        );
        assert_eq!(
            HttpError::Timeout("30s".to_string()).to_string(),
            "Request timeout: 30s"
        );
        assert_eq!(
            HttpError::InvalidUrl("bad url".to_string()).to_string(),
            "Invalid URL: bad url"
        );
        assert_eq!(
            HttpError::Other("unknown".to_string()).to_string(),
            "HTTP error: unknown"
        );
    }
}
