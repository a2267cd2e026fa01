//! Response snapshots returned by the network or the cache

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How a response relates to the requesting origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response, fully readable
    Basic,
    /// Cross-origin response the server allowed us to read
    Cors,
    /// Cross-origin response whose contents cannot be inspected
    Opaque,
    /// Built locally rather than received
    Synthetic,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Basic => "basic",
            Self::Cors => "cors",
            Self::Opaque => "opaque",
            Self::Synthetic => "synthetic",
        };
        write!(f, "{}", name)
    }
}

/// Immutable response snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Full response body
    pub body: Vec<u8>,
    /// Origin relation of the response
    pub kind: ResponseKind,
    /// Whether redirects were followed to produce this response
    pub redirected: bool,
    /// Final URL, if the response came from the network
    pub url: Option<Url>,
}

impl Response {
    /// Create a same-origin response with no headers
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            kind: ResponseKind::Basic,
            redirected: false,
            url: None,
        }
    }

    /// Create a synthesized JSON response
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response.kind = ResponseKind::Synthetic;
        response.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }

    /// Create a plain-text response
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status, body.into());
        response.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    /// Response returned for API calls when no network is available
    pub fn offline() -> Self {
        Self::json(
            StatusCode::SERVICE_UNAVAILABLE,
            &serde_json::json!({ "error": "offline" }),
        )
    }

    /// Set the response kind
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the final URL
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Mark the response as produced by following redirects
    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    /// Add a header; invalid names or values are skipped
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Whether the status is 2xx
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Whether this response may be stored under the request's key
    ///
    /// Opaque responses cannot be verified and redirected ones belong to a
    /// different URL, so only successful, same-origin, direct responses qualify.
    pub fn is_cacheable(&self) -> bool {
        self.is_ok() && self.kind == ResponseKind::Basic && !self.redirected
    }

    /// Content-Type header value, if present and printable
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Headers as printable name/value pairs, in map order
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}
