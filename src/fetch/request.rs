//! Intercepted request descriptor

use crate::error::{ShellkeepError, ShellkeepResult};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use url::Url;

/// A request as delivered by the host with a fetch event
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Absolute request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body (empty for GET)
    pub body: Vec<u8>,
}

impl Request {
    /// Create a request with an explicit method
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse `input` as an absolute URL, or as a path relative to `base`
    pub fn parse(method: Method, input: &str, base: &Url) -> ShellkeepResult<Self> {
        let url = Url::parse(input)
            .or_else(|_| base.join(input))
            .map_err(|e| ShellkeepError::invalid_url(input, e))?;
        Ok(Self::new(method, url))
    }

    /// Add a header, replacing any previous value
    pub fn with_header(mut self, name: &str, value: &str) -> ShellkeepResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ShellkeepError::Internal(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ShellkeepError::Internal(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Attach a request body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Normalized key under which a GET response for this request is stored
    ///
    /// The fragment never reaches the server, so it is dropped; the query
    /// string is kept because versioned assets differ only there.
    pub fn cache_key(&self) -> String {
        cache_key(&self.url)
    }
}

/// Normalized cache key for a URL
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://calc.example/").unwrap()
    }

    #[test]
    fn parse_relative_path() {
        let req = Request::parse(Method::GET, "/static/app.js?v=3", &base()).unwrap();
        assert_eq!(req.url.as_str(), "https://calc.example/static/app.js?v=3");
    }

    #[test]
    fn parse_absolute_url_ignores_base() {
        let req = Request::parse(Method::POST, "https://cdn.example/x.js", &base()).unwrap();
        assert_eq!(req.url.host_str(), Some("cdn.example"));
        assert_eq!(req.method, Method::POST);
    }

    #[test]
    fn cache_key_drops_fragment_keeps_query() {
        let req = Request::get(Url::parse("https://calc.example/static/app.js?v=3#top").unwrap());
        assert_eq!(req.cache_key(), "https://calc.example/static/app.js?v=3");

        let other = Request::get(Url::parse("https://calc.example/static/app.js?v=4").unwrap());
        assert_ne!(req.cache_key(), other.cache_key());
    }

    #[test]
    fn with_header_rejects_garbage_name() {
        let req = Request::get(base());
        assert!(req.clone().with_header("bad header", "x").is_err());
        let req = req.with_header("accept", "text/html").unwrap();
        assert_eq!(req.headers["accept"], "text/html");
    }
}
