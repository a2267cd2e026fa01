//! Request classification and strategy dispatch
//!
//! Classification is a pure function of method and URL:
//!
//! | Class | Condition | Route |
//! |-------|-----------|-------|
//! | NonGet | method is not GET | decline |
//! | Api | path starts with the API prefix | network-first |
//! | StaticSameOrigin | same origin as the app | cache-first |
//! | CrossOrigin | anything else | decline |
//!
//! The API check comes before the origin check, so an API path is always
//! network-first regardless of host.

use crate::config::WorkerConfig;
use crate::error::ShellkeepResult;
use crate::fetch::Request;
use http::Method;
use std::fmt;
use url::Origin;

/// Class of an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Dynamic API call, never cached
    Api,
    /// Same-origin static or navigational resource
    StaticSameOrigin,
    /// Request to another origin
    CrossOrigin,
    /// Any method other than GET
    NonGet,
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Api => "api",
            Self::StaticSameOrigin => "static",
            Self::CrossOrigin => "cross-origin",
            Self::NonGet => "non-get",
        };
        write!(f, "{}", name)
    }
}

/// Strategy chosen for a request the worker handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Network, with a synthesized offline response on failure
    NetworkFirst,
    /// Cache, falling back to network and then to the shell document
    CacheFirst,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkFirst => write!(f, "network-first"),
            Self::CacheFirst => write!(f, "cache-first"),
        }
    }
}

/// Classifies requests relative to the application origin
#[derive(Debug, Clone)]
pub struct Router {
    origin: Origin,
    api_prefix: String,
}

impl Router {
    /// Create a router for `origin` treating paths under `api_prefix` as API calls
    pub fn new(origin: Origin, api_prefix: impl Into<String>) -> Self {
        Self {
            origin,
            api_prefix: api_prefix.into(),
        }
    }

    /// Create a router from a worker configuration
    pub fn from_config(config: &WorkerConfig) -> ShellkeepResult<Self> {
        Ok(Self::new(config.origin()?, config.api_prefix.clone()))
    }

    /// Classify a request
    pub fn classify(&self, request: &Request) -> RequestClass {
        if request.method != Method::GET {
            RequestClass::NonGet
        } else if request.url.path().starts_with(&self.api_prefix) {
            RequestClass::Api
        } else if request.url.origin() == self.origin {
            RequestClass::StaticSameOrigin
        } else {
            RequestClass::CrossOrigin
        }
    }

    /// Pick the strategy for a request, or `None` to let it pass through
    pub fn route(&self, request: &Request) -> Option<Route> {
        match self.classify(request) {
            RequestClass::Api => Some(Route::NetworkFirst),
            RequestClass::StaticSameOrigin => Some(Route::CacheFirst),
            RequestClass::CrossOrigin | RequestClass::NonGet => None,
        }
    }
}
