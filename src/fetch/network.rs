//! Network fetch primitive
//!
//! Provides a trait for issuing requests that can be implemented by a real
//! HTTP transport, an always-offline stand-in, or a scripted in-memory table.

use crate::config::schema::DEFAULT_MAX_BODY_BYTES;
use crate::config::Config;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::fetch::request::{cache_key, Request};
use crate::fetch::response::{Response, ResponseKind};
use async_trait::async_trait;
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use ureq::ResponseExt;
use url::{Origin, Url};

/// Abstract network interface
///
/// `Ok` carries any response the server produced, including error statuses;
/// `Err` means the request never completed (no connectivity, DNS, reset).
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue a request and wait for the full response
    async fn fetch(&self, request: &Request) -> ShellkeepResult<Response>;

    /// Human-readable transport name for display
    fn name(&self) -> &'static str;
}

/// Create the network transport described by `config`
///
/// `offline` swaps in [`OfflineNetwork`]; a configured timeout wraps the
/// transport in [`TimeoutNetwork`].
pub fn create_network(config: &Config, offline: bool) -> ShellkeepResult<Arc<dyn Network>> {
    let network: Arc<dyn Network> = if offline {
        Arc::new(OfflineNetwork)
    } else {
        Arc::new(
            HttpNetwork::new(config.worker.origin()?, config.network.user_agent.clone())
                .with_body_limit(config.network.max_body_bytes),
        )
    };

    Ok(match config.network.timeout_secs {
        Some(secs) => Arc::new(TimeoutNetwork::new(network, Duration::from_secs(secs))),
        None => network,
    })
}

/// HTTP transport backed by `ureq`
///
/// `ureq` is blocking, so every request runs on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpNetwork {
    agent: ureq::Agent,
    origin: Origin,
    user_agent: String,
    body_limit: u64,
}

impl HttpNetwork {
    /// Create a transport that classifies responses relative to `origin`
    pub fn new(origin: Origin, user_agent: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            origin,
            user_agent: user_agent.into(),
            body_limit: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Refuse response bodies larger than `limit` bytes
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    fn perform(&self, request: &Request) -> ShellkeepResult<Response> {
        let url = request.url.as_str();
        let result = match request.method {
            Method::GET => self.with_headers(self.agent.get(url), request).call(),
            Method::HEAD => self.with_headers(self.agent.head(url), request).call(),
            Method::DELETE => self.with_headers(self.agent.delete(url), request).call(),
            Method::POST => self
                .with_headers(self.agent.post(url), request)
                .send(&request.body[..]),
            Method::PUT => self
                .with_headers(self.agent.put(url), request)
                .send(&request.body[..]),
            Method::PATCH => self
                .with_headers(self.agent.patch(url), request)
                .send(&request.body[..]),
            ref other => {
                return Err(ShellkeepError::Network(format!(
                    "unsupported method {other}"
                )))
            }
        };

        let mut response = result.map_err(|e| ShellkeepError::Network(e.to_string()))?;

        let final_url = Url::parse(&response.get_uri().to_string()).ok();
        let redirected = final_url
            .as_ref()
            .is_some_and(|u| cache_key(u) != request.cache_key());
        let kind = match &final_url {
            Some(u) if u.origin() == self.origin => ResponseKind::Basic,
            _ => ResponseKind::Cors,
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(_) => ShellkeepError::ResponseTooLarge {
                    url: url.to_string(),
                    limit: self.body_limit,
                },
                other => ShellkeepError::Network(format!("reading body of {url}: {other}")),
            })?;

        debug!("{} {} -> {}", request.method, url, status);
        Ok(Response {
            status,
            headers,
            body,
            kind,
            redirected,
            url: final_url,
        })
    }

    fn with_headers<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        request: &Request,
    ) -> ureq::RequestBuilder<B> {
        builder = builder.header("user-agent", self.user_agent.as_str());
        for (name, value) in &request.headers {
            if let Ok(value) = value.to_str() {
                builder = builder.header(name.as_str(), value);
            }
        }
        builder
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> ShellkeepResult<Response> {
        let transport = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || transport.perform(&request))
            .await
            .map_err(|e| ShellkeepError::Internal(format!("network task failed: {e}")))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Transport with no connectivity: every request fails
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

#[async_trait]
impl Network for OfflineNetwork {
    async fn fetch(&self, request: &Request) -> ShellkeepResult<Response> {
        Err(ShellkeepError::Network(format!(
            "offline: {} {}",
            request.method, request.url
        )))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

/// Wraps a transport with a per-request deadline
pub struct TimeoutNetwork {
    inner: Arc<dyn Network>,
    timeout: Duration,
}

impl TimeoutNetwork {
    /// Bound every request made through `inner` by `timeout`
    pub fn new(inner: Arc<dyn Network>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Network for TimeoutNetwork {
    async fn fetch(&self, request: &Request) -> ShellkeepResult<Response> {
        match tokio::time::timeout(self.timeout, self.inner.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(ShellkeepError::NetworkTimeout {
                url: request.url.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[derive(Debug, Clone)]
enum Script {
    Respond(Response),
    Fail(String),
    TooLarge(u64),
    Hang,
}

/// In-memory transport answering from a table of canned responses
///
/// Unknown URLs answer 404. Taking the table offline makes every request
/// fail, as if the device lost connectivity.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    /// Create an empty, online table
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `url` with `response`
    pub fn route(&self, url: &str, mut response: Response) -> &Self {
        if response.url.is_none() {
            response.url = Url::parse(url).ok();
        }
        self.set(url, Script::Respond(response))
    }

    /// Answer requests for `url` with a transport failure
    pub fn fail(&self, url: &str, reason: &str) -> &Self {
        self.set(url, Script::Fail(reason.to_string()))
    }

    /// Answer requests for `url` as if the body exceeded `limit` bytes
    pub fn too_large(&self, url: &str, limit: u64) -> &Self {
        self.set(url, Script::TooLarge(limit))
    }

    /// Never settle requests for `url`
    pub fn hang(&self, url: &str) -> &Self {
        self.set(url, Script::Hang)
    }

    /// Toggle connectivity for the whole table
    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Number of requests seen for `url`, including failed ones
    pub fn calls(&self, url: &str) -> usize {
        lock(&self.calls).get(&table_key(url)).copied().unwrap_or(0)
    }

    /// Number of requests seen in total
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    fn set(&self, url: &str, script: Script) -> &Self {
        lock(&self.routes).insert(table_key(url), script);
        self
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> ShellkeepResult<Response> {
        let key = request.cache_key();
        *lock(&self.calls).entry(key.clone()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(ShellkeepError::Network(format!("offline: {key}")));
        }

        let script = lock(&self.routes).get(&key).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Fail(reason)) => Err(ShellkeepError::Network(reason)),
            Some(Script::TooLarge(limit)) => Err(ShellkeepError::ResponseTooLarge { url: key, limit }),
            Some(Script::Hang) => std::future::pending().await,
            None => Ok(Response::text(StatusCode::NOT_FOUND, "Not Found").with_url(request.url.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn table_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| cache_key(&u))
        .unwrap_or_else(|_| url.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
