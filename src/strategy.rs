//! Request-handling strategies
//!
//! - **Network-first** (API calls): always live, never stored; a transport
//!   failure becomes a synthesized `503 {"error":"offline"}`. Other failures
//!   (an oversized body) go back to the host unchanged.
//! - **Cache-first** (same-origin assets): a stored entry is served as-is
//!   until the namespace is replaced on upgrade. Misses go to the network and
//!   successful responses are stored in the background. With no network, the
//!   shell document stands in for the missing resource.

use crate::error::ShellkeepResult;
use crate::fetch::{Network, Request, Response};
use crate::lifecycle::Completion;
use crate::store::{put_detached, CacheStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Response chosen for an intercepted request
#[derive(Debug)]
pub struct Handled {
    /// Response to hand back to the application
    pub response: Response,
    /// Background work started while answering (a cache write)
    pub wait_until: Completion,
}

impl Handled {
    /// A response with no background work attached
    pub fn immediate(response: Response) -> Self {
        Self {
            response,
            wait_until: Completion::ready(),
        }
    }
}

/// Issue the request; on transport failure answer with [`Response::offline`]
pub async fn network_first(network: &dyn Network, request: &Request) -> ShellkeepResult<Response> {
    match network.fetch(request).await {
        Ok(response) => Ok(response),
        Err(e) if e.is_offline() => {
            info!("Network unavailable for {}: {}", request.url, e);
            Ok(Response::offline())
        }
        Err(e) => Err(e),
    }
}

/// Everything the cache-first strategy reads and writes
#[derive(Clone)]
pub struct CacheFirst {
    /// Backing store
    pub store: Arc<dyn CacheStore>,
    /// Network transport
    pub network: Arc<dyn Network>,
    /// Current namespace
    pub namespace: String,
    /// Cache key of the shell document served when offline
    pub shell_key: String,
}

impl CacheFirst {
    /// Serve from the current namespace, else the network, else the shell document
    ///
    /// Fails when the network is unreachable and no shell document is
    /// stored, or when the network answered with something unusable (an
    /// oversized body); the host then applies its own handling.
    pub async fn handle(&self, request: &Request) -> ShellkeepResult<Handled> {
        let key = request.cache_key();

        match self.store.get(&self.namespace, &key).await {
            Ok(Some(cached)) => {
                debug!("Cache hit: {}", key);
                return Ok(Handled::immediate(cached));
            }
            Ok(None) => debug!("Cache miss: {}", key),
            Err(e) => warn!("Cache lookup failed for {}, treating as miss: {}", key, e),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let wait_until = if response.is_cacheable() {
                    put_detached(
                        self.store.clone(),
                        self.namespace.clone(),
                        key,
                        response.clone(),
                    )
                } else {
                    debug!(
                        "Not caching {} (status {}, {}, redirected: {})",
                        key, response.status, response.kind, response.redirected
                    );
                    Completion::ready()
                };
                Ok(Handled {
                    response,
                    wait_until,
                })
            }
            Err(e) if !e.is_offline() => Err(e),
            Err(network_error) => match self.store.get(&self.namespace, &self.shell_key).await {
                Ok(Some(shell)) => {
                    info!("Offline: serving shell document for {}", key);
                    Ok(Handled::immediate(shell))
                }
                Ok(None) => Err(network_error),
                Err(e) => {
                    warn!("Shell document lookup failed: {}", e);
                    Err(network_error)
                }
            },
        }
    }
}
