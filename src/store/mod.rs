//! Namespaced response cache
//!
//! A store holds any number of namespaces, each an isolated map from
//! normalized request URL to a stored response. Exactly one namespace is
//! current for a worker build; activation removes the rest.
//!
//! # Backends
//!
//! | Backend | Persistence | Use |
//! |---------|-------------|-----|
//! | [`MemoryCacheStore`] | process lifetime | tests, embedding |
//! | [`DiskCacheStore`] | directory tree | CLI |

pub mod disk;
pub mod memory;

pub use disk::DiskCacheStore;
pub use memory::MemoryCacheStore;

use crate::error::ShellkeepResult;
use crate::fetch::Response;
use crate::lifecycle::Completion;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Abstract cache storage interface
///
/// Implementations must tolerate concurrent reads and writes to the same
/// namespace; when two writes race on one key the last one wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a namespace, creating it if absent
    async fn open(&self, namespace: &str) -> ShellkeepResult<()>;

    /// Whether a namespace exists
    async fn has(&self, namespace: &str) -> ShellkeepResult<bool>;

    /// Look up a stored response; missing namespaces behave as empty
    async fn get(&self, namespace: &str, key: &str) -> ShellkeepResult<Option<Response>>;

    /// Store a response, creating the namespace if needed
    async fn put(&self, namespace: &str, key: &str, response: &Response) -> ShellkeepResult<()>;

    /// Keys stored in a namespace, sorted
    async fn keys(&self, namespace: &str) -> ShellkeepResult<Vec<String>>;

    /// All namespaces, in creation order
    async fn namespaces(&self) -> ShellkeepResult<Vec<String>>;

    /// Remove a namespace and every entry in it; returns whether it existed
    async fn delete(&self, namespace: &str) -> ShellkeepResult<bool>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}

/// Store a copy of `response` without making the caller wait
///
/// Caching is an optimization: a failed write is logged and the returned
/// token still settles successfully.
pub fn put_detached(
    store: Arc<dyn CacheStore>,
    namespace: String,
    key: String,
    response: Response,
) -> Completion {
    Completion::spawn(async move {
        match store.put(&namespace, &key, &response).await {
            Ok(()) => debug!("Cached {} in {}", key, namespace),
            Err(e) => warn!("Failed to cache {} in {}: {}", key, namespace, e),
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShellkeepError;
    use http::StatusCode;

    /// Store whose writes always fail
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn open(&self, _namespace: &str) -> ShellkeepResult<()> {
            Err(ShellkeepError::Store("read-only".to_string()))
        }

        async fn has(&self, _namespace: &str) -> ShellkeepResult<bool> {
            Ok(false)
        }

        async fn get(&self, _namespace: &str, _key: &str) -> ShellkeepResult<Option<Response>> {
            Ok(None)
        }

        async fn put(
            &self,
            _namespace: &str,
            _key: &str,
            _response: &Response,
        ) -> ShellkeepResult<()> {
            Err(ShellkeepError::Store("read-only".to_string()))
        }

        async fn keys(&self, _namespace: &str) -> ShellkeepResult<Vec<String>> {
            Ok(vec![])
        }

        async fn namespaces(&self) -> ShellkeepResult<Vec<String>> {
            Ok(vec![])
        }

        async fn delete(&self, _namespace: &str) -> ShellkeepResult<bool> {
            Ok(false)
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn put_detached_swallows_write_failures() {
        let token = put_detached(
            Arc::new(BrokenStore),
            "v1".to_string(),
            "https://calc.example/".to_string(),
            Response::new(StatusCode::OK, "x"),
        );
        token.wait().await.unwrap();
    }

    #[tokio::test]
    async fn put_detached_writes_through() {
        let store = Arc::new(MemoryCacheStore::new());
        put_detached(
            store.clone(),
            "v1".to_string(),
            "https://calc.example/".to_string(),
            Response::new(StatusCode::OK, "x"),
        )
        .wait()
        .await
        .unwrap();

        assert!(store
            .get("v1", "https://calc.example/")
            .await
            .unwrap()
            .is_some());
    }
}
