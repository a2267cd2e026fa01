//! In-memory cache store

use super::CacheStore;
use crate::error::ShellkeepResult;
use crate::fetch::Response;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Cache store kept entirely in memory
///
/// Namespaces are kept in creation order; entries within one are sorted by key.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    namespaces: RwLock<Vec<(String, BTreeMap<String, Response>)>>,
}

impl MemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all namespaces
    pub async fn entry_count(&self) -> usize {
        self.namespaces
            .read()
            .await
            .iter()
            .map(|(_, entries)| entries.len())
            .sum()
    }
}

fn position(namespaces: &[(String, BTreeMap<String, Response>)], name: &str) -> Option<usize> {
    namespaces.iter().position(|(n, _)| n == name)
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, namespace: &str) -> ShellkeepResult<()> {
        let mut namespaces = self.namespaces.write().await;
        if position(&namespaces, namespace).is_none() {
            namespaces.push((namespace.to_string(), BTreeMap::new()));
        }
        Ok(())
    }

    async fn has(&self, namespace: &str) -> ShellkeepResult<bool> {
        Ok(position(&self.namespaces.read().await, namespace).is_some())
    }

    async fn get(&self, namespace: &str, key: &str) -> ShellkeepResult<Option<Response>> {
        let namespaces = self.namespaces.read().await;
        Ok(position(&namespaces, namespace).and_then(|i| namespaces[i].1.get(key).cloned()))
    }

    async fn put(&self, namespace: &str, key: &str, response: &Response) -> ShellkeepResult<()> {
        let mut namespaces = self.namespaces.write().await;
        let index = match position(&namespaces, namespace) {
            Some(i) => i,
            None => {
                namespaces.push((namespace.to_string(), BTreeMap::new()));
                namespaces.len() - 1
            }
        };
        namespaces[index]
            .1
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn keys(&self, namespace: &str) -> ShellkeepResult<Vec<String>> {
        let namespaces = self.namespaces.read().await;
        Ok(position(&namespaces, namespace)
            .map(|i| namespaces[i].1.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn namespaces(&self) -> ShellkeepResult<Vec<String>> {
        Ok(self
            .namespaces
            .read()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete(&self, namespace: &str) -> ShellkeepResult<bool> {
        let mut namespaces = self.namespaces.write().await;
        match position(&namespaces, namespace) {
            Some(i) => {
                namespaces.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
