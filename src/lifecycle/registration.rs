//! Registration: which worker build is live for the application

use crate::config::WorkerConfig;
use crate::error::ShellkeepResult;
use crate::fetch::{Network, Request};
use crate::journal::Journal;
use crate::lifecycle::clients::Clients;
use crate::lifecycle::worker::ServiceWorker;
use crate::store::CacheStore;
use crate::strategy::Handled;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Holds the active worker and swaps in new builds
///
/// A new build is installed and activated without waiting for old clients
/// to close. If either step fails, the previous build stays active.
pub struct Registration {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    journal: Journal,
    active: RwLock<Option<ServiceWorker>>,
}

impl Registration {
    /// Create a registration with no active worker
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, journal: Journal) -> Self {
        Self {
            store,
            network,
            clients: Arc::new(Clients::new()),
            journal,
            active: RwLock::new(None),
        }
    }

    /// Install and activate a build for `config`, then make it the active worker
    pub async fn register(&self, config: WorkerConfig) -> ShellkeepResult<ServiceWorker> {
        let worker = ServiceWorker::with_journal(
            config,
            self.store.clone(),
            self.network.clone(),
            self.clients.clone(),
            self.journal.clone(),
        )?;

        worker.install().wait().await?;
        worker.activate().wait().await?;

        let previous = self.active.write().await.replace(worker.clone());
        match previous {
            Some(old) if old.namespace() != worker.namespace() => {
                info!("Replaced {} with {}", old.namespace(), worker.namespace())
            }
            _ => info!("Registered {}", worker.namespace()),
        }
        Ok(worker)
    }

    /// Answer a request through the active worker, or the network if it declines
    pub async fn fetch(&self, request: &Request) -> ShellkeepResult<Handled> {
        let active = self.active.read().await.clone();
        if let Some(worker) = active {
            if let Some(handled) = worker.handle_fetch(request).await? {
                return Ok(handled);
            }
            debug!("Worker declined {} {}", request.method, request.url);
        }
        self.network.fetch(request).await.map(Handled::immediate)
    }

    /// The active worker, if any
    pub async fn active(&self) -> Option<ServiceWorker> {
        self.active.read().await.clone()
    }

    /// Open application instances
    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }
}
