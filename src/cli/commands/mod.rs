//! CLI command implementations

pub mod activate;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod install;
pub mod status;

pub use activate::execute as activate;
pub use cache::execute as cache;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use status::execute as status;

use crate::config::{Config, ConfigManager};
use crate::error::ShellkeepResult;
use crate::fetch::Network;
use crate::journal::Journal;
use crate::lifecycle::{Clients, ServiceWorker};
use crate::store::{CacheStore, DiskCacheStore};
use std::sync::Arc;

/// Disk store at the configured location
fn open_store(config: &Config) -> Arc<dyn CacheStore> {
    Arc::new(DiskCacheStore::new(ConfigManager::store_dir(config)))
}

/// Worker for the configured build, journaling when enabled
fn build_worker(
    config: &Config,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
) -> ShellkeepResult<ServiceWorker> {
    ServiceWorker::with_journal(
        config.worker.clone(),
        store,
        network,
        Arc::new(Clients::new()),
        Journal::new(config),
    )
}
