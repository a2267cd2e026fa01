//! Worker lifecycle: install, activate, fetch
//!
//! # States
//!
//! | State | Reached by | Next |
//! |-------|------------|------|
//! | Parsed | construction | Installing |
//! | Installing | `install()` | Installed, Redundant |
//! | Installed | precache complete | Activating |
//! | Activating | `activate()` | Activated, Installed (on error) |
//! | Activated | cleanup and claim complete | - |
//! | Redundant | failed install | - |

use crate::config::WorkerConfig;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::fetch::{Network, Request, Response};
use crate::journal::Journal;
use crate::lifecycle::clients::Clients;
use crate::lifecycle::completion::Completion;
use crate::router::{Route, Router};
use crate::store::CacheStore;
use crate::strategy::{network_first, CacheFirst, Handled};
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Lifecycle state of a worker build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, nothing run yet
    Parsed,
    /// Precache in progress
    Installing,
    /// Precache complete, waiting to activate
    Installed,
    /// Removing stale namespaces and claiming clients
    Activating,
    /// Serving requests
    Activated,
    /// Install failed; never serves
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

struct Inner {
    config: WorkerConfig,
    router: Router,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    journal: Journal,
    state: Mutex<WorkerState>,
}

/// One worker build: a namespace, a precache manifest, and the fetch handler
///
/// Cloning is cheap and shares state, so a clone can be moved into the
/// background task behind a [`Completion`].
#[derive(Clone)]
pub struct ServiceWorker {
    inner: Arc<Inner>,
}

impl ServiceWorker {
    /// Create a worker for `config`; fails if the configuration is invalid
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        clients: Arc<Clients>,
    ) -> ShellkeepResult<Self> {
        Self::with_journal(config, store, network, clients, Journal::disabled())
    }

    /// Create a worker that records lifecycle events in `journal`
    pub fn with_journal(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        clients: Arc<Clients>,
        journal: Journal,
    ) -> ShellkeepResult<Self> {
        config.validate()?;
        let router = Router::from_config(&config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                router,
                store,
                network,
                clients,
                journal,
                state: Mutex::new(WorkerState::Parsed),
            }),
        })
    }

    /// Namespace owned by this build
    pub fn namespace(&self) -> &str {
        &self.inner.config.namespace
    }

    /// Build configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    /// Request router
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        *self.lock_state()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WorkerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move from `from` to `to`, or report why the step is not allowed
    fn transition(
        &self,
        action: &'static str,
        from: WorkerState,
        to: WorkerState,
    ) -> ShellkeepResult<()> {
        let mut state = self.lock_state();
        if *state != from {
            return Err(ShellkeepError::InvalidState {
                action,
                state: state.to_string(),
            });
        }
        *state = to;
        Ok(())
    }

    fn set_state(&self, to: WorkerState) {
        *self.lock_state() = to;
    }

    /// Populate the namespace with every manifest resource
    ///
    /// All-or-nothing: every resource is fetched before anything is written,
    /// and any transport failure or non-2xx status fails the whole install.
    /// A failed worker becomes redundant and the store is left as it was.
    pub fn install(&self) -> Completion {
        if let Err(e) = self.transition("install", WorkerState::Parsed, WorkerState::Installing) {
            return Completion::failed(e);
        }

        let worker = self.clone();
        Completion::spawn(async move {
            let namespace = worker.namespace().to_string();
            match worker.precache().await {
                Ok(count) => {
                    worker.set_state(WorkerState::Installed);
                    info!("Installed {} ({} resources)", namespace, count);
                    worker
                        .inner
                        .journal
                        .record(
                            "install.succeeded",
                            &serde_json::json!({ "namespace": namespace, "resources": count }),
                        )
                        .await;
                    Ok(())
                }
                Err(e) => {
                    worker.set_state(WorkerState::Redundant);
                    warn!("Install of {} failed: {}", namespace, e);
                    worker
                        .inner
                        .journal
                        .record(
                            "install.failed",
                            &serde_json::json!({ "namespace": namespace, "error": e.to_string() }),
                        )
                        .await;
                    Err(e)
                }
            }
        })
    }

    async fn precache(&self) -> ShellkeepResult<usize> {
        let inner = &self.inner;
        let namespace = inner.config.namespace.as_str();
        let urls = inner.config.manifest_urls()?;
        info!("Installing {} ({} resources)", namespace, urls.len());

        let fetches = inner.config.precache.iter().zip(urls).map(|(resource, url)| async move {
            let request = Request::get(url);
            let response = inner.network.fetch(&request).await.map_err(|e| {
                ShellkeepError::InstallFailed {
                    resource: resource.clone(),
                    reason: e.to_string(),
                }
            })?;
            if !response.is_ok() {
                return Err(ShellkeepError::PrecacheStatus {
                    resource: resource.clone(),
                    status: response.status.as_u16(),
                });
            }
            Ok::<_, ShellkeepError>((request.cache_key(), response))
        });
        let fetched = join_all(fetches)
            .await
            .into_iter()
            .collect::<ShellkeepResult<Vec<_>>>()?;

        let existed = inner.store.has(namespace).await?;
        if let Err(e) = self.write_entries(&fetched).await {
            if !existed {
                if let Err(cleanup) = inner.store.delete(namespace).await {
                    warn!("Failed to roll back namespace {}: {}", namespace, cleanup);
                }
            }
            return Err(e);
        }

        Ok(fetched.len())
    }

    async fn write_entries(&self, entries: &[(String, Response)]) -> ShellkeepResult<()> {
        let namespace = self.namespace();
        self.inner.store.open(namespace).await?;
        for (key, response) in entries {
            self.inner.store.put(namespace, key, response).await?;
            debug!("Precached {}", key);
        }
        Ok(())
    }

    /// Pick up a build whose namespace an earlier run already populated
    ///
    /// Moves a fresh worker to Installed when the store holds every manifest
    /// entry, so it can be activated without fetching again. Returns whether
    /// the namespace was complete.
    pub async fn restore(&self) -> ShellkeepResult<bool> {
        let stored = self.inner.store.keys(self.namespace()).await?;
        let complete = self
            .inner
            .config
            .manifest_urls()?
            .iter()
            .all(|url| stored.contains(&crate::fetch::cache_key(url)));
        if !complete {
            debug!("Namespace {} is incomplete, not restoring", self.namespace());
            return Ok(false);
        }

        self.transition("restore", WorkerState::Parsed, WorkerState::Installed)?;
        debug!("Restored {} from store", self.namespace());
        Ok(true)
    }

    /// Remove every other namespace and take control of open clients
    ///
    /// Both steps run concurrently; the returned token settles when both have.
    pub fn activate(&self) -> Completion {
        if let Err(e) = self.transition("activate", WorkerState::Installed, WorkerState::Activating)
        {
            return Completion::failed(e);
        }

        let cleanup = {
            let worker = self.clone();
            Completion::spawn(async move { worker.delete_stale_namespaces().await })
        };
        let claim = {
            let worker = self.clone();
            Completion::spawn(async move {
                worker.inner.clients.claim(worker.namespace()).await;
                Ok(())
            })
        };
        let both = Completion::all([cleanup, claim]);

        let worker = self.clone();
        Completion::spawn(async move {
            match both.wait().await {
                Ok(()) => {
                    worker.set_state(WorkerState::Activated);
                    info!("Activated {}", worker.namespace());
                    worker
                        .inner
                        .journal
                        .record(
                            "activate.completed",
                            &serde_json::json!({ "namespace": worker.namespace() }),
                        )
                        .await;
                    Ok(())
                }
                Err(e) => {
                    worker.set_state(WorkerState::Installed);
                    warn!("Activation of {} failed: {}", worker.namespace(), e);
                    Err(e)
                }
            }
        })
    }

    async fn delete_stale_namespaces(&self) -> ShellkeepResult<()> {
        let inner = &self.inner;
        let current = inner.config.namespace.as_str();

        for namespace in inner.store.namespaces().await? {
            if namespace == current {
                continue;
            }
            if inner.store.delete(&namespace).await? {
                info!("Deleted stale namespace {}", namespace);
                inner
                    .journal
                    .record(
                        "namespace.deleted",
                        &serde_json::json!({ "namespace": namespace, "current": current }),
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Handle an intercepted request
    ///
    /// `Ok(None)` declines: the host should perform the request itself.
    pub async fn handle_fetch(&self, request: &Request) -> ShellkeepResult<Option<Handled>> {
        let state = self.state();
        if state == WorkerState::Redundant {
            return Err(ShellkeepError::InvalidState {
                action: "handle fetch with",
                state: state.to_string(),
            });
        }

        let inner = &self.inner;
        let route = inner.router.route(request);
        debug!(
            "{} {} -> {}",
            request.method,
            request.url,
            route.map_or_else(|| "declined".to_string(), |r| r.to_string())
        );

        match route {
            None => Ok(None),
            Some(Route::NetworkFirst) => network_first(inner.network.as_ref(), request)
                .await
                .map(|response| Some(Handled::immediate(response))),
            Some(Route::CacheFirst) => self.cache_first().handle(request).await.map(Some),
        }
    }

    fn cache_first(&self) -> CacheFirst {
        let inner = &self.inner;
        CacheFirst {
            store: inner.store.clone(),
            network: inner.network.clone(),
            namespace: inner.config.namespace.clone(),
            shell_key: inner
                .config
                .resolve(&inner.config.shell_document)
                .map(|url| crate::fetch::cache_key(&url))
                .unwrap_or_default(),
        }
    }
}

impl fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("namespace", &self.namespace())
            .field("state", &self.state())
            .finish()
    }
}
