//! Activate command - make an installed build current

use super::{build_worker, open_store};
use crate::config::Config;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::fetch::OfflineNetwork;
use crate::lifecycle::ServiceWorker;
use crate::store::CacheStore;
use crate::ui::{self, UiContext};
use std::sync::Arc;

/// Execute the activate command
pub async fn execute(config: &Config) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let store = open_store(config);
    let worker = build_worker(config, store.clone(), Arc::new(OfflineNetwork))?;

    if !worker.restore().await? {
        return Err(ShellkeepError::NotInstalled(worker.namespace().to_string()));
    }

    activate_worker(&ctx, &worker, store.as_ref()).await
}

/// Activate `worker` and report which namespaces were removed
pub(super) async fn activate_worker(
    ctx: &UiContext,
    worker: &ServiceWorker,
    store: &dyn CacheStore,
) -> ShellkeepResult<()> {
    let before = store.namespaces().await?;
    worker.activate().wait().await?;

    for namespace in before.iter().filter(|ns| *ns != worker.namespace()) {
        ui::step_info(ctx, &format!("Deleted stale namespace {}", namespace));
    }
    ui::step_ok_detail(ctx, "Activated", worker.namespace());
    Ok(())
}
