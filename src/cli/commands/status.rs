//! Status command - configured build and store contents

use super::open_store;
use crate::config::{Config, ConfigManager};
use crate::error::ShellkeepResult;
use crate::fetch::cache_key;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the status command
pub async fn execute(config: &Config) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let store = open_store(config);
    let worker = &config.worker;

    println!("{}", style("Shellkeep Status").bold().cyan());

    ui::section(&ctx, "Build:");
    ui::key_value(&ctx, "namespace", &worker.namespace);
    ui::key_value(&ctx, "origin", &worker.origin);
    ui::key_value(&ctx, "api prefix", &worker.api_prefix);
    ui::key_value(&ctx, "manifest", &format!("{} resources", worker.precache.len()));

    ui::section(&ctx, "Store:");
    ui::key_value(&ctx, "backend", store.backend_name());
    ui::key_value(&ctx, "path", &ConfigManager::store_dir(config).display().to_string());

    let namespaces = store.namespaces().await?;
    if namespaces.is_empty() {
        ui::step_warn_hint(&ctx, "No namespaces", "Run: shellkeep install");
        return Ok(());
    }
    for namespace in &namespaces {
        if *namespace == worker.namespace {
            ui::step_info(&ctx, &format!("{} (current)", namespace));
        } else {
            ui::step_warn_hint(&ctx, namespace, "stale, removed on next activate");
        }
    }

    ui::section(&ctx, "Precache:");
    let stored = store.keys(&worker.namespace).await?;
    let mut complete = true;
    for (resource, url) in worker.precache.iter().zip(worker.manifest_urls()?) {
        if stored.contains(&cache_key(&url)) {
            ui::step_ok(&ctx, resource);
        } else {
            complete = false;
            ui::step_warn(&ctx, &format!("{} not cached", resource));
        }
    }

    println!();
    if complete {
        println!("{}", style("Shell is available offline").green().bold());
    } else {
        println!("{}", style("Shell is incomplete - run: shellkeep install").yellow().bold());
    }
    Ok(())
}
