//! Cache command - inspect or clear namespaces

use super::open_store;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::ShellkeepResult;
use crate::store::CacheStore;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> ShellkeepResult<()> {
    let store = open_store(config);
    let current = config.worker.namespace.as_str();

    match args.action {
        CacheAction::List { format } => list_namespaces(store.as_ref(), current, format).await,
        CacheAction::Show { namespace } => {
            show_namespace(store.as_ref(), namespace.as_deref().unwrap_or(current)).await
        }
        CacheAction::Clear { yes } => clear_namespaces(store.as_ref(), yes).await,
    }
}

#[derive(Debug, Serialize)]
struct NamespaceSummary {
    name: String,
    entries: usize,
    current: bool,
}

async fn summarize(store: &dyn CacheStore, current: &str) -> ShellkeepResult<Vec<NamespaceSummary>> {
    let mut summaries = Vec::new();
    for name in store.namespaces().await? {
        let entries = store.keys(&name).await?.len();
        summaries.push(NamespaceSummary {
            current: name == current,
            name,
            entries,
        });
    }
    Ok(summaries)
}

async fn list_namespaces(
    store: &dyn CacheStore,
    current: &str,
    format: OutputFormat,
) -> ShellkeepResult<()> {
    let summaries = summarize(store, current).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Plain => {
            for summary in &summaries {
                println!("{}", summary.name);
            }
        }
        OutputFormat::Table if summaries.is_empty() => println!("No cache namespaces found."),
        OutputFormat::Table => print_table(&summaries),
    }
    Ok(())
}

fn print_table(summaries: &[NamespaceSummary]) {
    println!("{:<32} {:<8} {:<8}", "NAMESPACE", "ENTRIES", "CURRENT");
    println!("{}", "-".repeat(50));

    for summary in summaries {
        let marker = if summary.current {
            style("yes").green().to_string()
        } else {
            style("stale").yellow().to_string()
        };
        println!("{:<32} {:<8} {:<8}", summary.name, summary.entries, marker);
    }

    println!();
    println!("Total: {} namespace(s)", summaries.len());
}

async fn show_namespace(store: &dyn CacheStore, namespace: &str) -> ShellkeepResult<()> {
    if !store.has(namespace).await? {
        println!("Namespace {} does not exist.", namespace);
        return Ok(());
    }

    let keys = store.keys(namespace).await?;
    println!("{} ({} entries)", style(namespace).bold(), keys.len());
    for key in &keys {
        match store.get(namespace, key).await? {
            Some(response) => println!(
                "  {:<4} {:<10} {:>8}  {}",
                response.status.as_u16(),
                response.kind,
                response.body.len(),
                key
            ),
            None => println!("  {:<4} {:<10} {:>8}  {}", "-", "missing", "-", key),
        }
    }
    Ok(())
}

async fn clear_namespaces(store: &dyn CacheStore, yes: bool) -> ShellkeepResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let namespaces = store.namespaces().await?;

    if namespaces.is_empty() {
        println!("No cache namespaces to clear.");
        return Ok(());
    }

    let prompt = format!("Delete {} namespace(s)?", namespaces.len());
    if !ui::confirm(&ctx, &prompt)? {
        ui::step_warn_hint(&ctx, "Nothing deleted", "Use --yes to skip confirmation");
        return Ok(());
    }

    for namespace in &namespaces {
        store.delete(namespace).await?;
        ui::step_ok_detail(&ctx, "Deleted", namespace);
    }
    Ok(())
}
