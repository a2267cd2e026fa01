//! Install command - precache the configured build

use super::{activate::activate_worker, build_worker, open_store};
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::fetch::create_network;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let store = open_store(config);
    let network = create_network(config, args.offline)?;
    let worker = build_worker(config, store.clone(), network)?;
    let namespace = worker.namespace().to_string();

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Installing {} ({} resources)",
        namespace,
        config.worker.precache.len()
    ));

    if let Err(e) = worker.install().wait().await {
        spinner.stop_error(&format!("Install of {} failed", namespace));
        if let Some(resource) = failed_resource(&e) {
            ui::step_error_detail(&ctx, resource, &e.to_string());
        }
        return Err(e);
    }
    spinner.stop(&format!("Installed {}", namespace));

    for resource in &config.worker.precache {
        ui::step_ok(&ctx, resource);
    }

    if args.no_activate {
        ui::remark(&ctx, "Not activated; run: shellkeep activate");
        return Ok(());
    }

    activate_worker(&ctx, &worker, store.as_ref()).await
}

/// Manifest entry that aborted an install, if the error names one
fn failed_resource(err: &ShellkeepError) -> Option<&str> {
    match err {
        ShellkeepError::InstallFailed { resource, .. }
        | ShellkeepError::PrecacheStatus { resource, .. } => Some(resource),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_resource_names_manifest_entry() {
        let err = ShellkeepError::PrecacheStatus {
            resource: "/static/icons/icon.svg".to_string(),
            status: 404,
        };
        assert_eq!(failed_resource(&err), Some("/static/icons/icon.svg"));
        assert_eq!(failed_resource(&ShellkeepError::Internal("x".to_string())), None);
    }
}
