//! Fetch command - route one request through the worker

use super::{build_worker, open_store};
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::fetch::{create_network, Request};
use crate::ui::{self, UiContext};
use http::Method;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> ShellkeepResult<()> {
    let ctx = UiContext::detect();
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ShellkeepError::InvalidMethod(args.method.clone()))?;
    let request = Request::parse(method, &args.target, &config.worker.origin_url()?)?;

    let network = create_network(config, args.offline)?;
    let worker = build_worker(config, open_store(config), network)?;
    let class = worker.router().classify(&request);

    let Some(handled) = worker.handle_fetch(&request).await? else {
        ui::key_value(&ctx, "class", &class.to_string());
        ui::key_value(&ctx, "route", "declined");
        ui::remark(&ctx, "The request goes to the network untouched");
        return Ok(());
    };
    handled.wait_until.wait().await?;

    let response = &handled.response;
    let route = worker
        .router()
        .route(&request)
        .map_or_else(|| "declined".to_string(), |r| r.to_string());

    ui::key_value(&ctx, "class", &class.to_string());
    ui::key_value(&ctx, "route", &route);
    ui::key_value_status(&ctx, "status", &response.status.to_string(), response.is_ok());
    ui::key_value(&ctx, "kind", &response.kind.to_string());
    if let Some(content_type) = response.content_type() {
        ui::key_value(&ctx, "content-type", content_type);
    }
    ui::key_value(&ctx, "bytes", &response.body.len().to_string());

    if args.include_body {
        println!();
        println!("{}", response.body_text());
    }
    Ok(())
}
