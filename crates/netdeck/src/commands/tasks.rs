use crate::context::Context;
use crate::utils;
use colored::Colorize;
use netdeck_inventory::DeviceResolver;
use netdeck_task::{ConnectionParams, Credentials, TaskSnapshot};
use serde_json::Value;

pub struct PushArgs {
    pub device: String,
    pub lines: Vec<String>,
    pub library: Option<String>,
    pub dry_run: bool,
}

pub async fn queue(ctx: &Context) -> anyhow::Result<()> {
    let queue = ctx.netpalm()?.list_task_queue().await?;
    utils::print_json(&queue)
}

pub async fn show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let response = ctx.netpalm()?.get_task(id).await?;
    let snapshot = TaskSnapshot::from_response(&response)?;
    println!("{} {}", snapshot.id, snapshot.status.to_string().cyan());
    for error in &snapshot.errors {
        println!("  {} {}", "error:".red(), error);
    }
    if !snapshot.result.is_null() {
        utils::print_json(&snapshot.result)?;
    }
    Ok(())
}

pub async fn workers(ctx: &Context) -> anyhow::Result<()> {
    let workers = ctx.netpalm()?.list_workers().await?;
    utils::print_json(&workers)
}

async fn connection(
    ctx: &Context,
    device: &str,
    credentials: &Credentials,
) -> anyhow::Result<ConnectionParams> {
    let resolved = ctx.netbox()?.resolve(device).await?;
    Ok(ConnectionParams::build(&resolved, credentials))
}

/// Point a payload at `library` when one was given
fn with_library(mut payload: Value, library: Option<&str>) -> Value {
    if let (Some(library), Some(body)) = (library, payload.as_object_mut()) {
        body.insert("library".to_string(), Value::String(library.to_string()));
    }
    payload
}

pub async fn getconfig(
    ctx: &Context,
    device: &str,
    command: &str,
    library: Option<String>,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let client = ctx.netpalm()?;
    let connection = connection(ctx, device, credentials).await?;
    let library = library.unwrap_or_else(|| ctx.settings.netpalm.library.clone());

    let payload = with_library(client.getconfig_payload(&connection, command), Some(&library));
    let response = client.getconfig(&library, &payload).await?;
    utils::print_json(&response)
}

pub async fn setconfig(
    ctx: &Context,
    push: PushArgs,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let client = ctx.netpalm()?;
    let connection = connection(ctx, &push.device, credentials).await?;
    let payload = with_library(
        client.setconfig_payload(&connection, &push.lines),
        push.library.as_deref(),
    );

    let response = if push.dry_run {
        println!("{} {}", "Dry run on".blue(), push.device.cyan());
        client.setconfig_dry_run(&payload).await?
    } else {
        let library = push
            .library
            .unwrap_or_else(|| ctx.settings.netpalm.library.clone());
        println!("{} {}", "Pushing to".blue(), push.device.cyan());
        client.setconfig(&library, &payload).await?
    };
    utils::print_json(&response)
}
