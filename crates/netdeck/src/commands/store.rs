use crate::context::Context;
use crate::utils;
use colored::Colorize;
use netdeck_store::{clear_instances as clear_all, purge_corrupt_instances};

pub async fn purge_corrupt(ctx: &Context) -> anyhow::Result<()> {
    let report = purge_corrupt_instances(ctx.store()).await?;
    for key in &report.removed {
        println!("  {} {}", "removed".yellow(), key);
    }
    println!(
        "{} {} removed, {} valid",
        "✓ Purge complete:".green(),
        report.removed.len(),
        report.valid
    );
    Ok(())
}

pub async fn clear_instances(ctx: &Context, yes: bool) -> anyhow::Result<()> {
    if !yes && !utils::confirm("Delete every service instance record?")? {
        println!("{}", "Cancelled".dimmed());
        return Ok(());
    }
    let removed = clear_all(ctx.store()).await?;
    println!(
        "{} {} service instance records removed",
        "✓".green(),
        removed
    );
    Ok(())
}
