use crate::context::Context;
use crate::utils;
use colored::Colorize;
use netdeck_core::{StackSpec, parse_stack_file};
use netdeck_task::Credentials;
use std::path::Path;

pub async fn create(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let specs = parse_stack_file(file)?;
    let engine = ctx.engine()?;

    for spec in specs {
        let stack = engine.stacks.create(spec).await?;
        println!(
            "{} {} ({} services)",
            "✓ Created stack".green(),
            stack.name.cyan(),
            stack.services.len()
        );
        println!("  id: {}", stack.id);
    }
    Ok(())
}

pub async fn list(ctx: &Context) -> anyhow::Result<()> {
    let stacks = ctx.records().list_stacks().await;
    if stacks.is_empty() {
        println!("{}", "No stacks".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<38} {:<24} {:<10} {:<9} {:<15}",
            "ID", "NAME", "STATE", "SERVICES", "VALIDATION"
        )
        .bold()
    );
    println!("{}", "─".repeat(100).dimmed());
    for stack in stacks {
        println!(
            "{:<38} {:<24} {:<10} {:<9} {:<15}",
            stack.id,
            stack.name.cyan(),
            utils::stack_state(stack.state),
            stack.services.len(),
            utils::validation_status(stack.validation_status)
        );
    }
    Ok(())
}

pub async fn show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let stack = ctx
        .records()
        .get_stack(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("stack '{}' not found", id))?;

    println!("{} {}", "Stack:".bold(), stack.name.cyan());
    println!("  id:         {}", stack.id);
    if let Some(description) = &stack.description {
        println!("  about:      {}", description);
    }
    println!("  state:      {}", utils::stack_state(stack.state));
    println!(
        "  validation: {}",
        utils::validation_status(stack.validation_status)
    );
    if let Some(at) = stack.last_validated_at {
        println!("  validated:  {}", at.to_rfc3339());
    }

    println!();
    println!("{}", "Services (deploy order):".bold());
    for service in stack.ordered_services() {
        let deps = if service.depends_on.is_empty() {
            String::new()
        } else {
            format!(" after {}", service.depends_on.join(", "))
        };
        println!(
            "  {:>3}  {} [{}] on {}{}",
            service.order,
            service.name.cyan(),
            service.template,
            service.devices.join(", "),
            deps.dimmed()
        );
    }

    if !stack.deployed_services.is_empty() {
        println!();
        println!("{}", "Deployed instances:".bold());
        for instance_id in &stack.deployed_services {
            println!("  • {}", instance_id);
        }
    }
    for failure in &stack.deployment_errors {
        println!();
        println!(
            "{} {}: {}",
            "✗".red().bold(),
            failure.service.yellow(),
            failure.error
        );
    }
    Ok(())
}

pub async fn update(ctx: &Context, id: &str, file: &Path) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let current = engine.stacks.get(id).await?;
    let spec = pick_spec(parse_stack_file(file)?, &current.name)?;

    let stack = engine.stacks.update(id, spec).await?;
    println!(
        "{} {} ({} services)",
        "✓ Updated stack".green(),
        stack.name.cyan(),
        stack.services.len()
    );
    Ok(())
}

/// The only spec in a bundle, or the one named like the stack
fn pick_spec(mut specs: Vec<StackSpec>, name: &str) -> anyhow::Result<StackSpec> {
    if specs.len() == 1 {
        return Ok(specs.remove(0));
    }
    let index = specs
        .iter()
        .position(|s| s.name == name)
        .ok_or_else(|| anyhow::anyhow!("bundle has no stack named '{}'", name))?;
    Ok(specs.swap_remove(index))
}

pub async fn delete(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    engine.stacks.delete(id).await?;
    println!("{} {}", "✓ Deleted stack".green(), id);
    Ok(())
}

pub async fn reset(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let stack = engine.stacks.reset(id).await?;
    println!(
        "{} {} {}",
        "✓ Reset stack".green(),
        stack.name.cyan(),
        utils::stack_state(stack.state)
    );
    Ok(())
}

pub async fn deploy(ctx: &Context, id: &str, credentials: &Credentials) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let stack = engine.stacks.get(id).await?;
    println!("{} {}", "Deploying stack".blue(), stack.name.cyan());

    let outcome = engine.stacks.deploy(id, credentials).await?;
    for instance_id in &outcome.deployed_ids {
        println!("  {} {}", "✓".green(), instance_id);
    }

    if outcome.is_success() {
        println!(
            "{} ({} instances)",
            "✓ Stack deployed".green().bold(),
            outcome.deployed_ids.len()
        );
        Ok(())
    } else {
        for failure in &outcome.failed {
            eprintln!(
                "{} {}: {}",
                "✗".red().bold(),
                failure.service.yellow(),
                failure.error
            );
        }
        anyhow::bail!("stack deploy failed")
    }
}

pub async fn validate(ctx: &Context, id: &str, credentials: &Credentials) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let result = engine.stacks.validate(id, credentials).await?;

    for check in &result.instances {
        println!(
            "  {:<38} {}",
            check.instance_id,
            utils::validation_status(check.status)
        );
        for line in &check.missing {
            println!("      {} {}", "missing:".yellow(), line);
        }
        if let Some(error) = &check.error {
            println!("      {} {}", "error:".red(), error);
        }
    }
    println!(
        "{} {}",
        "Stack validation:".bold(),
        utils::validation_status(result.status)
    );
    Ok(())
}
