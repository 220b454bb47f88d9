use crate::context::Context;
use crate::utils;
use colored::Colorize;
use netdeck_core::{ServiceDefinition, ServiceInstance};
use netdeck_task::Credentials;

pub struct CreateArgs {
    pub name: String,
    pub template: String,
    pub devices: Vec<String>,
    pub vars: Vec<String>,
    pub reverse_template: Option<String>,
    pub validation_template: Option<String>,
}

impl CreateArgs {
    fn into_definition(self) -> anyhow::Result<ServiceDefinition> {
        let mut definition =
            ServiceDefinition::new(self.name, self.template).with_devices(self.devices);
        definition.variables = utils::parse_vars(&self.vars)?;
        definition.reverse_template = self.reverse_template;
        definition.validation_template = self.validation_template;
        Ok(definition)
    }
}

fn print_row(instance: &ServiceInstance) {
    println!(
        "{:<38} {:<20} {:<12} {:<10} {:<15}",
        instance.id,
        instance.name.cyan(),
        instance.device.name,
        utils::instance_state(instance.state),
        utils::validation_status(instance.validation_status)
    );
}

pub async fn create(
    ctx: &Context,
    args: CreateArgs,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let definition = args.into_definition()?;
    let engine = ctx.engine()?;
    println!(
        "{} {} on {}",
        "Deploying service".blue(),
        definition.name.cyan(),
        definition.devices.join(", ")
    );

    let instances = engine.instances.create(&definition, credentials).await?;
    for instance in &instances {
        print_row(instance);
    }
    println!(
        "{} ({} instances)",
        "✓ Service deployed".green().bold(),
        instances.len()
    );
    Ok(())
}

pub async fn list(ctx: &Context, stack: Option<&str>) -> anyhow::Result<()> {
    let instances = match stack {
        Some(stack_id) => ctx.records().list_instances_for_stack(stack_id).await,
        None => ctx.records().list_instances().await,
    };
    if instances.is_empty() {
        println!("{}", "No service instances".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<38} {:<20} {:<12} {:<10} {:<15}",
            "ID", "SERVICE", "DEVICE", "STATE", "VALIDATION"
        )
        .bold()
    );
    println!("{}", "─".repeat(100).dimmed());
    for instance in &instances {
        print_row(instance);
    }
    Ok(())
}

pub async fn show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let instance = engine.instances.get(id).await?;
    let history = engine.instances.task_history(id).await?;

    println!("{} {}", "Service:".bold(), instance.name.cyan());
    println!("  id:         {}", instance.id);
    println!(
        "  device:     {} ({}, {})",
        instance.device.name, instance.device.host, instance.device.platform
    );
    println!("  template:   {}", instance.template);
    if let Some(reverse) = &instance.reverse_template {
        println!("  reverse:    {}", reverse);
    }
    if let Some(stack_id) = &instance.stack_id {
        println!("  stack:      {}", stack_id);
    }
    println!("  state:      {}", utils::instance_state(instance.state));
    println!(
        "  validation: {}",
        utils::validation_status(instance.validation_status)
    );
    for line in &instance.validation_errors {
        println!("      {} {}", "missing:".yellow(), line);
    }

    println!();
    println!("{}", "Rendered config:".bold());
    for line in instance.config_lines() {
        println!("  {}", line);
    }

    if !history.is_empty() {
        println!();
        println!("{}", "Tasks:".bold());
        for record in history {
            println!(
                "  {} {:<7} {}",
                record.submitted_at.to_rfc3339().dimmed(),
                record.kind,
                record.task_id
            );
        }
    }
    Ok(())
}

pub async fn status(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let instance = engine.instances.check_status(id).await?;
    println!(
        "{} {}",
        instance.id,
        utils::instance_state(instance.state)
    );
    Ok(())
}

pub async fn update(
    ctx: &Context,
    id: &str,
    vars: &[String],
    credentials: &Credentials,
) -> anyhow::Result<()> {
    let variables = utils::parse_vars(vars)?;
    let engine = ctx.engine()?;
    let instance = engine.instances.update(id, variables, credentials).await?;
    println!(
        "{} {} {}",
        "✓ Updated".green(),
        instance.name.cyan(),
        utils::instance_state(instance.state)
    );
    Ok(())
}

pub async fn validate(ctx: &Context, id: &str, credentials: &Credentials) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let report = engine.instances.validate(id, credentials).await?;

    if report.valid {
        println!(
            "{} ({} lines checked)",
            "✓ Configuration present on device".green(),
            report.checked
        );
    } else {
        println!(
            "{} ({} of {} lines missing)",
            "✗ Drift detected".yellow().bold(),
            report.missing.len(),
            report.checked
        );
        for line in &report.missing {
            println!("  {} {}", "missing:".yellow(), line);
        }
    }
    Ok(())
}

pub async fn redeploy(ctx: &Context, id: &str, credentials: &Credentials) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    let instance = engine.instances.redeploy(id, credentials).await?;
    println!(
        "{} {} {}",
        "✓ Redeployed".green(),
        instance.name.cyan(),
        utils::instance_state(instance.state)
    );
    Ok(())
}

pub async fn delete(ctx: &Context, id: &str, credentials: &Credentials) -> anyhow::Result<()> {
    let engine = ctx.engine()?;
    engine.instances.delete(id, credentials).await?;
    println!("{} {}", "✓ Deleted service instance".green(), id);
    Ok(())
}
