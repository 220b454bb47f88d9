use crate::context::Context;
use colored::Colorize;
use netdeck_core::{TemplateRenderer, scaffold_service_templates};
use std::path::PathBuf;

pub fn list(ctx: &Context) -> anyhow::Result<()> {
    let renderer = ctx.renderer()?;
    let names = renderer.template_names();
    if names.is_empty() {
        println!("{}", "No templates".dimmed());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn scaffold(ctx: &Context, name: &str, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = dir.unwrap_or_else(|| ctx.settings.template_dir.clone());
    let paths = scaffold_service_templates(&dir, name)?;
    println!("{}", "✓ Created templates".green());
    println!("  • {}", paths.template.display().to_string().cyan());
    println!("  • {}", paths.reverse_template.display().to_string().cyan());
    Ok(())
}
