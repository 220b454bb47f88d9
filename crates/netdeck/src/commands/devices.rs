use crate::context::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, details: bool, manufacturer: Vec<u32>) -> anyhow::Result<()> {
    let client = ctx.netbox()?;
    let mut query = ctx.device_query();
    if !manufacturer.is_empty() {
        query.manufacturer_ids = manufacturer;
    }

    if details {
        let devices = client.get_devices_with_details(&query).await;
        if devices.is_empty() {
            println!("{}", "No devices".dimmed());
            return Ok(());
        }
        println!(
            "{}",
            format!("{:<8} {:<28} {:<28} {}", "ID", "NAME", "DISPLAY", "URL").bold()
        );
        println!("{}", "─".repeat(100).dimmed());
        for device in devices {
            let id = device.id.map(|id| id.to_string()).unwrap_or_default();
            println!(
                "{:<8} {:<28} {:<28} {}",
                id,
                device.name.cyan(),
                device.display,
                device.url.dimmed()
            );
        }
    } else {
        let names = client.get_device_names(&query).await;
        if names.is_empty() {
            println!("{}", "No devices".dimmed());
        }
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}
