//! Bootstrap 命令

use accelkit_core::Config;
use accelkit_device::{AcceleratorBinding, BootstrapOptions, NameFilter};
use anyhow::{Context, Result};

pub async fn run(config: &Config, filter: Option<String>, inventory: Option<&str>, json: bool) -> Result<()> {
    let platform = super::open_platform(config, inventory)?;

    let mut options = BootstrapOptions::from(&config.accelerator);
    if let Some(filter) = filter {
        options.name_filter = NameFilter::new(filter);
    }

    let binding = AcceleratorBinding::new(platform, options);
    let device = binding.acquire().await?;
    let report = binding.report().await.context("Bootstrap report missing")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Accelerator ready");
    println!("  Run:             {}", report.run_id);
    println!("  Platform:        {}", report.platform);
    println!("  Discovery tier:  {}", report.discovery_tier);
    println!("  Adapter:         [{}] {}", report.selected_index, report.selected_adapter);
    println!("  Max tier:        {}", report.max_supported_tier);
    println!("  Queue:           {}", device.queue_type());
    let (ml_device, queue) = device.binding();
    println!("  Binding:         ml_device={} queue={}", ml_device.raw(), queue.raw());

    for notice in &report.notices {
        print!("  ");
        super::print_notice(notice);
    }

    Ok(())
}
