//! Init 命令

use accelkit_core::Config;
use anyhow::{bail, Result};
use std::path::Path;

pub async fn run(path: &Path, force: bool) -> Result<()> {
    if tokio::fs::try_exists(path).await? && !force {
        bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let config = Config::default();
    config.save(path)?;

    println!("Configuration initialized at: {}", path.display());
    println!("\nDefault configuration:");
    println!("  Adapter filter: {}", config.accelerator.adapter_name_filter);
    println!(
        "  Preferences:    {}",
        config
            .accelerator
            .preferences
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  Model input:    {} ({}x{})",
        config.inference.input_name, config.inference.input_width, config.inference.input_height
    );
    println!("\nSet accelerator.inventory to an adapter inventory file before running bootstrap.");

    Ok(())
}
