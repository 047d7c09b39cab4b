pub mod adapters;
pub mod bootstrap;
pub mod init;

use accelkit_core::Config;
use accelkit_device::{BootstrapNotice, PlatformInventory, SimulatedPlatform};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::expand_path;

/// 读取配置文件并应用环境变量覆盖
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.apply_env_overrides();
    Ok(config)
}

/// 命令行参数优先，其次是配置中的清单路径
pub fn open_platform(config: &Config, inventory: Option<&str>) -> Result<Arc<SimulatedPlatform>> {
    let path = match inventory {
        Some(path) => expand_path(path),
        None => config.accelerator.inventory.clone().context(
            "No adapter inventory configured; pass --inventory or set ACCELKIT_INVENTORY",
        )?,
    };

    let inventory = PlatformInventory::load(&path)
        .with_context(|| format!("Failed to read adapter inventory {}", path.display()))?;
    tracing::debug!(
        "Loaded {} simulated adapter(s) from {}",
        inventory.adapters.len(),
        path.display()
    );

    Ok(Arc::new(SimulatedPlatform::new(inventory)))
}

pub fn print_notice(notice: &BootstrapNotice) {
    match notice {
        BootstrapNotice::DescriptionReadFailure { index, reason } => {
            println!("warning: adapter[{}] description unreadable: {}", index, reason);
        }
        BootstrapNotice::NameFilterUnmatched { filter, fallback } => {
            println!("note: no adapter matched \"{}\", using '{}'", filter, fallback);
        }
    }
}
