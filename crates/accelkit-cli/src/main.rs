//! AccelKit CLI - 加速器引导命令行工具

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "accelkit")]
#[command(about = "AccelKit - pick an ML accelerator and bring up its device and queue", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "~/.accelkit/config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List ML-capable adapters in preference order
    Adapters {
        /// Adapter name filter (case-sensitive substring)
        #[arg(short, long)]
        filter: Option<String>,
        /// Adapter inventory file (JSON or YAML)
        #[arg(short, long)]
        inventory: Option<String>,
    },
    /// Run the full bootstrap and print the report
    Bootstrap {
        /// Adapter name filter (case-sensitive substring)
        #[arg(short, long)]
        filter: Option<String>,
        /// Adapter inventory file (JSON or YAML)
        #[arg(short, long)]
        inventory: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Initialize configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub(crate) fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_path(&cli.config);

    // 配置读取失败时仍用默认过滤器初始化日志
    let loaded = commands::load_config(&config_path);
    let log_filter = match &loaded {
        Ok(config) => config.logging.filter.clone(),
        Err(_) => accelkit_core::LoggingConfig::default().filter,
    };

    // 初始化日志，RUST_LOG 优先
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Adapters { filter, inventory } => {
            commands::adapters::run(&loaded?, filter, inventory.as_deref()).await?;
        }
        Commands::Bootstrap { filter, inventory, json } => {
            commands::bootstrap::run(&loaded?, filter, inventory.as_deref(), json).await?;
        }
        Commands::Init { force } => {
            commands::init::run(&config_path, force).await?;
        }
    }

    Ok(())
}
