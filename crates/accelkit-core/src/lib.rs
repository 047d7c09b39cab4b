//! AccelKit Core - 核心类型和配置
//!
//! 提供错误处理、配置加载等基础功能。

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;
