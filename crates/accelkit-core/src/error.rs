//! 统一错误处理

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccelKitError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AccelKitError>;
