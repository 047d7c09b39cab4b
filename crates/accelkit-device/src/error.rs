//! 引导流程错误
//!
//! 致命错误会中止整个流程；描述读取失败与名称过滤未命中只记录为通知。

use serde::{Deserialize, Serialize};

use crate::device::QueueType;
use crate::platform::PlatformError;
use crate::tier::AdapterCapabilityTier;

pub type BootstrapResult<T> = Result<T, BootstrapError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PlatformUnavailable,
    NoCompatibleAdapters,
    DescriptionReadFailure,
    NameFilterUnmatched,
    DeviceCreationFailed,
    QueueCreationFailed,
    UnsupportedDevice,
}

impl ErrorKind {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DescriptionReadFailure | Self::NameFilterUnmatched)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to create adapter factory on {platform}: {source}")]
    PlatformUnavailable {
        platform: String,
        #[source]
        source: PlatformError,
    },

    #[error("No compatible adapters found (tried {tiers_tried:?})")]
    NoCompatibleAdapters { tiers_tried: Vec<AdapterCapabilityTier> },

    #[error("Failed to create device on adapter [{index}] '{description}' at {tier}: {source}")]
    DeviceCreationFailed {
        index: usize,
        description: String,
        tier: AdapterCapabilityTier,
        #[source]
        source: PlatformError,
    },

    #[error("Failed to create {queue_type} queue on adapter [{index}] '{description}': {source}")]
    QueueCreationFailed {
        index: usize,
        description: String,
        queue_type: QueueType,
        #[source]
        source: PlatformError,
    },

    #[error("Adapter [{index}] '{description}' cannot host an ML device: {source}")]
    UnsupportedDevice {
        index: usize,
        description: String,
        #[source]
        source: PlatformError,
    },
}

impl BootstrapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlatformUnavailable { .. } => ErrorKind::PlatformUnavailable,
            Self::NoCompatibleAdapters { .. } => ErrorKind::NoCompatibleAdapters,
            Self::DeviceCreationFailed { .. } => ErrorKind::DeviceCreationFailed,
            Self::QueueCreationFailed { .. } => ErrorKind::QueueCreationFailed,
            Self::UnsupportedDevice { .. } => ErrorKind::UnsupportedDevice,
        }
    }

    /// 出错的适配器 (排序后的索引, 描述)
    pub fn adapter(&self) -> Option<(usize, &str)> {
        match self {
            Self::DeviceCreationFailed { index, description, .. }
            | Self::QueueCreationFailed { index, description, .. }
            | Self::UnsupportedDevice { index, description, .. } => Some((*index, description)),
            _ => None,
        }
    }
}

/// 非致命结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BootstrapNotice {
    /// 适配器描述读取失败，使用空描述继续
    DescriptionReadFailure { index: usize, reason: String },
    /// 没有适配器匹配名称过滤，退回排序第一的适配器
    NameFilterUnmatched { filter: String, fallback: String },
}

impl BootstrapNotice {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DescriptionReadFailure { .. } => ErrorKind::DescriptionReadFailure,
            Self::NameFilterUnmatched { .. } => ErrorKind::NameFilterUnmatched,
        }
    }
}
