//! 设备与命令队列构建
//!
//! 在选中的适配器上创建硬件设备，探测其实际最大层级，据此决定队列类型：
//! 不高于核心计算层级只创建计算队列，否则创建完整 (图形 + 计算) 队列。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BootstrapError, BootstrapResult};
use crate::platform::{DeviceHandle, PlatformAdapterApi, QueueHandle};
use crate::selector::AdapterSelection;
use crate::tier::{AdapterCapabilityTier, COMPUTE_ONLY_CEILING, PROBE_ORDER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    /// 受限的计算队列，兼容性最广
    ComputeOnly,
    /// 图形与计算都可提交
    Full,
}

impl QueueType {
    pub fn for_max_tier(max_tier: AdapterCapabilityTier) -> Self {
        if max_tier <= COMPUTE_ONLY_CEILING {
            Self::ComputeOnly
        } else {
            Self::Full
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ComputeOnly => "compute",
            Self::Full => "direct",
        }
    }
}

impl std::fmt::Display for QueueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePriority {
    #[default]
    Normal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFlags {
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandQueueDesc {
    pub queue_type: QueueType,
    pub priority: QueuePriority,
    pub flags: QueueFlags,
    pub node_mask: u32,
}

impl CommandQueueDesc {
    pub fn new(queue_type: QueueType) -> Self {
        Self {
            queue_type,
            priority: QueuePriority::Normal,
            flags: QueueFlags::None,
            node_mask: 0,
        }
    }
}

/// 绑定到单个适配器的硬件设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeDevice {
    pub handle: DeviceHandle,
    pub adapter_index: usize,
    pub adapter_description: String,
    /// 枚举时使用的 (最低) 层级
    pub discovery_tier: AdapterCapabilityTier,
    /// 探测到的实际最高层级
    pub max_supported_tier: AdapterCapabilityTier,
}

/// 与设备一一对应的命令队列，类型在创建后不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandQueue {
    handle: QueueHandle,
    device: DeviceHandle,
    desc: CommandQueueDesc,
}

impl CommandQueue {
    pub fn handle(&self) -> QueueHandle {
        self.handle
    }

    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    pub fn queue_type(&self) -> QueueType {
        self.desc.queue_type
    }

    pub fn desc(&self) -> &CommandQueueDesc {
        &self.desc
    }
}

pub struct DeviceQueueBuilder {
    platform: Arc<dyn PlatformAdapterApi>,
}

impl DeviceQueueBuilder {
    pub fn new(platform: Arc<dyn PlatformAdapterApi>) -> Self {
        Self { platform }
    }

    pub fn build(&self, selection: &AdapterSelection) -> BootstrapResult<(ComputeDevice, CommandQueue)> {
        let device = self.create_device(selection)?;
        let queue = self.create_queue(&device)?;
        Ok((device, queue))
    }

    pub fn create_device(&self, selection: &AdapterSelection) -> BootstrapResult<ComputeDevice> {
        let adapter = &selection.adapter;
        let creation_failed = |source| BootstrapError::DeviceCreationFailed {
            index: selection.index,
            description: adapter.description.clone(),
            tier: adapter.tier,
            source,
        };

        let handle = self
            .platform
            .create_device(adapter.handle, adapter.tier)
            .map_err(creation_failed)?;

        let max_supported_tier = self
            .platform
            .max_supported_tier(handle, &PROBE_ORDER)
            .map_err(creation_failed)?;

        tracing::debug!(
            "Device on '{}' created at {}, max supported {}",
            adapter.description,
            adapter.tier,
            max_supported_tier
        );

        Ok(ComputeDevice {
            handle,
            adapter_index: selection.index,
            adapter_description: adapter.description.clone(),
            discovery_tier: adapter.tier,
            max_supported_tier,
        })
    }

    pub fn create_queue(&self, device: &ComputeDevice) -> BootstrapResult<CommandQueue> {
        let desc = CommandQueueDesc::new(QueueType::for_max_tier(device.max_supported_tier));

        let handle = self
            .platform
            .create_command_queue(device.handle, &desc)
            .map_err(|source| BootstrapError::QueueCreationFailed {
                index: device.adapter_index,
                description: device.adapter_description.clone(),
                queue_type: desc.queue_type,
                source,
            })?;

        tracing::info!(
            "Created {} queue for '{}'",
            desc.queue_type,
            device.adapter_description
        );

        Ok(CommandQueue {
            handle,
            device: device.handle,
            desc,
        })
    }
}
