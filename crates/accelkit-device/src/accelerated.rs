//! ML 设备封装
//!
//! 在同一个硬件设备上创建 ML 设备句柄，并与其命令队列绑定在一起，
//! 下游推理会话通过这个队列提交工作。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::device::{CommandQueue, ComputeDevice, QueueType};
use crate::error::{BootstrapError, BootstrapResult};
use crate::platform::{MlDeviceHandle, PlatformAdapterApi, QueueHandle};

/// 可供推理使用的加速设备
///
/// 每个硬件设备只创建一次；需要共用同一加速器的会话应共享同一个 `Arc`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratedComputeDevice {
    ml_device: MlDeviceHandle,
    device: ComputeDevice,
    queue: CommandQueue,
}

impl AcceleratedComputeDevice {
    pub fn ml_device(&self) -> MlDeviceHandle {
        self.ml_device
    }

    pub fn device(&self) -> &ComputeDevice {
        &self.device
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue.queue_type()
    }

    pub fn adapter_description(&self) -> &str {
        &self.device.adapter_description
    }

    /// 交给推理引擎的 (ML 设备, 队列) 对
    pub fn binding(&self) -> (MlDeviceHandle, QueueHandle) {
        (self.ml_device, self.queue.handle())
    }
}

pub fn wrap_for_inference(
    platform: &Arc<dyn PlatformAdapterApi>,
    device: ComputeDevice,
    queue: CommandQueue,
) -> BootstrapResult<AcceleratedComputeDevice> {
    let ml_device = platform
        .create_ml_device(device.handle)
        .map_err(|source| BootstrapError::UnsupportedDevice {
            index: device.adapter_index,
            description: device.adapter_description.clone(),
            source,
        })?;

    Ok(AcceleratedComputeDevice {
        ml_device,
        device,
        queue,
    })
}
