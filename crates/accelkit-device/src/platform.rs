//! 平台能力查询接口
//!
//! 对底层能力查询 API 的抽象：工厂、按层级的适配器列表、属性读取、
//! 设备/队列/ML 设备创建。所有对象都以不透明句柄表示，由平台持有引用计数。

use serde::{Deserialize, Serialize};

use crate::device::CommandQueueDesc;
use crate::tier::AdapterCapabilityTier;

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("Platform unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid handle: {0}")]
    InvalidHandle(u64),
    #[error("Property {0} unavailable")]
    PropertyUnavailable(AdapterProperty),
    #[error("{operation} failed: 0x{code:08X}")]
    Failed { operation: &'static str, code: u32 },
}

/// 常见失败码
pub mod codes {
    pub const E_FAIL: u32 = 0x8000_4005;
    pub const E_INVALIDARG: u32 = 0x8007_0057;
    pub const E_NOINTERFACE: u32 = 0x8000_4002;
    pub const DXGI_ERROR_UNSUPPORTED: u32 = 0x887A_0004;
    pub const DXGI_ERROR_DRIVER_INTERNAL_ERROR: u32 = 0x887A_0020;
}

macro_rules! handle_type {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            pub struct $name(pub u64);

            impl $name {
                pub fn raw(&self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

handle_type!(
    FactoryHandle,
    AdapterListHandle,
    AdapterHandle,
    DeviceHandle,
    QueueHandle,
    MlDeviceHandle,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterProperty {
    DriverDescription,
    IsHardware,
    IsIntegrated,
}

impl std::fmt::Display for AdapterProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DriverDescription => "DriverDescription",
            Self::IsHardware => "IsHardware",
            Self::IsIntegrated => "IsIntegrated",
        };
        write!(f, "{}", name)
    }
}

/// 属性值，字符串属性以平台原始字节返回 (可能含结尾的 NUL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bytes(Vec<u8>),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Bytes(_) => None,
        }
    }
}

/// 能力查询平台
///
/// 实现者可以是原生驱动绑定，也可以是 [`crate::simulated::SimulatedPlatform`]。
pub trait PlatformAdapterApi: Send + Sync {
    fn name(&self) -> &str;

    fn create_factory(&self) -> PlatformResult<FactoryHandle>;

    /// 列出声明了 `tier` 属性的适配器
    fn create_adapter_list(
        &self,
        factory: FactoryHandle,
        tier: AdapterCapabilityTier,
    ) -> PlatformResult<AdapterListHandle>;

    fn adapter_count(&self, list: AdapterListHandle) -> usize;

    fn adapter(&self, list: AdapterListHandle, index: usize) -> PlatformResult<AdapterHandle>;

    fn property(&self, adapter: AdapterHandle, key: AdapterProperty) -> PlatformResult<PropertyValue>;

    fn create_device(
        &self,
        adapter: AdapterHandle,
        minimum_tier: AdapterCapabilityTier,
    ) -> PlatformResult<DeviceHandle>;

    /// 返回 `requested` 中设备实际支持的最高层级
    fn max_supported_tier(
        &self,
        device: DeviceHandle,
        requested: &[AdapterCapabilityTier],
    ) -> PlatformResult<AdapterCapabilityTier>;

    fn create_command_queue(
        &self,
        device: DeviceHandle,
        desc: &CommandQueueDesc,
    ) -> PlatformResult<QueueHandle>;

    fn create_ml_device(&self, device: DeviceHandle) -> PlatformResult<MlDeviceHandle>;
}
