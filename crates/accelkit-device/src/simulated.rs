//! 模拟平台
//!
//! 由清单文件 (JSON/YAML) 描述的适配器集合实现 [`PlatformAdapterApi`]，
//! 支持按适配器注入故障，并记录所有平台调用，用于诊断和测试。

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::device::{CommandQueueDesc, QueueType};
use crate::platform::{
    codes, AdapterHandle, AdapterListHandle, AdapterProperty, DeviceHandle, FactoryHandle,
    MlDeviceHandle, PlatformAdapterApi, PlatformError, PlatformResult, PropertyValue, QueueHandle,
};
use crate::tier::AdapterCapabilityTier;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Failed to read inventory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON inventory: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid YAML inventory: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// 单个适配器的故障注入开关
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterFaults {
    /// 从适配器列表取出该适配器时失败
    pub adapter_fetch: bool,
    pub description_unreadable: bool,
    pub device_creation: bool,
    pub feature_probe: bool,
    pub queue_creation: bool,
    pub ml_device: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedAdapter {
    pub description: String,
    /// 适配器声明的枚举层级属性
    #[serde(default = "default_tiers")]
    pub tiers: Vec<AdapterCapabilityTier>,
    #[serde(default = "default_true")]
    pub hardware: bool,
    #[serde(default)]
    pub integrated: bool,
    #[serde(default = "default_max_tier")]
    pub max_tier: AdapterCapabilityTier,
    #[serde(default)]
    pub faults: AdapterFaults,
}

fn default_tiers() -> Vec<AdapterCapabilityTier> {
    vec![
        AdapterCapabilityTier::GenericMachineLearning,
        AdapterCapabilityTier::CoreCompute,
    ]
}

fn default_true() -> bool {
    true
}

fn default_max_tier() -> AdapterCapabilityTier {
    AdapterCapabilityTier::Graphics12_1
}

impl SimulatedAdapter {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            tiers: default_tiers(),
            hardware: true,
            integrated: false,
            max_tier: default_max_tier(),
            faults: AdapterFaults::default(),
        }
    }

    pub fn with_tiers(mut self, tiers: &[AdapterCapabilityTier]) -> Self {
        self.tiers = tiers.to_vec();
        self
    }

    pub fn with_max_tier(mut self, tier: AdapterCapabilityTier) -> Self {
        self.max_tier = tier;
        self
    }

    pub fn integrated(mut self) -> Self {
        self.integrated = true;
        self
    }

    pub fn software(mut self) -> Self {
        self.hardware = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInventory {
    #[serde(default = "default_true")]
    pub factory_available: bool,
    #[serde(default)]
    pub adapters: Vec<SimulatedAdapter>,
    /// 列表查询直接失败的层级
    #[serde(default)]
    pub failing_list_queries: Vec<AdapterCapabilityTier>,
}

impl PlatformInventory {
    pub fn new(adapters: Vec<SimulatedAdapter>) -> Self {
        Self {
            factory_available: true,
            adapters,
            failing_list_queries: Vec::new(),
        }
    }

    /// 按扩展名读取 JSON 或 YAML 清单
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, InventoryError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, InventoryError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// 记录下来的平台调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    CreateFactory,
    CreateAdapterList(AdapterCapabilityTier),
    CreateDevice {
        adapter: String,
        minimum_tier: AdapterCapabilityTier,
    },
    MaxSupportedTier,
    CreateCommandQueue(QueueType),
    CreateMlDevice,
}

// 句柄在平台生命周期内不回收，调用日志也只增不减；
// 每次引导只新增少量条目，重复 switch 时按运行次数线性增长。
#[derive(Default)]
struct SimState {
    next_handle: u64,
    factories: HashSet<u64>,
    // 列表句柄 -> 清单索引
    lists: HashMap<u64, Vec<usize>>,
    adapters: HashMap<u64, usize>,
    devices: HashMap<u64, usize>,
    queues: HashMap<u64, CommandQueueDesc>,
    calls: Vec<PlatformCall>,
}

impl SimState {
    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn adapter_index(&self, handle: AdapterHandle) -> PlatformResult<usize> {
        self.adapters
            .get(&handle.0)
            .copied()
            .ok_or(PlatformError::InvalidHandle(handle.0))
    }

    fn device_adapter(&self, handle: DeviceHandle) -> PlatformResult<usize> {
        self.devices
            .get(&handle.0)
            .copied()
            .ok_or(PlatformError::InvalidHandle(handle.0))
    }
}

pub struct SimulatedPlatform {
    inventory: PlatformInventory,
    state: Mutex<SimState>,
}

impl SimulatedPlatform {
    pub fn new(inventory: PlatformInventory) -> Self {
        Self {
            inventory,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn inventory(&self) -> &PlatformInventory {
        &self.inventory
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&PlatformCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// 已创建的队列数
    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    /// 创建队列时传入的描述
    pub fn queue_desc(&self, queue: QueueHandle) -> Option<CommandQueueDesc> {
        self.state.lock().queues.get(&queue.0).copied()
    }

    fn entry(&self, index: usize) -> PlatformResult<&SimulatedAdapter> {
        self.inventory
            .adapters
            .get(index)
            .ok_or(PlatformError::InvalidHandle(index as u64))
    }
}

impl PlatformAdapterApi for SimulatedPlatform {
    fn name(&self) -> &str {
        "simulated"
    }

    fn create_factory(&self) -> PlatformResult<FactoryHandle> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::CreateFactory);

        if !self.inventory.factory_available {
            return Err(PlatformError::Unavailable(
                "adapter factory not registered".to_string(),
            ));
        }

        let handle = state.issue();
        state.factories.insert(handle);
        Ok(FactoryHandle(handle))
    }

    fn create_adapter_list(
        &self,
        factory: FactoryHandle,
        tier: AdapterCapabilityTier,
    ) -> PlatformResult<AdapterListHandle> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::CreateAdapterList(tier));

        if !state.factories.contains(&factory.0) {
            return Err(PlatformError::InvalidHandle(factory.0));
        }
        if !tier.is_discovery_tier() {
            return Err(PlatformError::Failed {
                operation: "CreateAdapterList",
                code: codes::E_INVALIDARG,
            });
        }
        if self.inventory.failing_list_queries.contains(&tier) {
            return Err(PlatformError::Failed {
                operation: "CreateAdapterList",
                code: codes::E_FAIL,
            });
        }

        let members = self
            .inventory
            .adapters
            .iter()
            .enumerate()
            .filter(|(_, a)| a.tiers.contains(&tier))
            .map(|(i, _)| i)
            .collect();

        let handle = state.issue();
        state.lists.insert(handle, members);
        Ok(AdapterListHandle(handle))
    }

    fn adapter_count(&self, list: AdapterListHandle) -> usize {
        let state = self.state.lock();
        state.lists.get(&list.0).map(|members| members.len()).unwrap_or(0)
    }

    fn adapter(&self, list: AdapterListHandle, index: usize) -> PlatformResult<AdapterHandle> {
        let mut state = self.state.lock();

        let inventory_index = state
            .lists
            .get(&list.0)
            .ok_or(PlatformError::InvalidHandle(list.0))?
            .get(index)
            .copied()
            .ok_or(PlatformError::Failed {
                operation: "GetAdapter",
                code: codes::E_INVALIDARG,
            })?;

        if self.entry(inventory_index)?.faults.adapter_fetch {
            return Err(PlatformError::Failed {
                operation: "GetAdapter",
                code: codes::DXGI_ERROR_DRIVER_INTERNAL_ERROR,
            });
        }

        let handle = state.issue();
        state.adapters.insert(handle, inventory_index);
        Ok(AdapterHandle(handle))
    }

    fn property(&self, adapter: AdapterHandle, key: AdapterProperty) -> PlatformResult<PropertyValue> {
        let index = self.state.lock().adapter_index(adapter)?;
        let entry = self.entry(index)?;

        match key {
            AdapterProperty::DriverDescription => {
                if entry.faults.description_unreadable {
                    return Err(PlatformError::PropertyUnavailable(key));
                }
                let mut bytes = entry.description.clone().into_bytes();
                bytes.push(0);
                Ok(PropertyValue::Bytes(bytes))
            }
            AdapterProperty::IsHardware => Ok(PropertyValue::Bool(entry.hardware)),
            AdapterProperty::IsIntegrated => Ok(PropertyValue::Bool(entry.integrated)),
        }
    }

    fn create_device(
        &self,
        adapter: AdapterHandle,
        minimum_tier: AdapterCapabilityTier,
    ) -> PlatformResult<DeviceHandle> {
        let mut state = self.state.lock();
        let index = state.adapter_index(adapter)?;
        let entry = self.entry(index)?;
        state.calls.push(PlatformCall::CreateDevice {
            adapter: entry.description.clone(),
            minimum_tier,
        });

        if entry.faults.device_creation || minimum_tier > entry.max_tier {
            return Err(PlatformError::Failed {
                operation: "CreateDevice",
                code: codes::DXGI_ERROR_UNSUPPORTED,
            });
        }

        let handle = state.issue();
        state.devices.insert(handle, index);
        Ok(DeviceHandle(handle))
    }

    fn max_supported_tier(
        &self,
        device: DeviceHandle,
        requested: &[AdapterCapabilityTier],
    ) -> PlatformResult<AdapterCapabilityTier> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::MaxSupportedTier);
        let index = state.device_adapter(device)?;
        let entry = self.entry(index)?;

        if entry.faults.feature_probe {
            return Err(PlatformError::Failed {
                operation: "CheckFeatureSupport",
                code: codes::E_FAIL,
            });
        }

        requested
            .iter()
            .copied()
            .filter(|tier| *tier <= entry.max_tier)
            .max()
            .ok_or(PlatformError::Failed {
                operation: "CheckFeatureSupport",
                code: codes::DXGI_ERROR_UNSUPPORTED,
            })
    }

    fn create_command_queue(
        &self,
        device: DeviceHandle,
        desc: &CommandQueueDesc,
    ) -> PlatformResult<QueueHandle> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::CreateCommandQueue(desc.queue_type));
        let index = state.device_adapter(device)?;
        let entry = self.entry(index)?;

        // 只声明核心计算的设备不支持完整队列
        let full_unsupported =
            desc.queue_type == QueueType::Full && entry.max_tier <= AdapterCapabilityTier::CoreCompute;
        if entry.faults.queue_creation {
            return Err(PlatformError::Failed {
                operation: "CreateCommandQueue",
                code: codes::DXGI_ERROR_DRIVER_INTERNAL_ERROR,
            });
        }
        if full_unsupported {
            return Err(PlatformError::Failed {
                operation: "CreateCommandQueue",
                code: codes::E_INVALIDARG,
            });
        }

        let handle = state.issue();
        state.queues.insert(handle, *desc);
        Ok(QueueHandle(handle))
    }

    fn create_ml_device(&self, device: DeviceHandle) -> PlatformResult<MlDeviceHandle> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::CreateMlDevice);
        let index = state.device_adapter(device)?;
        let entry = self.entry(index)?;

        if entry.faults.ml_device {
            return Err(PlatformError::Failed {
                operation: "DMLCreateDevice",
                code: codes::E_NOINTERFACE,
            });
        }

        let handle = state.issue();
        Ok(MlDeviceHandle(handle))
    }
}
