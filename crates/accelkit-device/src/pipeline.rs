//! 引导流程
//!
//! 枚举 → 选择 → 创建设备 → 创建队列 → ML 封装，严格顺序执行。
//! 任一步骤失败即进入 `Failed`，不重试；调用方可以从头重新运行。

use accelkit_core::AcceleratorConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::accelerated::{wrap_for_inference, AcceleratedComputeDevice};
use crate::adapter::AdapterEnumerator;
use crate::device::{DeviceQueueBuilder, QueueType};
use crate::error::{BootstrapNotice, BootstrapResult};
use crate::platform::PlatformAdapterApi;
use crate::selector::{select_adapter, AdapterPreferenceOrder, NameFilter, SelectionOutcome};
use crate::tier::AdapterCapabilityTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStage {
    Uninitialized,
    AdaptersEnumerated,
    AdapterSelected,
    DeviceCreated,
    QueueCreated,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapOptions {
    pub name_filter: NameFilter,
    pub preferences: AdapterPreferenceOrder,
}

impl BootstrapOptions {
    pub fn new(name_filter: impl Into<String>) -> Self {
        Self {
            name_filter: NameFilter::new(name_filter),
            preferences: AdapterPreferenceOrder::default(),
        }
    }

    pub fn with_preferences(mut self, preferences: AdapterPreferenceOrder) -> Self {
        self.preferences = preferences;
        self
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self::from(&AcceleratorConfig::default())
    }
}

impl From<&AcceleratorConfig> for BootstrapOptions {
    fn from(config: &AcceleratorConfig) -> Self {
        Self {
            name_filter: NameFilter::new(config.adapter_name_filter.clone()),
            preferences: AdapterPreferenceOrder::new(config.preferences.clone()),
        }
    }
}

/// 一次成功引导的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub platform: String,
    pub discovery_tier: AdapterCapabilityTier,
    pub tiers_queried: Vec<AdapterCapabilityTier>,
    /// 按偏好排序后的适配器描述
    pub ranked_adapters: Vec<String>,
    pub selected_index: usize,
    pub selected_adapter: String,
    pub selection: SelectionOutcome,
    pub max_supported_tier: AdapterCapabilityTier,
    pub queue_type: QueueType,
    pub notices: Vec<BootstrapNotice>,
}

#[derive(Debug)]
pub struct Bootstrapped {
    pub device: Arc<AcceleratedComputeDevice>,
    pub report: BootstrapReport,
}

pub struct BootstrapPipeline {
    platform: Arc<dyn PlatformAdapterApi>,
    options: BootstrapOptions,
    stage: BootstrapStage,
    failed_at: Option<BootstrapStage>,
}

impl BootstrapPipeline {
    pub fn new(platform: Arc<dyn PlatformAdapterApi>, options: BootstrapOptions) -> Self {
        Self {
            platform,
            options,
            stage: BootstrapStage::Uninitialized,
            failed_at: None,
        }
    }

    pub fn stage(&self) -> BootstrapStage {
        self.stage
    }

    /// 失败时所处的最后一个成功阶段
    pub fn failed_at(&self) -> Option<BootstrapStage> {
        self.failed_at
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    /// 从 `Uninitialized` 开始完整运行一次
    pub fn run(&mut self) -> BootstrapResult<Bootstrapped> {
        self.stage = BootstrapStage::Uninitialized;
        self.failed_at = None;

        match self.execute() {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!("Accelerator bootstrap failed after {:?}: {}", self.stage, e);
                self.failed_at = Some(self.stage);
                self.stage = BootstrapStage::Failed;
                Err(e)
            }
        }
    }

    fn execute(&mut self) -> BootstrapResult<Bootstrapped> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::debug!("Bootstrap {} on platform {}", run_id, self.platform.name());

        let enumeration = AdapterEnumerator::new(self.platform.clone()).enumerate()?;
        self.advance(BootstrapStage::AdaptersEnumerated);

        let mut notices = enumeration.notices;
        let selection = select_adapter(
            enumeration.adapters,
            &self.options.preferences,
            &self.options.name_filter,
        )?;
        notices.extend(selection.notice(&self.options.name_filter));
        self.advance(BootstrapStage::AdapterSelected);

        let builder = DeviceQueueBuilder::new(self.platform.clone());
        let device = builder.create_device(&selection)?;
        self.advance(BootstrapStage::DeviceCreated);

        let queue = builder.create_queue(&device)?;
        self.advance(BootstrapStage::QueueCreated);

        let accelerated = wrap_for_inference(&self.platform, device, queue)?;
        self.advance(BootstrapStage::Ready);

        let report = BootstrapReport {
            run_id,
            started_at,
            platform: self.platform.name().to_string(),
            discovery_tier: enumeration.tier,
            tiers_queried: enumeration.tiers_queried,
            ranked_adapters: selection.ranked,
            selected_index: selection.index,
            selected_adapter: selection.adapter.description,
            selection: selection.outcome,
            max_supported_tier: accelerated.device().max_supported_tier,
            queue_type: accelerated.queue_type(),
            notices,
        };

        tracing::info!(
            "Accelerator ready: '{}' ({} queue, max tier {})",
            report.selected_adapter,
            report.queue_type,
            report.max_supported_tier
        );

        Ok(Bootstrapped {
            device: Arc::new(accelerated),
            report,
        })
    }

    fn advance(&mut self, stage: BootstrapStage) {
        tracing::trace!("Bootstrap stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}
