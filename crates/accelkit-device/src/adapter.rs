//! 适配器枚举模块
//!
//! 按能力层级向平台请求适配器列表：先请求最宽的通用 ML 层级，
//! 为空时回退到核心计算层级，仍为空则失败。某一层级报告了适配器但全部
//! 无法打开时直接失败，不再回退。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BootstrapError, BootstrapNotice, BootstrapResult};
use crate::platform::{
    AdapterHandle, AdapterListHandle, AdapterProperty, PlatformAdapterApi, PlatformError,
    PropertyValue,
};
use crate::tier::{AdapterCapabilityTier, DISCOVERY_ORDER};

/// 用于排序的适配器特征，读取失败时为 `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterTraits {
    pub hardware: Option<bool>,
    pub integrated: Option<bool>,
}

/// 一个枚举到的适配器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    /// 平台返回的原始顺序
    pub enumeration_index: usize,
    pub handle: AdapterHandle,
    pub description: String,
    pub tier: AdapterCapabilityTier,
    pub traits: AdapterTraits,
}

/// 枚举结果
#[derive(Debug, Clone)]
pub struct AdapterEnumeration {
    pub adapters: Vec<AdapterDescriptor>,
    /// 后续步骤使用的层级
    pub tier: AdapterCapabilityTier,
    /// 实际发出查询的层级，按顺序
    pub tiers_queried: Vec<AdapterCapabilityTier>,
    pub notices: Vec<BootstrapNotice>,
}

/// 去掉结尾的 NUL 终止符
pub fn strip_terminators(s: &str) -> &str {
    s.trim_end_matches('\0')
}

/// 按 C 字符串解码平台返回的描述字节
pub fn decode_description(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[..end]);
    strip_terminators(&text).to_string()
}

pub struct AdapterEnumerator {
    platform: Arc<dyn PlatformAdapterApi>,
}

impl AdapterEnumerator {
    pub fn new(platform: Arc<dyn PlatformAdapterApi>) -> Self {
        Self { platform }
    }

    pub fn enumerate(&self) -> BootstrapResult<AdapterEnumeration> {
        let factory = self
            .platform
            .create_factory()
            .map_err(|source| BootstrapError::PlatformUnavailable {
                platform: self.platform.name().to_string(),
                source,
            })?;

        let mut tiers_queried = Vec::with_capacity(DISCOVERY_ORDER.len());
        let mut next = Some(DISCOVERY_ORDER[0]);

        while let Some(tier) = next {
            tiers_queried.push(tier);

            let list = match self.platform.create_adapter_list(factory, tier) {
                Ok(list) => Some(list),
                Err(e) => {
                    tracing::warn!("Adapter list query for {} failed: {}", tier, e);
                    None
                }
            };

            // 平台报告了候选就停在这一层级，不再回退
            if let Some(list) = list {
                let count = self.platform.adapter_count(list);
                if count > 0 {
                    let (adapters, notices) = self.describe_all(list, count, tier);
                    if adapters.is_empty() {
                        tracing::error!("All {} adapter(s) at tier {} failed to open", count, tier);
                        return Err(BootstrapError::NoCompatibleAdapters {
                            tiers_tried: tiers_queried,
                        });
                    }

                    tracing::info!("Found {} adapter(s) at tier {}", adapters.len(), tier);
                    return Ok(AdapterEnumeration {
                        adapters,
                        tier,
                        tiers_queried,
                        notices,
                    });
                }
            }

            tracing::info!("No adapters at tier {}", tier);
            next = tier.narrower();
        }

        Err(BootstrapError::NoCompatibleAdapters {
            tiers_tried: tiers_queried,
        })
    }

    fn describe_all(
        &self,
        list: AdapterListHandle,
        count: usize,
        tier: AdapterCapabilityTier,
    ) -> (Vec<AdapterDescriptor>, Vec<BootstrapNotice>) {
        let mut adapters = Vec::with_capacity(count);
        let mut notices = Vec::new();

        for index in 0..count {
            let handle = match self.platform.adapter(list, index) {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!("Skipping adapter[{}]: {}", index, e);
                    continue;
                }
            };

            let description = match self.read_description(handle) {
                Ok(description) => description,
                Err(e) => {
                    tracing::warn!("Adapter[{}] description unreadable: {}", index, e);
                    notices.push(BootstrapNotice::DescriptionReadFailure {
                        index,
                        reason: e.to_string(),
                    });
                    String::new()
                }
            };

            adapters.push(AdapterDescriptor {
                enumeration_index: index,
                handle,
                description,
                tier,
                traits: AdapterTraits {
                    hardware: self.read_flag(handle, AdapterProperty::IsHardware),
                    integrated: self.read_flag(handle, AdapterProperty::IsIntegrated),
                },
            });
        }

        (adapters, notices)
    }

    fn read_description(&self, adapter: AdapterHandle) -> Result<String, PlatformError> {
        match self.platform.property(adapter, AdapterProperty::DriverDescription)? {
            PropertyValue::Bytes(bytes) => Ok(decode_description(&bytes)),
            _ => Err(PlatformError::PropertyUnavailable(
                AdapterProperty::DriverDescription,
            )),
        }
    }

    fn read_flag(&self, adapter: AdapterHandle, key: AdapterProperty) -> Option<bool> {
        self.platform
            .property(adapter, key)
            .ok()
            .and_then(|value| value.as_bool())
    }
}
