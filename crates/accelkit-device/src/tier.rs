//! 能力层级模块
//!
//! 平台为每个适配器声明的能力层级：既用于枚举过滤，也用于选择命令队列类型

use serde::{Deserialize, Serialize};

/// 能力层级，按平台特性级别数值排序
///
/// `GenericMachineLearning` 是最宽的枚举层级 (GPU 与 NPU 都会上报)，
/// `CoreCompute` 更窄，其后是经典图形层级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterCapabilityTier {
    GenericMachineLearning,
    CoreCompute,
    #[serde(rename = "graphics_11_0")]
    Graphics11_0,
    #[serde(rename = "graphics_11_1")]
    Graphics11_1,
    #[serde(rename = "graphics_12_0")]
    Graphics12_0,
    #[serde(rename = "graphics_12_1")]
    Graphics12_1,
    #[serde(rename = "graphics_12_2")]
    Graphics12_2,
}

/// 枚举顺序：先宽后窄，只有前一层级为空才回退
pub const DISCOVERY_ORDER: [AdapterCapabilityTier; 2] = [
    AdapterCapabilityTier::GenericMachineLearning,
    AdapterCapabilityTier::CoreCompute,
];

/// 创建设备后探测最大支持层级时请求的层级列表
pub const PROBE_ORDER: [AdapterCapabilityTier; 6] = [
    AdapterCapabilityTier::GenericMachineLearning,
    AdapterCapabilityTier::CoreCompute,
    AdapterCapabilityTier::Graphics11_0,
    AdapterCapabilityTier::Graphics11_1,
    AdapterCapabilityTier::Graphics12_0,
    AdapterCapabilityTier::Graphics12_1,
];

/// 不高于此层级的设备只使用计算队列
pub const COMPUTE_ONLY_CEILING: AdapterCapabilityTier = AdapterCapabilityTier::CoreCompute;

impl AdapterCapabilityTier {
    /// 平台特性级别数值
    pub fn level(&self) -> u32 {
        match self {
            Self::GenericMachineLearning => 0x100,
            Self::CoreCompute => 0x1000,
            Self::Graphics11_0 => 0xb000,
            Self::Graphics11_1 => 0xb100,
            Self::Graphics12_0 => 0xc000,
            Self::Graphics12_1 => 0xc100,
            Self::Graphics12_2 => 0xc200,
        }
    }

    pub fn from_level(level: u32) -> Option<Self> {
        [
            Self::GenericMachineLearning,
            Self::CoreCompute,
            Self::Graphics11_0,
            Self::Graphics11_1,
            Self::Graphics12_0,
            Self::Graphics12_1,
            Self::Graphics12_2,
        ]
        .into_iter()
        .find(|tier| tier.level() == level)
    }

    pub fn is_discovery_tier(&self) -> bool {
        DISCOVERY_ORDER.contains(self)
    }

    /// 枚举为空时的下一个更窄层级
    pub fn narrower(&self) -> Option<Self> {
        let pos = DISCOVERY_ORDER.iter().position(|t| t == self)?;
        DISCOVERY_ORDER.get(pos + 1).copied()
    }

    /// 枚举层级对应的适配器属性 GUID
    pub fn attribute_id(&self) -> Option<&'static str> {
        match self {
            Self::GenericMachineLearning => Some("b71b0d41-1088-422f-a27c-0250b7d3a988"),
            Self::CoreCompute => Some("248e2800-a793-4724-abaa-23a6de1be090"),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GenericMachineLearning => "generic_ml",
            Self::CoreCompute => "core_compute",
            Self::Graphics11_0 => "11_0",
            Self::Graphics11_1 => "11_1",
            Self::Graphics12_0 => "12_0",
            Self::Graphics12_1 => "12_1",
            Self::Graphics12_2 => "12_2",
        }
    }
}

impl std::fmt::Display for AdapterCapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_levels() {
        for pair in PROBE_ORDER.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].level() < pair[1].level());
        }
        assert!(AdapterCapabilityTier::Graphics12_1 < AdapterCapabilityTier::Graphics12_2);
    }

    #[test]
    fn test_level_round_trip() {
        for tier in PROBE_ORDER {
            assert_eq!(AdapterCapabilityTier::from_level(tier.level()), Some(tier));
        }
        assert_eq!(AdapterCapabilityTier::from_level(0x9100), None);
    }

    #[test]
    fn test_narrower() {
        assert_eq!(
            AdapterCapabilityTier::GenericMachineLearning.narrower(),
            Some(AdapterCapabilityTier::CoreCompute)
        );
        assert_eq!(AdapterCapabilityTier::CoreCompute.narrower(), None);
        assert_eq!(AdapterCapabilityTier::Graphics12_0.narrower(), None);
    }

    #[test]
    fn test_attribute_ids_only_for_discovery_tiers() {
        for tier in PROBE_ORDER {
            assert_eq!(tier.attribute_id().is_some(), tier.is_discovery_tier());
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&AdapterCapabilityTier::Graphics11_0).unwrap();
        assert_eq!(json, "\"graphics_11_0\"");
        let tier: AdapterCapabilityTier = serde_json::from_str("\"core_compute\"").unwrap();
        assert_eq!(tier, AdapterCapabilityTier::CoreCompute);
    }
}
