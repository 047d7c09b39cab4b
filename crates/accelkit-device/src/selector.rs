//! 适配器排序与选择
//!
//! 按偏好顺序做稳定的多键排序，再用名称过滤选择第一个匹配项；
//! 没有匹配时退回排序第一的适配器。

use std::cmp::Ordering;

use accelkit_core::AdapterPreference;
use serde::{Deserialize, Serialize};

use crate::adapter::{AdapterDescriptor, AdapterTraits};
use crate::error::{BootstrapError, BootstrapNotice, BootstrapResult};

/// 排序偏好，前面的键优先
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterPreferenceOrder(Vec<AdapterPreference>);

impl Default for AdapterPreferenceOrder {
    fn default() -> Self {
        Self(vec![AdapterPreference::Hardware, AdapterPreference::HighPerformance])
    }
}

impl AdapterPreferenceOrder {
    pub fn new(preferences: Vec<AdapterPreference>) -> Self {
        Self(preferences)
    }

    pub fn preferences(&self) -> &[AdapterPreference] {
        &self.0
    }

    pub fn compare(&self, a: &AdapterDescriptor, b: &AdapterDescriptor) -> Ordering {
        self.0
            .iter()
            .map(|pref| rank(*pref, &a.traits).cmp(&rank(*pref, &b.traits)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// 稳定排序，偏好键相同的适配器保持枚举顺序
    pub fn sort(&self, adapters: &mut [AdapterDescriptor]) {
        adapters.sort_by(|a, b| self.compare(a, b));
    }
}

impl From<Vec<AdapterPreference>> for AdapterPreferenceOrder {
    fn from(preferences: Vec<AdapterPreference>) -> Self {
        Self::new(preferences)
    }
}

// 0 = 满足偏好, 1 = 未知, 2 = 不满足
fn rank(preference: AdapterPreference, traits: &AdapterTraits) -> u8 {
    let satisfied = match preference {
        AdapterPreference::Hardware => traits.hardware,
        AdapterPreference::HighPerformance => traits.integrated.map(|v| !v),
        AdapterPreference::MinimumPower => traits.integrated,
    };

    match satisfied {
        Some(true) => 0,
        None => 1,
        Some(false) => 2,
    }
}

/// 区分大小写的描述子串过滤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFilter(String);

impl NameFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, description: &str) -> bool {
        description.contains(self.0.as_str())
    }
}

/// 在已排序的序列中查找第一个匹配项
pub fn find_first_match(adapters: &[AdapterDescriptor], filter: &NameFilter) -> Option<usize> {
    adapters.iter().position(|a| filter.matches(&a.description))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    Matched,
    FallbackToTopRanked,
}

#[derive(Debug, Clone)]
pub struct AdapterSelection {
    pub adapter: AdapterDescriptor,
    /// 排序后的索引
    pub index: usize,
    pub outcome: SelectionOutcome,
    /// 排序后的全部描述，用于诊断
    pub ranked: Vec<String>,
}

impl AdapterSelection {
    pub fn notice(&self, filter: &NameFilter) -> Option<BootstrapNotice> {
        match self.outcome {
            SelectionOutcome::Matched => None,
            SelectionOutcome::FallbackToTopRanked => Some(BootstrapNotice::NameFilterUnmatched {
                filter: filter.pattern().to_string(),
                fallback: self.adapter.description.clone(),
            }),
        }
    }
}

pub fn select_adapter(
    mut adapters: Vec<AdapterDescriptor>,
    order: &AdapterPreferenceOrder,
    filter: &NameFilter,
) -> BootstrapResult<AdapterSelection> {
    if adapters.is_empty() {
        return Err(BootstrapError::NoCompatibleAdapters {
            tiers_tried: Vec::new(),
        });
    }

    order.sort(&mut adapters);

    let matched = find_first_match(&adapters, filter);

    for (i, adapter) in adapters.iter().enumerate() {
        if matched == Some(i) {
            tracing::debug!("Adapter[{}]: {} (SELECTED)", i, adapter.description);
        } else {
            tracing::debug!("Adapter[{}]: {}", i, adapter.description);
        }
    }

    let (index, outcome) = match matched {
        Some(i) => (i, SelectionOutcome::Matched),
        None => {
            tracing::info!(
                "No adapters match the name filter '{}'. Using the first adapter.",
                filter.pattern()
            );
            (0, SelectionOutcome::FallbackToTopRanked)
        }
    };

    let ranked = adapters.iter().map(|a| a.description.clone()).collect();
    let adapter = adapters.swap_remove(index);

    Ok(AdapterSelection {
        adapter,
        index,
        outcome,
        ranked,
    })
}
