//! 配置管理
//!
//! 加速器选择、推理会话和日志的配置，JSON 格式持久化

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AccelKitError, Result};

pub const ENV_ADAPTER_FILTER: &str = "ACCELKIT_ADAPTER_FILTER";
pub const ENV_INVENTORY: &str = "ACCELKIT_INVENTORY";

/// 主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 加速器选择配置
    #[serde(default)]
    pub accelerator: AcceleratorConfig,
    /// 推理会话配置
    #[serde(default)]
    pub inference: InferenceConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 适配器排序偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPreference {
    /// 硬件适配器优先于软件/模拟适配器
    Hardware,
    /// 独立 (高性能) 适配器优先
    HighPerformance,
    /// 集成 (低功耗) 适配器优先
    MinimumPower,
}

impl AdapterPreference {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::HighPerformance => "high_performance",
            Self::MinimumPower => "minimum_power",
        }
    }
}

impl std::fmt::Display for AdapterPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 加速器选择配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceleratorConfig {
    /// 适配器描述子串 (区分大小写)
    #[serde(default = "default_adapter_name_filter")]
    pub adapter_name_filter: String,
    /// 排序偏好，按顺序作为多级排序键
    #[serde(default = "default_preferences")]
    pub preferences: Vec<AdapterPreference>,
    /// 模拟平台清单文件 (JSON/YAML)
    #[serde(default)]
    pub inventory: Option<PathBuf>,
}

fn default_adapter_name_filter() -> String {
    "NPU".to_string()
}

fn default_preferences() -> Vec<AdapterPreference> {
    vec![AdapterPreference::Hardware, AdapterPreference::HighPerformance]
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            adapter_name_filter: default_adapter_name_filter(),
            preferences: default_preferences(),
            inventory: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// 推理会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// 模型输入张量名
    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_input_size")]
    pub input_width: u32,
    #[serde(default = "default_input_size")]
    pub input_height: u32,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

fn default_input_name() -> String {
    "data".to_string()
}

fn default_input_size() -> u32 {
    224
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_name: default_input_name(),
            input_width: default_input_size(),
            input_height: default_input_size(),
            execution_mode: ExecutionMode::default(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` 指令，`RUST_LOG` 优先
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "accelkit=debug,info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// 读取配置，文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AccelKitError::Config(format!("读取配置失败: {}", e)))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| AccelKitError::Config(format!("解析配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AccelKitError::Config(format!("创建目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content)
            .map_err(|e| AccelKitError::Config(format!("写入配置失败: {}", e)))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".accelkit")
            .join("config.json")
    }

    /// 环境变量覆盖文件中的值
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(filter) = lookup(ENV_ADAPTER_FILTER) {
            self.accelerator.adapter_name_filter = filter;
        }
        if let Some(inventory) = lookup(ENV_INVENTORY).filter(|v| !v.is_empty()) {
            self.accelerator.inventory = Some(PathBuf::from(inventory));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let prefs = &self.accelerator.preferences;
        for (i, pref) in prefs.iter().enumerate() {
            if prefs[..i].contains(pref) {
                return Err(AccelKitError::Config(format!("重复的适配器偏好: {}", pref)));
            }
        }

        if self.inference.input_width == 0 || self.inference.input_height == 0 {
            return Err(AccelKitError::Config("输入尺寸必须大于 0".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.accelerator.adapter_name_filter, "NPU");
        assert_eq!(
            config.accelerator.preferences,
            vec![AdapterPreference::Hardware, AdapterPreference::HighPerformance]
        );
        assert_eq!(config.inference.input_width, 224);
        assert_eq!(config.inference.input_name, "data");
        assert_eq!(config.inference.execution_mode, ExecutionMode::Sequential);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = Config::from_json(r#"{"accelerator": {"adapter_name_filter": "GPU"}}"#).unwrap();
        assert_eq!(config.accelerator.adapter_name_filter, "GPU");
        assert_eq!(config.accelerator.preferences.len(), 2);
        assert_eq!(config.logging.filter, "accelkit=debug,info");
    }

    #[test]
    fn test_duplicate_preference_rejected() {
        let json = r#"{"accelerator": {"preferences": ["hardware", "hardware"]}}"#;
        assert!(matches!(Config::from_json(json), Err(AccelKitError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.accelerator.adapter_name_filter = "Discrete".to_string();
        config.accelerator.preferences = vec![AdapterPreference::MinimumPower];
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.accelerator.adapter_name_filter, "Discrete");
        assert_eq!(loaded.accelerator.preferences, vec![AdapterPreference::MinimumPower]);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.accelerator.adapter_name_filter, "NPU");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ADAPTER_FILTER, "Arc"),
            (ENV_INVENTORY, "/tmp/inventory.yaml"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.accelerator.adapter_name_filter, "Arc");
        assert_eq!(
            config.accelerator.inventory,
            Some(PathBuf::from("/tmp/inventory.yaml"))
        );
    }
}
