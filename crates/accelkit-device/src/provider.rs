//! 执行提供程序协商
//!
//! 把引导得到的 (ML 设备, 命令队列) 显式交给推理引擎。一旦注册了显式绑定，
//! 同类提供程序就不能再以引擎自管的方式注册，避免引擎自行创建第二套设备和队列。

use std::path::Path;
use std::sync::Arc;

use accelkit_core::{ExecutionMode, InferenceConfig};
use serde::{Deserialize, Serialize};

use crate::accelerated::AcceleratedComputeDevice;
use crate::device::QueueType;
use crate::platform::{MlDeviceHandle, QueueHandle};
use crate::preprocess::InputTensor;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Execution provider {provider} rejected: {reason}")]
    ProviderRejected { provider: String, reason: String },
    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
    #[error("Inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Execution provider {0} is already registered")]
    DuplicateProvider(ExecutionProviderKind),
    #[error("Execution provider {0} cannot take an explicit device binding")]
    ExplicitBindingUnsupported(ExecutionProviderKind),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionProviderKind {
    DirectMl,
    Cpu,
}

impl ExecutionProviderKind {
    /// 引擎侧注册名
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionProviderKind::DirectMl => "DML",
            ExecutionProviderKind::Cpu => "CPU",
        }
    }

    /// 提供程序 API 表版本
    pub fn api_version(&self) -> u32 {
        match self {
            ExecutionProviderKind::DirectMl => DML_API_VERSION,
            ExecutionProviderKind::Cpu => 1,
        }
    }

    pub fn accepts_explicit_binding(&self) -> bool {
        matches!(self, ExecutionProviderKind::DirectMl)
    }
}

impl std::fmt::Display for ExecutionProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub const DML_API_VERSION: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitDeviceBinding {
    pub ml_device: MlDeviceHandle,
    pub queue: QueueHandle,
    pub queue_type: QueueType,
}

impl From<&AcceleratedComputeDevice> for ExplicitDeviceBinding {
    fn from(accel: &AcceleratedComputeDevice) -> Self {
        let (ml_device, queue) = accel.binding();
        Self {
            ml_device,
            queue,
            queue_type: accel.queue_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProviderRegistration {
    Explicit {
        kind: ExecutionProviderKind,
        binding: ExplicitDeviceBinding,
    },
    EngineManaged { kind: ExecutionProviderKind },
}

impl ProviderRegistration {
    pub fn kind(&self) -> ExecutionProviderKind {
        match self {
            ProviderRegistration::Explicit { kind, .. } => *kind,
            ProviderRegistration::EngineManaged { kind } => *kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub execution_mode: ExecutionMode,
    providers: Vec<ProviderRegistration>,
}

impl SessionOptions {
    pub fn new(execution_mode: ExecutionMode) -> Self {
        Self {
            execution_mode,
            providers: Vec::new(),
        }
    }

    pub fn providers(&self) -> &[ProviderRegistration] {
        &self.providers
    }

    pub fn has_provider(&self, kind: ExecutionProviderKind) -> bool {
        self.providers.iter().any(|p| p.kind() == kind)
    }

    pub fn explicit_binding(&self, kind: ExecutionProviderKind) -> Option<&ExplicitDeviceBinding> {
        self.providers.iter().find_map(|p| match p {
            ProviderRegistration::Explicit { kind: k, binding } if *k == kind => Some(binding),
            _ => None,
        })
    }

    /// 以显式设备绑定注册 DML 提供程序
    pub fn append_accelerator(&mut self, accel: &AcceleratedComputeDevice) -> Result<&mut Self, ProviderError> {
        self.append_explicit(ExecutionProviderKind::DirectMl, accel.into())
    }

    pub fn append_explicit(
        &mut self,
        kind: ExecutionProviderKind,
        binding: ExplicitDeviceBinding,
    ) -> Result<&mut Self, ProviderError> {
        if !kind.accepts_explicit_binding() {
            return Err(ProviderError::ExplicitBindingUnsupported(kind));
        }
        self.push(ProviderRegistration::Explicit { kind, binding })
    }

    /// 由引擎自行创建设备和队列
    pub fn append_engine_managed(&mut self, kind: ExecutionProviderKind) -> Result<&mut Self, ProviderError> {
        self.push(ProviderRegistration::EngineManaged { kind })
    }

    fn push(&mut self, registration: ProviderRegistration) -> Result<&mut Self, ProviderError> {
        let kind = registration.kind();
        if self.has_provider(kind) {
            return Err(ProviderError::DuplicateProvider(kind));
        }
        self.providers.push(registration);
        Ok(self)
    }
}

impl From<&InferenceConfig> for SessionOptions {
    fn from(config: &InferenceConfig) -> Self {
        Self::new(config.execution_mode)
    }
}

/// 推理引擎
#[cfg_attr(test, mockall::automock)]
pub trait InferenceEngine {
    fn append_execution_provider(&mut self, registration: &ProviderRegistration) -> Result<(), EngineError>;

    fn load_model(&mut self, path: &Path, execution_mode: ExecutionMode) -> Result<(), EngineError>;

    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, EngineError>;
}

/// 把加速器交给引擎并加载模型
///
/// 显式绑定总是排在最前面，其余已注册的提供程序按原顺序作为后备。
/// 只有模型加载成功后 `options` 才会被更新，失败时保持调用前的状态。
pub fn attach_accelerator<E: InferenceEngine + ?Sized>(
    engine: &mut E,
    options: &mut SessionOptions,
    accel: &Arc<AcceleratedComputeDevice>,
    model_path: &Path,
) -> Result<(), ProviderError> {
    let mut staged = options.clone();
    staged.append_accelerator(accel)?;
    staged.providers.rotate_right(1);

    for registration in &staged.providers {
        tracing::debug!(
            "Registering execution provider {} (api v{}) as {:?}",
            registration.kind(),
            registration.kind().api_version(),
            registration
        );
        engine.append_execution_provider(registration)?;
    }

    engine.load_model(model_path, staged.execution_mode)?;
    *options = staged;
    tracing::info!(
        "Model {} loaded on '{}' ({} queue)",
        model_path.display(),
        accel.adapter_description(),
        accel.queue_type()
    );
    Ok(())
}
