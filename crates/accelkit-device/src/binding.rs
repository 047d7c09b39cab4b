//! 进程级加速器绑定
//!
//! 硬件设备与队列是进程范围的资源：同一时间只允许一个引导流程运行，
//! 成功后所有调用方共享同一个 [`AcceleratedComputeDevice`]。

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::accelerated::AcceleratedComputeDevice;
use crate::error::BootstrapError;
use crate::pipeline::{BootstrapOptions, BootstrapPipeline, BootstrapReport};
use crate::platform::PlatformAdapterApi;

pub type BindingResult<T> = Result<T, BindingError>;

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("Bootstrap worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

struct Bound {
    device: Arc<AcceleratedComputeDevice>,
    report: BootstrapReport,
}

pub struct AcceleratorBinding {
    platform: Arc<dyn PlatformAdapterApi>,
    options: BootstrapOptions,
    current: Mutex<Option<Bound>>,
}

impl AcceleratorBinding {
    pub fn new(platform: Arc<dyn PlatformAdapterApi>, options: BootstrapOptions) -> Self {
        Self {
            platform,
            options,
            current: Mutex::new(None),
        }
    }

    /// 返回已绑定的设备，首次调用时在后台线程运行引导流程
    pub async fn acquire(&self) -> BindingResult<Arc<AcceleratedComputeDevice>> {
        let mut current = self.current.lock().await;

        if let Some(bound) = current.as_ref() {
            return Ok(bound.device.clone());
        }

        let bound = self.bootstrap(self.options.clone()).await?;
        let device = bound.device.clone();
        *current = Some(bound);
        Ok(device)
    }

    /// 切换加速器；失败时保留原来的绑定
    pub async fn switch(&self, options: BootstrapOptions) -> BindingResult<Arc<AcceleratedComputeDevice>> {
        let mut current = self.current.lock().await;

        let bound = self.bootstrap(options).await?;
        let device = bound.device.clone();
        if let Some(previous) = current.replace(bound) {
            tracing::info!(
                "Switched accelerator from '{}' to '{}'",
                previous.device.adapter_description(),
                device.adapter_description()
            );
        }
        Ok(device)
    }

    pub async fn current(&self) -> Option<Arc<AcceleratedComputeDevice>> {
        self.current.lock().await.as_ref().map(|b| b.device.clone())
    }

    pub async fn report(&self) -> Option<BootstrapReport> {
        self.current.lock().await.as_ref().map(|b| b.report.clone())
    }

    async fn bootstrap(&self, options: BootstrapOptions) -> BindingResult<Bound> {
        let platform = self.platform.clone();

        let bootstrapped = tokio::task::spawn_blocking(move || {
            BootstrapPipeline::new(platform, options).run()
        })
        .await??;

        Ok(Bound {
            device: bootstrapped.device,
            report: bootstrapped.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{PlatformCall, PlatformInventory, SimulatedAdapter, SimulatedPlatform};

    fn platform() -> Arc<SimulatedPlatform> {
        Arc::new(SimulatedPlatform::new(PlatformInventory::new(vec![
            SimulatedAdapter::new("Discrete GPU"),
            SimulatedAdapter::new("Discrete NPU"),
        ])))
    }

    #[tokio::test]
    async fn test_acquire_reuses_device() {
        let sim = platform();
        let binding = AcceleratorBinding::new(sim.clone(), BootstrapOptions::new("NPU"));

        let first = binding.acquire().await.unwrap();
        let second = binding.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sim.queue_count(), 1);
        assert_eq!(sim.count_calls(|c| *c == PlatformCall::CreateFactory), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_runs_once() {
        let sim = platform();
        let binding = Arc::new(AcceleratorBinding::new(sim.clone(), BootstrapOptions::new("NPU")));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let binding = binding.clone();
                tokio::spawn(async move { binding.acquire().await.unwrap() })
            })
            .collect();

        let mut devices = Vec::new();
        for handle in handles {
            devices.push(handle.await.unwrap());
        }

        assert!(devices.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(sim.queue_count(), 1);
    }

    #[tokio::test]
    async fn test_switch_replaces_binding() {
        let sim = platform();
        let binding = AcceleratorBinding::new(sim.clone(), BootstrapOptions::new("NPU"));

        let npu = binding.acquire().await.unwrap();
        let gpu = binding.switch(BootstrapOptions::new("GPU")).await.unwrap();

        assert_eq!(npu.adapter_description(), "Discrete NPU");
        assert_eq!(gpu.adapter_description(), "Discrete GPU");
        let current = binding.current().await.unwrap();
        assert!(Arc::ptr_eq(&current, &gpu));
        assert_eq!(binding.report().await.unwrap().selected_adapter, "Discrete GPU");
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_binding() {
        let mut broken = SimulatedAdapter::new("Broken NPU");
        broken.faults.device_creation = true;
        let sim = Arc::new(SimulatedPlatform::new(PlatformInventory::new(vec![
            SimulatedAdapter::new("Discrete GPU"),
            broken,
        ])));
        let binding = AcceleratorBinding::new(sim, BootstrapOptions::new("GPU"));

        let gpu = binding.acquire().await.unwrap();
        let err = binding.switch(BootstrapOptions::new("Broken")).await.unwrap_err();

        assert!(matches!(err, BindingError::Bootstrap(BootstrapError::DeviceCreationFailed { .. })));
        assert!(Arc::ptr_eq(&binding.current().await.unwrap(), &gpu));
    }

    #[tokio::test]
    async fn test_acquire_error_leaves_binding_empty() {
        let sim = Arc::new(SimulatedPlatform::new(PlatformInventory::new(vec![])));
        let binding = AcceleratorBinding::new(sim, BootstrapOptions::default());

        assert!(binding.acquire().await.is_err());
        assert!(binding.current().await.is_none());
    }

    #[tokio::test]
    async fn test_worker_panic_keeps_join_error() {
        let join_err = tokio::task::spawn_blocking(|| -> u32 { panic!("adapter driver crashed") })
            .await
            .unwrap_err();
        assert!(join_err.is_panic());

        let err = BindingError::from(join_err);

        assert!(matches!(&err, BindingError::Worker(e) if e.is_panic()));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("Bootstrap worker failed"));
    }
}
