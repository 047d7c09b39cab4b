pub mod inventory {
    use accelkit_device::{AdapterCapabilityTier, PlatformInventory, SimulatedAdapter, SimulatedPlatform};
    use std::sync::Arc;

    /// 通用 ML 层级上的三个适配器，枚举顺序与偏好排序不同
    pub fn three_adapter_inventory() -> PlatformInventory {
        PlatformInventory::new(vec![
            SimulatedAdapter::new("Integrated GPU").integrated(),
            SimulatedAdapter::new("Discrete NPU")
                .with_tiers(&[AdapterCapabilityTier::GenericMachineLearning])
                .with_max_tier(AdapterCapabilityTier::GenericMachineLearning),
            SimulatedAdapter::new("Discrete GPU"),
        ])
    }

    /// 通用层级没有适配器，核心计算层级有两个
    pub fn core_compute_only_inventory() -> PlatformInventory {
        PlatformInventory::new(vec![
            SimulatedAdapter::new("Legacy GPU A")
                .with_tiers(&[AdapterCapabilityTier::CoreCompute])
                .with_max_tier(AdapterCapabilityTier::Graphics11_0),
            SimulatedAdapter::new("Legacy GPU B")
                .with_tiers(&[AdapterCapabilityTier::CoreCompute])
                .with_max_tier(AdapterCapabilityTier::CoreCompute),
        ])
    }

    pub fn software_only_inventory() -> PlatformInventory {
        PlatformInventory::new(vec![SimulatedAdapter::new("Basic Render Driver").software()])
    }

    pub fn unavailable_inventory() -> PlatformInventory {
        PlatformInventory {
            factory_available: false,
            ..PlatformInventory::new(Vec::new())
        }
    }

    pub fn simulated(inventory: PlatformInventory) -> Arc<SimulatedPlatform> {
        Arc::new(SimulatedPlatform::new(inventory))
    }
}

pub mod engine {
    use accelkit_core::ExecutionMode;
    use accelkit_device::{EngineError, ExecutionProviderKind, InferenceEngine, InputTensor, ProviderRegistration};
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// 记录注册和加载调用的推理引擎
    #[derive(Clone)]
    pub struct RecordingEngine {
        registrations: Arc<Mutex<Vec<ProviderRegistration>>>,
        loaded: Arc<Mutex<Option<(PathBuf, ExecutionMode)>>>,
        run_count: Arc<Mutex<u32>>,
        rejected: Arc<Mutex<Vec<ExecutionProviderKind>>>,
        output_len: usize,
    }

    impl Default for RecordingEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RecordingEngine {
        pub fn new() -> Self {
            Self {
                registrations: Arc::new(Mutex::new(Vec::new())),
                loaded: Arc::new(Mutex::new(None)),
                run_count: Arc::new(Mutex::new(0)),
                rejected: Arc::new(Mutex::new(Vec::new())),
                output_len: 1000,
            }
        }

        pub fn with_output_len(mut self, len: usize) -> Self {
            self.output_len = len;
            self
        }

        pub fn reject(self, kind: ExecutionProviderKind) -> Self {
            self.rejected.lock().push(kind);
            self
        }

        pub fn registrations(&self) -> Vec<ProviderRegistration> {
            self.registrations.lock().clone()
        }

        pub fn loaded_model(&self) -> Option<(PathBuf, ExecutionMode)> {
            self.loaded.lock().clone()
        }

        pub fn run_count(&self) -> u32 {
            *self.run_count.lock()
        }
    }

    impl InferenceEngine for RecordingEngine {
        fn append_execution_provider(&mut self, registration: &ProviderRegistration) -> Result<(), EngineError> {
            if self.rejected.lock().contains(&registration.kind()) {
                return Err(EngineError::ProviderRejected {
                    provider: registration.kind().name().to_string(),
                    reason: "mock rejection".to_string(),
                });
            }
            self.registrations.lock().push(registration.clone());
            Ok(())
        }

        fn load_model(&mut self, path: &Path, execution_mode: ExecutionMode) -> Result<(), EngineError> {
            if self.registrations.lock().is_empty() {
                return Err(EngineError::ModelLoad {
                    path: path.display().to_string(),
                    reason: "no execution provider registered".to_string(),
                });
            }
            *self.loaded.lock() = Some((path.to_path_buf(), execution_mode));
            Ok(())
        }

        fn run(&self, input: &InputTensor) -> Result<Vec<f32>, EngineError> {
            if self.loaded.lock().is_none() {
                return Err(EngineError::Inference("model not loaded".to_string()));
            }
            if input.data.len() != input.element_count() {
                return Err(EngineError::Inference(format!(
                    "tensor '{}' has {} elements, shape says {}",
                    input.name,
                    input.data.len(),
                    input.element_count()
                )));
            }
            *self.run_count.lock() += 1;

            let mean = input.data.iter().sum::<f32>() / input.data.len().max(1) as f32;
            Ok((0..self.output_len).map(|i| mean + i as f32).collect())
        }
    }
}

#[cfg(test)]
pub mod config {
    use accelkit_core::{AcceleratorConfig, Config, InferenceConfig, LoggingConfig};
    use std::path::PathBuf;

    pub fn mock_config(filter: &str) -> Config {
        Config {
            accelerator: AcceleratorConfig {
                adapter_name_filter: filter.to_string(),
                ..Default::default()
            },
            inference: InferenceConfig {
                model_path: Some(PathBuf::from("resnet50-v2-7.onnx")),
                ..Default::default()
            },
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod scenarios {
    use super::config::mock_config;
    use super::engine::RecordingEngine;
    use super::inventory::*;
    use accelkit_core::AdapterPreference;
    use accelkit_device::*;
    use std::path::Path;
    use std::sync::Arc;

    fn bootstrap(inventory: PlatformInventory, filter: &str) -> BootstrapResult<Bootstrapped> {
        BootstrapPipeline::new(simulated(inventory), BootstrapOptions::new(filter)).run()
    }

    #[test]
    fn test_npu_selected_regardless_of_enumeration_position() {
        let result = bootstrap(three_adapter_inventory(), "NPU").unwrap();

        assert_eq!(result.report.selected_adapter, "Discrete NPU");
        assert_eq!(
            result.report.ranked_adapters,
            vec!["Discrete NPU", "Discrete GPU", "Integrated GPU"]
        );
    }

    #[test]
    fn test_core_compute_fallback_records_tier() {
        let result = bootstrap(core_compute_only_inventory(), "NPU").unwrap();

        assert_eq!(result.report.discovery_tier, AdapterCapabilityTier::CoreCompute);
        assert_eq!(
            result.report.tiers_queried,
            vec![
                AdapterCapabilityTier::GenericMachineLearning,
                AdapterCapabilityTier::CoreCompute
            ]
        );
        assert_eq!(result.report.selected_adapter, "Legacy GPU A");
        assert_eq!(result.report.queue_type, QueueType::Full);
    }

    #[test]
    fn test_unmatched_filter_uses_top_ranked() {
        let result = bootstrap(three_adapter_inventory(), "TPU").unwrap();

        assert_eq!(result.report.selected_index, 0);
        assert_eq!(result.report.selected_adapter, "Discrete NPU");
        assert!(result.report.notices.contains(&BootstrapNotice::NameFilterUnmatched {
            filter: "TPU".to_string(),
            fallback: "Discrete NPU".to_string(),
        }));
    }

    #[test]
    fn test_generic_floor_gets_compute_queue() {
        let result = bootstrap(three_adapter_inventory(), "NPU").unwrap();

        assert_eq!(result.report.max_supported_tier, AdapterCapabilityTier::GenericMachineLearning);
        assert_eq!(result.report.queue_type, QueueType::ComputeOnly);
        assert_eq!(result.device.queue().desc().priority, QueuePriority::Normal);
        assert_eq!(result.device.queue().desc().node_mask, 0);
    }

    #[test]
    fn test_core_compute_ceiling_gets_compute_queue() {
        let result = bootstrap(core_compute_only_inventory(), "Legacy GPU B").unwrap();

        assert_eq!(result.report.max_supported_tier, AdapterCapabilityTier::CoreCompute);
        assert_eq!(result.report.queue_type, QueueType::ComputeOnly);
    }

    #[test]
    fn test_software_adapter_still_bootstraps() {
        let result = bootstrap(software_only_inventory(), "NPU").unwrap();
        assert_eq!(result.report.selection, SelectionOutcome::FallbackToTopRanked);
        assert_eq!(result.report.selected_adapter, "Basic Render Driver");
    }

    #[test]
    fn test_platform_unavailable() {
        let err = bootstrap(unavailable_inventory(), "NPU").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PlatformUnavailable);
        assert!(err.kind().is_fatal());
    }

    #[test]
    fn test_no_adapters_anywhere() {
        let err = bootstrap(PlatformInventory::new(vec![]), "NPU").unwrap_err();

        match err {
            BootstrapError::NoCompatibleAdapters { tiers_tried } => {
                assert_eq!(tiers_tried.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_carries_adapter_context() {
        let mut inventory = three_adapter_inventory();
        inventory.adapters[1].faults.feature_probe = true;

        let err = bootstrap(inventory, "NPU").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeviceCreationFailed);
        assert_eq!(err.adapter(), Some((0, "Discrete NPU")));
    }

    #[test]
    fn test_config_drives_bootstrap() {
        let mut config = mock_config("GPU");
        config.accelerator.preferences = vec![AdapterPreference::Hardware, AdapterPreference::MinimumPower];

        let result = BootstrapPipeline::new(
            simulated(three_adapter_inventory()),
            BootstrapOptions::from(&config.accelerator),
        )
        .run()
        .unwrap();

        assert_eq!(result.report.selected_adapter, "Integrated GPU");
    }

    #[test]
    fn test_inventory_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, serde_json::to_string_pretty(&three_adapter_inventory()).unwrap()).unwrap();

        let inventory = PlatformInventory::load(&path).unwrap();
        assert_eq!(inventory, three_adapter_inventory());
    }

    #[test]
    fn test_attach_and_run_end_to_end() {
        let config = mock_config("NPU");
        let result = bootstrap(three_adapter_inventory(), &config.accelerator.adapter_name_filter).unwrap();
        let mut engine = RecordingEngine::new().with_output_len(4);
        let mut options = SessionOptions::from(&config.inference);

        attach_accelerator(&mut engine, &mut options, &result.device, Path::new("resnet50-v2-7.onnx")).unwrap();

        let registrations = engine.registrations();
        assert_eq!(registrations.len(), 1);
        match &registrations[0] {
            ProviderRegistration::Explicit { kind, binding } => {
                assert_eq!(*kind, ExecutionProviderKind::DirectMl);
                assert_eq!(binding.queue, result.device.queue().handle());
                assert_eq!(binding.ml_device, result.device.ml_device());
            }
            other => panic!("unexpected registration: {other:?}"),
        }

        let normalizer = StandardNormalizer::new(config.inference.input_name.clone());
        let image = RgbImage::filled(config.inference.input_width, config.inference.input_height, [124, 116, 104]);
        let tensor = normalizer
            .preprocess(&image, config.inference.input_width, config.inference.input_height)
            .unwrap();
        assert_eq!(tensor.shape, [1, 3, 224, 224]);

        let output = engine.run(&tensor).unwrap();
        assert_eq!(output.len(), 4);
        assert_eq!(engine.run_count(), 1);
    }

    #[test]
    fn test_engine_rejection_surfaces() {
        let result = bootstrap(three_adapter_inventory(), "NPU").unwrap();
        let mut engine = RecordingEngine::new().reject(ExecutionProviderKind::DirectMl);
        let mut options = SessionOptions::default();

        let err = attach_accelerator(&mut engine, &mut options, &result.device, Path::new("m.onnx")).unwrap_err();

        assert!(matches!(err, ProviderError::Engine(EngineError::ProviderRejected { .. })));
        assert!(engine.loaded_model().is_none());
    }

    #[tokio::test]
    async fn test_binding_shares_one_queue() {
        let sim = simulated(three_adapter_inventory());
        let binding = Arc::new(AcceleratorBinding::new(sim.clone(), BootstrapOptions::new("NPU")));

        let mut engines = Vec::new();
        for _ in 0..3 {
            let accel = binding.acquire().await.unwrap();
            let mut engine = RecordingEngine::new();
            let mut options = SessionOptions::default();
            attach_accelerator(&mut engine, &mut options, &accel, Path::new("m.onnx")).unwrap();
            engines.push(engine);
        }

        assert_eq!(sim.queue_count(), 1);
        let queues: Vec<_> = engines
            .iter()
            .map(|e| match &e.registrations()[0] {
                ProviderRegistration::Explicit { binding, .. } => binding.queue,
                other => panic!("unexpected registration: {other:?}"),
            })
            .collect();
        assert!(queues.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_binding_from_blocking_context() {
        let binding = AcceleratorBinding::new(simulated(core_compute_only_inventory()), BootstrapOptions::new("B"));

        let accel = tokio_test::block_on(binding.acquire()).unwrap();

        assert_eq!(accel.adapter_description(), "Legacy GPU B");
        assert_eq!(accel.queue_type(), QueueType::ComputeOnly);
    }
}
