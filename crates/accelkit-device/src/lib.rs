//! AccelKit Device - 加速器引导模块
//!
//! 枚举支持机器学习的适配器，按偏好排序并选择，随后在选中的适配器上创建
//! 计算设备、命令队列和 ML 设备，交给推理引擎使用。

pub mod accelerated;
pub mod adapter;
pub mod binding;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod preprocess;
pub mod provider;
pub mod selector;
pub mod simulated;
pub mod tier;

pub use accelerated::*;
pub use adapter::*;
pub use binding::*;
pub use device::*;
pub use error::*;
pub use pipeline::*;
pub use platform::*;
pub use preprocess::*;
pub use provider::*;
pub use selector::*;
pub use simulated::*;
pub use tier::*;
