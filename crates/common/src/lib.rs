//! consul-exporter 通用基础设施
//!
//! 提供配置模型（TOML 加载与校验）以及导出器自身的 Prometheus 监控指标。

pub mod config;
pub mod metrics;

pub use config::{ConsulConfig, ExporterConfig, LabelPolicy, LivenessProbe, WebConfig};
