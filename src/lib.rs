//! # consul-exporter
//!
//! 把 Consul 注册中心中的服务实例健康状态转换为 Prometheus 指标

pub mod error;
pub mod server;

pub use exporter_common::config::ExporterConfig;
pub use server::{AppState, build_collector, build_router};
