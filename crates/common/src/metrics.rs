//! Prometheus 自监控指标模块
//!
//! 导出器自身的运行指标（抓取耗时、注册中心错误、被跳过的实例等）。
//! 注册中心状态本身的指标由每次抓取单独生成，不在这里。

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::Once;

static METRICS_INIT: Once = Once::new();

lazy_static! {
    /// 全局 Prometheus Registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// 单次抓取耗时（秒）
    pub static ref SCRAPE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("scrape_duration_seconds", "Duration of a registry scrape in seconds")
            .namespace("consul_exporter")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    ).unwrap();

    /// 抓取次数（按结果分组：completed / timed_out）
    pub static ref SCRAPES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("scrapes_total", "Total number of registry scrapes")
            .namespace("consul_exporter"),
        &["outcome"]
    ).unwrap();

    /// 注册中心请求失败次数（按操作分组：liveness / catalog / health）
    pub static ref REGISTRY_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("registry_errors_total", "Total number of failed registry calls")
            .namespace("consul_exporter"),
        &["operation"]
    ).unwrap();

    /// 被跳过的实例数（按原因分组：missing_label / no_check）
    pub static ref INSTANCES_SKIPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("instances_skipped_total", "Total number of instances that produced no up metric")
            .namespace("consul_exporter"),
        &["reason"]
    ).unwrap();

    /// tag 解析问题次数（按类型分组：malformed / duplicate / missing）
    pub static ref TAG_ISSUES: IntCounterVec = IntCounterVec::new(
        Opts::new("tag_issues_total", "Total number of tag parsing problems")
            .namespace("consul_exporter"),
        &["kind"]
    ).unwrap();
}

/// 注册所有指标到全局 Registry
///
/// This function is idempotent - calling it multiple times is safe.
/// Only the first call will actually register the metrics.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());

    METRICS_INIT.call_once(|| {
        let register_result = (|| {
            REGISTRY.register(Box::new(SCRAPE_DURATION.clone()))?;
            REGISTRY.register(Box::new(SCRAPES_TOTAL.clone()))?;
            REGISTRY.register(Box::new(REGISTRY_ERRORS.clone()))?;
            REGISTRY.register(Box::new(INSTANCES_SKIPPED.clone()))?;
            REGISTRY.register(Box::new(TAG_ISSUES.clone()))?;
            Ok::<(), prometheus::Error>(())
        })();

        if let Err(e) = register_result {
            result = Err(e);
        }
    });

    result
}

/// 导出 Prometheus 文本格式的自监控指标
pub fn export_metrics() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_register_metrics_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    #[serial]
    fn test_export_metrics() {
        let _ = register_metrics();

        REGISTRY_ERRORS.with_label_values(&["catalog"]).inc();

        let output = export_metrics().unwrap();
        assert!(
            output.contains("consul_exporter_registry_errors_total"),
            "Output should contain registry error counter. Output: {output}"
        );
        assert!(output.contains("operation=\"catalog\""));
    }
}
