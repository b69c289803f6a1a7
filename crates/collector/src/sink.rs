//! 指标输出端
//!
//! 采集器每次抓取产生一串 (描述, 值, 有序标签值) 观测，由 [`MetricsSink`] 消费。
//! [`PrometheusSink`] 每次抓取新建一个，不与其他抓取共享缓冲。

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tracing::warn;

/// 指标描述：名称、帮助文本、有序标签名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl MetricDesc {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names,
        }
    }
}

/// 观测值的消费端
pub trait MetricsSink {
    /// `label_values` 与 `desc.label_names` 顺序一致
    fn observe(&mut self, desc: &MetricDesc, value: f64, label_values: &[String]);
}

/// 一条已记录的观测
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    pub labels: Vec<(String, String)>,
}

impl Sample {
    /// 按标签名取值
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl MetricsSink for Vec<Sample> {
    fn observe(&mut self, desc: &MetricDesc, value: f64, label_values: &[String]) {
        self.push(Sample {
            name: desc.name.clone(),
            value,
            labels: desc
                .label_names
                .iter()
                .cloned()
                .zip(label_values.iter().cloned())
                .collect(),
        });
    }
}

/// 基于 `prometheus` crate 的输出端，渲染为文本格式
pub struct PrometheusSink {
    registry: Registry,
    gauges: HashMap<String, GaugeVec>,
}

impl PrometheusSink {
    /// 为给定的描述创建 gauge 并注册到一个新的 Registry
    pub fn new(descriptors: &[&MetricDesc]) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let mut gauges = HashMap::with_capacity(descriptors.len());

        for desc in descriptors {
            let labels: Vec<&str> = desc.label_names.iter().map(String::as_str).collect();
            let gauge = GaugeVec::new(Opts::new(desc.name.clone(), desc.help.clone()), &labels)?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(desc.name.clone(), gauge);
        }

        Ok(Self { registry, gauges })
    }

    /// 当前收集到的指标族
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// 渲染为 Prometheus 文本格式
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsSink for PrometheusSink {
    fn observe(&mut self, desc: &MetricDesc, value: f64, label_values: &[String]) {
        let Some(gauge) = self.gauges.get(&desc.name) else {
            warn!("Metric '{}' was not described to this sink, dropping observation", desc.name);
            return;
        };

        let values: Vec<&str> = label_values.iter().map(String::as_str).collect();
        match gauge.get_metric_with_label_values(&values) {
            Ok(metric) => metric.set(value),
            Err(e) => warn!("Failed to record '{}': {}", desc.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up_desc() -> MetricDesc {
        MetricDesc::new(
            "consul_service_instance_up",
            "instance health",
            vec!["name".to_string(), "id".to_string()],
        )
    }

    #[test]
    fn test_vec_sink_records_labels_in_order() {
        let desc = up_desc();
        let mut sink: Vec<Sample> = Vec::new();
        sink.observe(&desc, 1.0, &["web".to_string(), "web-1".to_string()]);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].label("name"), Some("web"));
        assert_eq!(sink[0].label("id"), Some("web-1"));
        assert_eq!(sink[0].label("dc"), None);
    }

    #[test]
    fn test_prometheus_sink_encodes_text() {
        let desc = up_desc();
        let mut sink = PrometheusSink::new(&[&desc]).unwrap();
        sink.observe(&desc, 1.0, &["web".to_string(), "web-1".to_string()]);
        sink.observe(&desc, 0.0, &["web".to_string(), "web-2".to_string()]);

        let text = sink.encode().unwrap();
        assert!(text.contains("# HELP consul_service_instance_up instance health"));
        assert!(text.contains("# TYPE consul_service_instance_up gauge"));

        let line_for = |id: &str| {
            text.lines()
                .find(|line| line.contains(&format!("id=\"{id}\"")))
                .unwrap_or_else(|| panic!("no sample for {id} in:\n{text}"))
                .to_string()
        };
        let first = line_for("web-1");
        assert!(first.contains(r#"name="web""#));
        assert!(first.ends_with(" 1"));
        assert!(line_for("web-2").ends_with(" 0"));
    }

    #[test]
    fn test_prometheus_sink_drops_bad_observations() {
        let desc = up_desc();
        let mut sink = PrometheusSink::new(&[&desc]).unwrap();

        // 标签数量不匹配
        sink.observe(&desc, 1.0, &["web".to_string()]);
        // 未描述的指标
        let other = MetricDesc::new("other", "other", vec![]);
        sink.observe(&other, 1.0, &[]);

        assert!(sink.gather().iter().all(|family| family.get_metric().is_empty()));
    }

    #[test]
    fn test_prometheus_sink_rejects_invalid_desc() {
        let desc = MetricDesc::new("bad-name", "bad", vec![]);
        assert!(PrometheusSink::new(&[&desc]).is_err());
    }
}
