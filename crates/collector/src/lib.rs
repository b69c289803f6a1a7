//! 抓取时的转换流水线
//!
//! 每次抓取：探测注册中心存活 → 确定服务集合 → 拉取实例 →
//! 从 tag 还原标签 → 把健康检查归约为 up/down → 输出到 [`MetricsSink`]。

pub mod checks;
pub mod collector;
pub mod error;
pub mod labels;
pub mod schema;
pub mod sink;

pub use checks::{Verdict, reduce_checks};
pub use collector::{CollectorConfig, ScrapeCollector, ScrapeSummary};
pub use error::{CollectorError, Result};
pub use labels::{LabelOutcome, LabelResolution, TagIssue, resolve_tag_labels};
pub use schema::{FIXED_LABELS, LabelSchema};
pub use sink::{MetricDesc, MetricsSink, PrometheusSink, Sample};

pub use exporter_common::config::{LabelPolicy, LivenessProbe};
