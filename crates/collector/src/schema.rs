//! `service_instance_up` 指标的标签顺序
//!
//! 六个固定身份标签在前，配置的 tag 标签按配置顺序在后。进程生命周期内不变。

use crate::error::{CollectorError, Result};
use consul_api::Instance;
use exporter_common::config::is_valid_label_name;
use std::collections::HashSet;

/// 固定身份标签：数据中心、节点地址、服务名、实例 ID、实例地址、端口
pub const FIXED_LABELS: [&str; 6] = ["dc", "node_addr", "name", "id", "addr", "port"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    names: Vec<String>,
    tag_labels: Vec<String>,
}

impl LabelSchema {
    pub fn new(tag_labels: &[String]) -> Result<Self> {
        let mut seen: HashSet<&str> = FIXED_LABELS.iter().copied().collect();

        for name in tag_labels {
            if !is_valid_label_name(name) {
                return Err(CollectorError::InvalidLabelName { name: name.clone() });
            }
            if !seen.insert(name.as_str()) {
                return Err(CollectorError::DuplicateLabelName { name: name.clone() });
            }
        }

        let names = FIXED_LABELS
            .iter()
            .map(|s| s.to_string())
            .chain(tag_labels.iter().cloned())
            .collect();

        Ok(Self {
            names,
            tag_labels: tag_labels.to_vec(),
        })
    }

    /// 完整标签名，按输出顺序
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 配置的 tag 派生标签名
    pub fn tag_labels(&self) -> &[String] {
        &self.tag_labels
    }

    /// 按 schema 顺序组装标签值
    ///
    /// `service` 使用抓取时请求的服务名，`tag_values` 必须与 [`Self::tag_labels`] 一一对应。
    pub fn values(&self, instance: &Instance, service: &str, tag_values: &[String]) -> Vec<String> {
        debug_assert_eq!(tag_values.len(), self.tag_labels.len());

        let mut values = Vec::with_capacity(self.names.len());
        values.push(instance.datacenter.clone());
        values.push(instance.node_address.clone());
        values.push(service.to_string());
        values.push(instance.id.clone());
        values.push(instance.address.clone());
        values.push(instance.port.to_string());
        values.extend(tag_values.iter().cloned());
        values
    }
}
