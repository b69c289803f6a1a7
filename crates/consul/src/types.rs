//! 注册中心数据模型
//!
//! `Wire*` 类型对应 Consul `/v1/health/service/{name}` 的 JSON 结构，
//! 解码后转换为采集器使用的 [`Instance`] / [`Check`]。

use serde::Deserialize;
use std::fmt;

/// Consul agent 自带的集群成员检查，反映的是 gossip 成员状态而非服务健康
pub const MEMBERSHIP_CHECK_ID: &str = "serfHealth";

/// 健康检查状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
    Other(String),
}

impl CheckStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passing => "passing",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Other(s) => s,
        }
    }

    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Passing)
    }
}

impl From<String> for CheckStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "passing" => Self::Passing,
            "warning" => Self::Warning,
            "critical" => Self::Critical,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for CheckStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 实例上的一次健康检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub id: String,
    pub name: String,
    pub status: CheckStatus,
    /// 诊断输出，仅用于日志
    pub output: String,
}

impl Check {
    pub fn new(id: impl Into<String>, status: impl Into<CheckStatus>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            status: status.into(),
            output: String::new(),
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// 是否为集群成员检查
    pub fn is_membership(&self) -> bool {
        self.id == MEMBERSHIP_CHECK_ID
    }
}

/// 服务的一个运行实例
///
/// 每次抓取时从注册中心获取，抓取结束即丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instance {
    /// 节点名
    pub node: String,
    /// 节点地址
    pub node_address: String,
    /// 节点所在数据中心
    pub datacenter: String,
    /// 实例 ID（服务内唯一）
    pub id: String,
    /// 实例地址
    pub address: String,
    pub port: u16,
    /// 原始 tag 列表，保持注册中心返回的顺序
    pub tags: Vec<String>,
    /// 健康检查列表，保持注册中心返回的顺序
    pub checks: Vec<Check>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireServiceEntry {
    pub node: WireNode,
    pub service: WireService,
    #[serde(default, deserialize_with = "null_as_default")]
    pub checks: Vec<WireCheck>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireNode {
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub datacenter: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireService {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireCheck {
    #[serde(rename = "CheckID", default)]
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<WireCheck> for Check {
    fn from(wire: WireCheck) -> Self {
        Self {
            id: wire.check_id,
            name: wire.name,
            status: CheckStatus::from(wire.status),
            output: wire.output,
        }
    }
}

impl From<WireServiceEntry> for Instance {
    fn from(entry: WireServiceEntry) -> Self {
        Self {
            node: entry.node.node,
            node_address: entry.node.address,
            datacenter: entry.node.datacenter,
            id: entry.service.id,
            address: entry.service.address,
            port: entry.service.port,
            tags: entry.service.tags,
            checks: entry.checks.into_iter().map(Check::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTH_RESPONSE: &str = r#"[
      {
        "Node": {"ID": "40e4a748", "Node": "node-1", "Address": "10.1.10.12", "Datacenter": "dc1"},
        "Service": {
          "ID": "web-1", "Service": "web", "Tags": ["env=prod", "version=1.2"],
          "Address": "10.1.10.12", "Port": 8080, "Meta": {}
        },
        "Checks": [
          {"Node": "node-1", "CheckID": "serfHealth", "Name": "Serf Health Status",
           "Status": "passing", "Output": "Agent alive and reachable"},
          {"Node": "node-1", "CheckID": "service:web-1", "Name": "Service 'web' check",
           "Status": "critical", "Output": "connection refused"}
        ]
      },
      {
        "Node": {"Node": "node-2", "Address": "10.1.10.13", "Datacenter": "dc1"},
        "Service": {"ID": "web-2", "Service": "web", "Tags": null, "Address": "", "Port": 8080},
        "Checks": null
      }
    ]"#;

    #[test]
    fn test_decode_health_response() {
        let entries: Vec<WireServiceEntry> = serde_json::from_str(HEALTH_RESPONSE).unwrap();
        let instances: Vec<Instance> = entries.into_iter().map(Instance::from).collect();
        assert_eq!(instances.len(), 2);

        let first = &instances[0];
        assert_eq!(first.node, "node-1");
        assert_eq!(first.node_address, "10.1.10.12");
        assert_eq!(first.datacenter, "dc1");
        assert_eq!(first.id, "web-1");
        assert_eq!(first.port, 8080);
        assert_eq!(first.tags, vec!["env=prod", "version=1.2"]);
        assert_eq!(first.checks.len(), 2);
        assert!(first.checks[0].is_membership());
        assert_eq!(first.checks[1].status, CheckStatus::Critical);
        assert_eq!(first.checks[1].output, "connection refused");
        assert_eq!(first.checks[1].name, "Service 'web' check");

        let second = &instances[1];
        assert!(second.tags.is_empty());
        assert!(second.checks.is_empty());
        assert_eq!(second.address, "");
    }

    #[test]
    fn test_check_status_parsing() {
        assert_eq!(CheckStatus::from("passing"), CheckStatus::Passing);
        assert_eq!(CheckStatus::from("warning"), CheckStatus::Warning);
        assert_eq!(
            CheckStatus::from("maintenance"),
            CheckStatus::Other("maintenance".to_string())
        );
        assert_eq!(CheckStatus::from("maintenance").to_string(), "maintenance");
        assert!(!CheckStatus::from("Passing").is_passing());
    }
}
