//! Consul 注册中心相关配置

use serde::{Deserialize, Serialize};

/// 实例缺少已配置标签时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// 跳过该实例，不输出任何观测值
    #[default]
    Strict,
    /// 以空字符串作为标签值继续输出
    Lenient,
}

/// 注册中心存活探测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessProbe {
    /// 通过 `/v1/status/leader` 单独探测
    #[default]
    Leader,
    /// 由服务列表请求的成败推断
    Catalog,
}

impl std::str::FromStr for LabelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!(
                "unknown label policy '{other}', expected 'strict' or 'lenient'"
            )),
        }
    }
}

impl std::str::FromStr for LivenessProbe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leader" => Ok(Self::Leader),
            "catalog" => Ok(Self::Catalog),
            other => Err(format!(
                "unknown liveness probe '{other}', expected 'leader' or 'catalog'"
            )),
        }
    }
}

/// Consul 注册中心配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsulConfig {
    /// Consul server 或 agent 的 HTTP API 地址
    ///
    /// 协议可省略，默认使用 http；需要 HTTPS 时写成 `https://host:port`。
    #[serde(default = "default_server")]
    pub server: String,

    /// 数据中心过滤（可选）
    ///
    /// 为空时使用 agent 所在的默认数据中心。
    #[serde(default)]
    pub datacenter: Option<String>,

    /// 服务白名单
    ///
    /// 为空表示每次抓取时从 catalog 发现全部服务。
    #[serde(default)]
    pub services: Vec<String>,

    /// 从实例 tag（`key=value`）中提取的标签名，按配置顺序附加到 LabelSchema 之后
    #[serde(default)]
    pub tags: Vec<String>,

    /// ACL token（可选），以 `X-Consul-Token` 头发送
    #[serde(default)]
    pub token: Option<String>,

    /// 单个注册中心请求的超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub label_policy: LabelPolicy,

    #[serde(default)]
    pub liveness_probe: LivenessProbe,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            datacenter: None,
            services: Vec::new(),
            tags: Vec::new(),
            token: None,
            timeout_secs: default_timeout_secs(),
            label_policy: LabelPolicy::default(),
            liveness_probe: LivenessProbe::default(),
        }
    }
}

impl ConsulConfig {
    /// 非空的数据中心过滤值
    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter
            .as_deref()
            .map(str::trim)
            .filter(|dc| !dc.is_empty())
    }
}

fn default_server() -> String {
    "http://localhost:8500".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

/// Prometheus 标签名语法：`[a-zA-Z_][a-zA-Z0-9_]*`，且不能以 `__` 开头（保留给内部使用）
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name.starts_with("__") {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
