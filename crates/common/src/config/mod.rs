//! 统一配置管理
//!
//! 导出器的全部配置项都在这里定义。配置在启动时构建一次，之后只读，
//! 以值的形式传入采集器，采集过程中不再读取任何全局参数。

pub mod consul;
pub mod web;

pub use crate::config::consul::{ConsulConfig, LabelPolicy, LivenessProbe, is_valid_label_name};
pub use crate::config::web::WebConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 导出器主配置
///
/// 配置文件使用 TOML 格式，所有字段都有默认值，因此空文件也是合法配置。
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ExporterConfig {
    /// HTTP 暴露端配置
    #[serde(default)]
    pub web: WebConfig,

    /// Consul 注册中心配置
    #[serde(default)]
    pub consul: ConsulConfig,

    /// 可观测性配置（日志）
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,hyper=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关，output = "file" 时按天轮转
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录，output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

impl ExporterConfig {
    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(format!("Configuration file does not exist: {path_ref:?}").into());
        }

        if !path_ref.is_file() {
            return Err(format!("Path is not a valid file: {path_ref:?}").into());
        }

        let content = std::fs::read_to_string(path_ref)?;
        let config: ExporterConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 以 `Warning:` 开头的条目只是提示，其余条目会阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // 监听地址与路径
        if let Err(e) = self.web.socket_addr() {
            errors.push(format!(
                "Invalid listen address '{}': {e}",
                self.web.listen_address
            ));
        }
        if !self.web.telemetry_path.starts_with('/') {
            errors.push(format!(
                "Telemetry path '{}' must start with '/'",
                self.web.telemetry_path
            ));
        } else if self.web.telemetry_path == "/" {
            errors.push("Telemetry path cannot be '/', it is reserved for the landing page".to_string());
        } else if self.web.telemetry_path == "/health" {
            errors.push("Telemetry path cannot be '/health', it is reserved for the health endpoint".to_string());
        }
        if self.web.scrape_timeout_secs == 0 {
            errors.push("web.scrape_timeout_secs must be greater than 0".to_string());
        }

        // Consul 地址，与客户端使用同一套解析规则
        if let Err(e) = consul_api::Endpoint::parse(&self.consul.server) {
            errors.push(format!("Invalid Consul server address: {e}"));
        }

        if self.consul.timeout_secs == 0 {
            errors.push("consul.timeout_secs must be greater than 0".to_string());
        } else {
            if self.consul.timeout_secs >= 10 {
                errors.push(format!(
                    "Warning: consul.timeout_secs = {} is long, a hung registry call stalls the whole scrape",
                    self.consul.timeout_secs
                ));
            }
            if self.web.scrape_timeout_secs > 0
                && self.consul.timeout_secs >= self.web.scrape_timeout_secs
            {
                errors.push(format!(
                    "Warning: consul.timeout_secs ({}) is not shorter than web.scrape_timeout_secs ({})",
                    self.consul.timeout_secs, self.web.scrape_timeout_secs
                ));
            }
        }

        // tag 派生标签名
        let mut seen = HashSet::new();
        for tag in &self.consul.tags {
            if !is_valid_label_name(tag) {
                errors.push(format!("Invalid tag label name '{tag}'"));
            } else if !seen.insert(tag.as_str()) {
                errors.push(format!("Tag label '{tag}' is configured more than once"));
            }
        }

        // 过滤级别（EnvFilter 语法）
        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
