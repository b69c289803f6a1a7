//! 采集器错误类型
//!
//! 只在构建阶段出现；抓取过程中的错误全部降级为日志与存活指标。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    /// 标签名不符合 Prometheus 语法
    #[error("Invalid label name '{name}'")]
    InvalidLabelName { name: String },

    /// 标签名与固定标签重复或被配置多次
    #[error("Duplicate label name '{name}'")]
    DuplicateLabelName { name: String },

    /// 指标描述无法注册到 Prometheus
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, CollectorError>;
