//! 注册中心客户端错误类型

use thiserror::Error;

/// 注册中心访问错误
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 注册中心地址无法解析
    #[error("Invalid registry endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// HTTP 客户端构建失败
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// 传输层错误（连接失败、超时等）
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 注册中心返回非 2xx 状态
    #[error("Registry returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// 响应体解析失败
    #[error("Failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 注册中心客户端专用的 Result 类型
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}
