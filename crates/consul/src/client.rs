//! Consul HTTP 客户端

use crate::error::{RegistryError, Result};
use crate::types::{Instance, WireServiceEntry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 注册中心访问接口
///
/// 采集器只依赖这个 trait，测试中可以替换为内存实现。
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// 探测注册中心是否存活，成功时返回当前 leader 地址（可能为空）
    async fn probe_liveness(&self) -> Result<String>;

    /// 列出全部服务名
    async fn list_service_names(&self, datacenter: Option<&str>) -> Result<Vec<String>>;

    /// 获取某个服务的实例及其健康检查，不做健康过滤
    async fn fetch_instances(&self, service: &str, datacenter: Option<&str>)
    -> Result<Vec<Instance>>;

    /// 用于 `addr` 标签的注册中心地址
    fn address(&self) -> &str;
}

/// 解析后的注册中心地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    url: Url,
}

impl Endpoint {
    /// 解析注册中心地址
    ///
    /// 没有协议前缀时默认 http，只接受 http / https。
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::invalid_endpoint(raw, "address is empty"));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let url = Url::parse(&candidate)
            .map_err(|e| RegistryError::invalid_endpoint(raw, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegistryError::invalid_endpoint(
                raw,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().is_none() {
            return Err(RegistryError::invalid_endpoint(raw, "missing host"));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            url,
        })
    }

    /// 运维人员配置的原始地址
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 在基础地址后追加路径段（每段单独做百分号编码）
    pub fn join(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| RegistryError::invalid_endpoint(&self.raw, "cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Consul 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Consul HTTP API 地址，例如 "localhost:8500" 或 "https://consul.example.com"
    pub endpoint: String,

    /// ACL token（可选）
    pub token: Option<String>,

    /// 单个请求的超时时间
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8500".to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// 基于 Consul HTTP API 的注册中心客户端
#[derive(Debug, Clone)]
pub struct ConsulClient {
    endpoint: Endpoint,
    client: reqwest::Client,
    token: Option<String>,
}

impl ConsulClient {
    /// 创建新的 Consul 客户端
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RegistryError::ClientBuild(e.to_string()))?;

        Ok(Self {
            endpoint,
            client,
            token: config
                .token
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, datacenter: Option<&str>) -> Result<T> {
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(dc) = datacenter {
            request = request.query(&[("dc", dc)]);
        }
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status,
                body: body.trim().to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn probe_liveness(&self) -> Result<String> {
        let url = self.endpoint.join(&["v1", "status", "leader"])?;
        self.get_json(url, None).await
    }

    async fn list_service_names(&self, datacenter: Option<&str>) -> Result<Vec<String>> {
        let url = self.endpoint.join(&["v1", "catalog", "services"])?;
        let services: HashMap<String, serde_json::Value> = self.get_json(url, datacenter).await?;
        Ok(services.into_keys().collect())
    }

    async fn fetch_instances(
        &self,
        service: &str,
        datacenter: Option<&str>,
    ) -> Result<Vec<Instance>> {
        let url = self.endpoint.join(&["v1", "health", "service", service])?;
        let entries: Vec<WireServiceEntry> = self.get_json(url, datacenter).await?;
        Ok(entries.into_iter().map(Instance::from).collect())
    }

    fn address(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_to_http() {
        let endpoint = Endpoint::parse("localhost:8500").unwrap();
        assert_eq!(endpoint.url().scheme(), "http");
        assert_eq!(endpoint.url().host_str(), Some("localhost"));
        assert_eq!(endpoint.url().port(), Some(8500));
        assert_eq!(endpoint.as_str(), "localhost:8500");
    }

    #[test]
    fn test_endpoint_keeps_https() {
        let endpoint = Endpoint::parse("https://consul.example.com").unwrap();
        assert_eq!(endpoint.url().scheme(), "https");
        assert_eq!(endpoint.to_string(), "https://consul.example.com");
    }

    #[test]
    fn test_endpoint_rejects_invalid() {
        assert!(Endpoint::parse("").is_err());
        assert!(Endpoint::parse("ftp://consul:21").is_err());
        assert!(Endpoint::parse("http://").is_err());
        assert!(Endpoint::parse("http://bad host:8500").is_err());
    }

    #[test]
    fn test_endpoint_join_encodes_segments() {
        let endpoint = Endpoint::parse("http://127.0.0.1:8500/").unwrap();
        let url = endpoint
            .join(&["v1", "health", "service", "web api/v2"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8500/v1/health/service/web%20api%2Fv2"
        );
    }

    #[test]
    fn test_endpoint_join_with_base_path() {
        let endpoint = Endpoint::parse("http://gateway/consul").unwrap();
        let url = endpoint.join(&["v1", "status", "leader"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway/consul/v1/status/leader");
    }

    #[test]
    fn test_client_creation() {
        let config = ClientConfig {
            endpoint: "127.0.0.1:8500".to_string(),
            token: Some("  ".to_string()),
            timeout: Duration::from_secs(2),
        };

        let client = ConsulClient::new(&config).unwrap();
        assert_eq!(client.address(), "127.0.0.1:8500");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_client_creation_invalid_endpoint() {
        let config = ClientConfig {
            endpoint: "gopher://consul".to_string(),
            ..Default::default()
        };
        let err = ConsulClient::new(&config).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidEndpoint { .. }));
    }
}
