use serde::{Deserialize, Serialize};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// HTTP 暴露端配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebConfig {
    /// 监听地址
    ///
    /// 接受 `ip:port` 形式；省略主机部分（如 `:9111`）表示监听所有接口。
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// 指标暴露路径
    ///
    /// Prometheus 抓取的路径，必须以 `/` 开头且不能是根路径（根路径用于首页）。
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,

    /// 单次抓取的总超时（秒）
    ///
    /// 超时后放弃尚未完成的注册中心请求，已写入的观测值照常输出。
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            telemetry_path: default_telemetry_path(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
        }
    }
}

impl WebConfig {
    /// 解析监听地址为 `SocketAddr`
    ///
    /// 主机部分可以是主机名（如 `localhost:9111`），取解析结果的第一个地址。
    pub fn socket_addr(&self) -> io::Result<SocketAddr> {
        let raw = self.listen_address.trim();
        let candidate = if raw.starts_with(':') {
            format!("0.0.0.0{raw}")
        } else {
            raw.to_string()
        };

        candidate.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("'{raw}' did not resolve to any address"),
            )
        })
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:9111".to_string()
}

fn default_telemetry_path() -> String {
    "/metrics".to_string()
}

fn default_scrape_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_with_host() {
        let web = WebConfig {
            listen_address: "127.0.0.1:9200".to_string(),
            ..Default::default()
        };
        assert_eq!(web.socket_addr().unwrap().port(), 9200);
    }

    #[test]
    fn test_socket_addr_port_only() {
        let web = WebConfig {
            listen_address: ":9111".to_string(),
            ..Default::default()
        };
        let addr = web.socket_addr().unwrap();
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 9111);
    }

    #[test]
    fn test_socket_addr_hostname() {
        let web = WebConfig {
            listen_address: "localhost:9111".to_string(),
            ..Default::default()
        };
        let addr = web.socket_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9111);
    }

    #[test]
    fn test_socket_addr_invalid() {
        let web = WebConfig {
            listen_address: "not-an-address".to_string(),
            ..Default::default()
        };
        assert!(web.socket_addr().is_err());
    }
}
