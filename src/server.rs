//! HTTP 暴露端
//!
//! - `/`：静态首页，链接到指标路径
//! - 指标路径：每次请求执行一次抓取
//! - `/health`：进程存活检查

use crate::error::Result;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use collector::{CollectorConfig, PrometheusSink, ScrapeCollector};
use consul_api::{ClientConfig, ConsulClient};
use exporter_common::config::ExporterConfig;
use exporter_common::metrics::{self, SCRAPE_DURATION, SCRAPES_TOTAL};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// 路由共享状态，启动后只读
#[derive(Debug)]
pub struct AppState {
    collector: ScrapeCollector,
    telemetry_path: String,
    scrape_timeout: Duration,
}

impl AppState {
    pub fn new(
        collector: ScrapeCollector,
        telemetry_path: impl Into<String>,
        scrape_timeout: Duration,
    ) -> Self {
        Self {
            collector,
            telemetry_path: telemetry_path.into(),
            scrape_timeout,
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Result<Self> {
        Ok(Self::new(
            build_collector(config)?,
            config.web.telemetry_path.clone(),
            Duration::from_secs(config.web.scrape_timeout_secs),
        ))
    }

    pub fn collector(&self) -> &ScrapeCollector {
        &self.collector
    }
}

/// 按配置构建注册中心客户端和采集器
///
/// 地址无法解析、客户端无法创建或标签名非法时返回错误，进程不应继续启动。
pub fn build_collector(config: &ExporterConfig) -> Result<ScrapeCollector> {
    let client = ConsulClient::new(&ClientConfig {
        endpoint: config.consul.server.clone(),
        token: config.consul.token.clone(),
        timeout: Duration::from_secs(config.consul.timeout_secs),
    })?;
    info!("Consul registry endpoint: {}", client.endpoint().url());

    let collector = ScrapeCollector::new(Arc::new(client), CollectorConfig::from(&config.consul))?;
    Ok(collector)
}

/// 构建 HTTP 路由
pub fn build_router(state: Arc<AppState>) -> Router {
    let telemetry_path = state.telemetry_path.clone();

    Router::new()
        .route("/", get(landing_page))
        .route(&telemetry_path, get(metrics_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let path = escape_html(&state.telemetry_path);
    Html(format!(
        r#"<html>
<head><title>Consul Exporter</title></head>
<body>
<h1>Consul Exporter</h1>
<p><a href="{path}">Metrics</a></p>
</body>
</html>
"#
    ))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let [registry_up, instance_up] = state.collector.descriptors();
    let mut sink = match PrometheusSink::new(&[registry_up, instance_up]) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Failed to create metrics sink: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let timer = SCRAPE_DURATION.start_timer();
    match tokio::time::timeout(state.scrape_timeout, state.collector.collect(&mut sink)).await {
        Ok(summary) => {
            debug!(
                "Scrape done: {} instances, {} skipped, {} services failed",
                summary.instances_emitted, summary.instances_skipped, summary.services_failed
            );
            SCRAPES_TOTAL.with_label_values(&["completed"]).inc();
        }
        Err(_) => {
            warn!(
                "Scrape timed out after {:?}, returning partial results",
                state.scrape_timeout
            );
            SCRAPES_TOTAL.with_label_values(&["timed_out"]).inc();
        }
    }
    timer.observe_duration();

    let mut body = match sink.encode() {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };
    match metrics::export_metrics() {
        Ok(own) => body.push_str(&own),
        Err(e) => warn!("Failed to encode exporter metrics: {}", e),
    }

    ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response()
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
