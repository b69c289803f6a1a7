//! 端到端测试：模拟 Consul + 导出器路由

use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use consul_exporter::{AppState, ExporterConfig, build_router};
use serde_json::{Value, json};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct Served {
    base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for Served {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(app: Router) -> Served {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read bound addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server exited");
    });
    Served {
        base_url: format!("http://{addr}"),
        handle,
    }
}

fn entry(service: &str, id: &str, port: u16, tags: &[&str], checks: Value) -> Value {
    json!({
        "Node": {"Node": "node-1", "Address": "10.0.0.11", "Datacenter": "dc1"},
        "Service": {"ID": id, "Service": service, "Tags": tags, "Address": "10.0.0.11", "Port": port},
        "Checks": checks
    })
}

async fn health(Path(service): Path<String>) -> Json<Value> {
    let serf = json!({"CheckID": "serfHealth", "Name": "Serf", "Status": "passing", "Output": ""});
    Json(match service.as_str() {
        "web" => json!([
            entry("web", "web-1", 8080, &["env=prod"], json!([serf,
                {"CheckID": "service:web-1", "Name": "http", "Status": "passing", "Output": "200 OK"}])),
            entry("web", "web-2", 8081, &["env=prod"], json!([serf,
                {"CheckID": "service:web-2", "Name": "http", "Status": "critical", "Output": "connection refused"}])),
        ]),
        "db" => json!([
            entry("db", "db-1", 5432, &["primary"], json!([serf,
                {"CheckID": "service:db-1", "Name": "tcp", "Status": "passing", "Output": ""}])),
        ]),
        _ => json!([entry(&service, &service, 8300, &[], json!([serf]))]),
    })
}

fn mock_consul() -> Router {
    Router::new()
        .route("/v1/status/leader", get(|| async { Json(json!("10.0.0.1:8300")) }))
        .route(
            "/v1/catalog/services",
            get(|| async { Json(json!({"consul": [], "web": ["env=prod"], "db": []})) }),
        )
        .route("/v1/health/service/{service}", get(health))
}

async fn start_exporter(config: &ExporterConfig) -> Served {
    let state = AppState::from_config(config).expect("exporter state");
    serve(build_router(Arc::new(state))).await
}

fn config_for(consul_url: &str) -> ExporterConfig {
    let mut config = ExporterConfig::default();
    config.consul.server = consul_url.to_string();
    config.consul.tags = vec!["env".to_string()];
    config.consul.timeout_secs = 2;
    config
}

async fn get_text(url: &str) -> (u16, Option<String>, String) {
    let response = reqwest::get(url).await.expect("request failed");
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.expect("body");
    (status, content_type, body)
}

fn sample_line<'a>(text: &'a str, metric: &str, needle: &str) -> Option<&'a str> {
    text.lines()
        .filter(|line| line.starts_with(&format!("{metric}{{")))
        .find(|line| line.contains(needle))
}

#[tokio::test]
#[serial]
async fn test_metrics_endpoint_reports_instances() {
    exporter_common::metrics::register_metrics().expect("self metrics");

    let consul = serve(mock_consul()).await;
    let exporter = start_exporter(&config_for(&consul.base_url)).await;

    let (status, content_type, body) = get_text(&format!("{}/metrics", exporter.base_url)).await;
    assert_eq!(status, 200);
    assert!(content_type.unwrap_or_default().starts_with("text/plain; version=0.0.4"));

    let up = sample_line(&body, "consul_registry_up", "addr=").expect("registry up sample");
    assert!(up.contains(&format!("addr=\"{}\"", consul.base_url)));
    assert!(up.ends_with(" 1"));

    let web1 = sample_line(&body, "consul_service_instance_up", "id=\"web-1\"").expect("web-1");
    assert!(web1.contains(r#"env="prod""#));
    assert!(web1.contains(r#"name="web""#));
    assert!(web1.contains(r#"port="8080""#));
    assert!(web1.contains(r#"dc="dc1""#));
    assert!(web1.ends_with(" 1"));

    let web2 = sample_line(&body, "consul_service_instance_up", "id=\"web-2\"").expect("web-2");
    assert!(web2.ends_with(" 0"));

    // db-1 没有 env 标签（strict），consul 只有 serfHealth
    assert!(sample_line(&body, "consul_service_instance_up", "id=\"db-1\"").is_none());
    assert!(sample_line(&body, "consul_service_instance_up", "name=\"consul\"").is_none());

    assert!(body.contains("consul_exporter_scrapes_total"));
    assert!(body.contains("consul_exporter_scrape_duration_seconds"));
}

#[tokio::test]
async fn test_unreachable_registry_reports_down() {
    // 绑定后立即释放，得到一个无人监听的端口
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut config = config_for(&dead);
    config.consul.timeout_secs = 1;
    let exporter = start_exporter(&config).await;

    let (status, _, body) = get_text(&format!("{}/metrics", exporter.base_url)).await;
    assert_eq!(status, 200);

    let up = sample_line(&body, "consul_registry_up", "addr=").expect("registry up sample");
    assert!(up.ends_with(" 0"));
    assert!(sample_line(&body, "consul_service_instance_up", "id=").is_none());
}

#[tokio::test]
async fn test_custom_telemetry_path_and_landing_page() {
    let consul = serve(mock_consul()).await;
    let mut config = config_for(&consul.base_url);
    config.web.telemetry_path = "/probe".to_string();
    let exporter = start_exporter(&config).await;

    let (status, content_type, body) = get_text(&format!("{}/", exporter.base_url)).await;
    assert_eq!(status, 200);
    assert!(content_type.unwrap_or_default().starts_with("text/html"));
    assert!(body.contains(r#"href="/probe""#));

    let (status, _, body) = get_text(&format!("{}/probe", exporter.base_url)).await;
    assert_eq!(status, 200);
    assert!(body.contains("consul_service_instance_up"));

    let (status, _, _) = get_text(&format!("{}/metrics", exporter.base_url)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_health_endpoint() {
    let consul = serve(mock_consul()).await;
    let exporter = start_exporter(&config_for(&consul.base_url)).await;

    let (status, _, body) = get_text(&format!("{}/health", exporter.base_url)).await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_scrape_timeout_returns_partial_output() {
    let slow = Router::new()
        .route("/v1/status/leader", get(|| async { Json(json!("10.0.0.1:8300")) }))
        .route(
            "/v1/catalog/services",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"web": []}))
            }),
        );
    let consul = serve(slow).await;

    let mut config = config_for(&consul.base_url);
    config.consul.timeout_secs = 10;
    config.web.scrape_timeout_secs = 1;
    let exporter = start_exporter(&config).await;

    let started = std::time::Instant::now();
    let (status, _, body) = get_text(&format!("{}/metrics", exporter.base_url)).await;
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(status, 200);

    let up = sample_line(&body, "consul_registry_up", "addr=").expect("registry up sample");
    assert!(up.ends_with(" 1"));
}
