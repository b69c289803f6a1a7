//! consul-exporter 主程序
//!
//! 加载配置，构建注册中心客户端与采集器，然后以 HTTP 方式暴露 Prometheus 指标

mod cli;
mod observability;

use anyhow::Context;
use clap::Parser;
use consul_exporter::error::{Error, Result};
use consul_exporter::{AppState, ExporterConfig, build_collector, build_router};
use exporter_common::metrics;
use observability::init_observability;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ApplicationLauncher::load_config(&cli)?;

    match &cli.command {
        Some(Commands::Test { .. }) => ApplicationLauncher::test_config(&config),
        None => {
            // Create Tokio runtime（before running the application）
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_application(config))
        }
    }
}

impl ApplicationLauncher {
    /// 加载配置文件（可选）并应用命令行覆盖
    fn load_config(cli: &Cli) -> Result<ExporterConfig> {
        let mut config = match cli.config_path() {
            Some(path) => Self::read_config_file(path)?,
            None => {
                bootstrap_info!("No config file given, using built-in defaults");
                ExporterConfig::default()
            }
        };
        cli.apply_overrides(&mut config);
        Ok(config)
    }

    fn read_config_file(path: &Path) -> Result<ExporterConfig> {
        bootstrap_info!("📄 加载配置文件: {:?}", path);
        match ExporterConfig::from_file(path) {
            Ok(config) => {
                bootstrap_info!("✅ 配置加载成功");
                Ok(config)
            }
            Err(e) => {
                bootstrap_error!("❌ 配置加载失败: {}", e);
                Err(Error::Config(e))
            }
        }
    }

    /// 打印校验结果，存在非警告错误时返回 true
    fn report_validation(errors: &[String]) -> bool {
        bootstrap_error!("❌ 配置验证发现问题:");
        let mut has_critical_errors = false;
        for (i, err) in errors.iter().enumerate() {
            if err.starts_with("Warning:") {
                bootstrap_info!("  {}. ⚠️  {}", i + 1, err);
            } else {
                bootstrap_error!("  {}. ❌ {}", i + 1, err);
                has_critical_errors = true;
            }
        }
        has_critical_errors
    }

    /// 测试配置是否有效
    ///
    /// 除字段校验外还会构建客户端和标签结构，但不访问注册中心。
    fn test_config(config: &ExporterConfig) -> Result<()> {
        if let Err(errors) = config.validate()
            && Self::report_validation(&errors)
        {
            return Err(Error::service_validation("配置验证失败"));
        }

        let collector = build_collector(config).inspect_err(|e| {
            bootstrap_error!("❌ 采集器构建失败: {}", e);
        })?;

        bootstrap_info!("✅ 配置验证通过");
        bootstrap_info!("  - Consul: {}", config.consul.server);
        bootstrap_info!(
            "  - Labels: {}",
            collector.schema().names().join(", ")
        );
        bootstrap_info!(
            "  - Metrics: http://{}{}",
            config.web.listen_address,
            config.web.telemetry_path
        );
        Ok(())
    }

    /// 运行应用程序的主入口
    async fn run_application(config: ExporterConfig) -> Result<()> {
        if let Err(errors) = config.validate()
            && Self::report_validation(&errors)
        {
            return Err(Error::custom("配置验证失败，请修复上述错误"));
        }

        // 初始化日志
        let _observability_guard = init_observability(&config)?;

        metrics::register_metrics()?;

        let state = AppState::from_config(&config)?;
        info!("📊 Label schema: {}", state.collector().schema().names().join(", "));

        let addr = config
            .web
            .socket_addr()
            .map_err(|e| Error::service_startup(format!("Invalid listen address: {e}")))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!("🚀 consul-exporter 监听在: http://{}", addr);
        info!("🔧 可用的端点:");
        info!("  - http://{}{}", addr, config.web.telemetry_path);
        info!("  - http://{}/health", addr);

        axum::serve(listener, build_router(Arc::new(state)))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 服务已安全关闭");
        Ok(())
    }
}

/// 等待 Ctrl-C 信号
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到Ctrl-C信号，开始优雅关闭..."),
        Err(e) => error!("无法监听Ctrl-C信号: {}", e),
    }
}
