//! 命令行界面定义
//!
//! 定义了主程序的命令行参数和选项。命令行参数覆盖配置文件中的同名项。
use clap::{Parser, Subcommand};
use exporter_common::config::{ExporterConfig, LabelPolicy, LivenessProbe};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "consul-exporter")]
#[command(version)]
#[command(about = "Prometheus exporter for the health of service instances registered in Consul")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Configuration file path (TOML, optional)
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Address to listen on for the web interface and telemetry
    #[arg(long = "web.listen-address", global = true)]
    pub(crate) listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", global = true)]
    pub(crate) telemetry_path: Option<String>,

    /// HTTP API address of a Consul agent or server
    #[arg(long = "consul.server", global = true)]
    pub(crate) server: Option<String>,

    /// Service to report on, repeatable (default: every registered service)
    #[arg(long = "consul.service", global = true)]
    pub(crate) services: Vec<String>,

    /// Tag key exported as a label, repeatable, in label order
    #[arg(long = "consul.tag", global = true)]
    pub(crate) tags: Vec<String>,

    /// Datacenter to query
    #[arg(long = "consul.dc", global = true)]
    pub(crate) datacenter: Option<String>,

    /// ACL token sent as X-Consul-Token
    #[arg(long = "consul.token", global = true, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub(crate) token: Option<String>,

    /// Timeout for each registry request, in seconds
    #[arg(long = "consul.timeout", global = true)]
    pub(crate) timeout_secs: Option<u64>,

    /// What to do with instances missing a tag label: strict or lenient
    #[arg(long = "consul.label-policy", global = true)]
    pub(crate) label_policy: Option<LabelPolicy>,

    /// How registry liveness is probed: leader or catalog
    #[arg(long = "consul.liveness-probe", global = true)]
    pub(crate) liveness_probe: Option<LivenessProbe>,

    /// Log filter directive (EnvFilter syntax)
    #[arg(long = "log.level", global = true)]
    pub(crate) log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Test configuration file
    Test {
        /// Configuration file path (optional, overrides --config)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },
}

impl Cli {
    /// 本次运行使用的配置文件路径
    pub(crate) fn config_path(&self) -> Option<&PathBuf> {
        match &self.command {
            Some(Commands::Test {
                config_file: Some(path),
            }) => Some(path),
            _ => self.config.as_ref(),
        }
    }

    /// 把命令行参数写入配置，未给出的参数保持文件中的值
    pub(crate) fn apply_overrides(&self, config: &mut ExporterConfig) {
        if let Some(addr) = &self.listen_address {
            config.web.listen_address = addr.clone();
        }
        if let Some(path) = &self.telemetry_path {
            config.web.telemetry_path = path.clone();
        }
        if let Some(server) = &self.server {
            config.consul.server = server.clone();
        }
        if !self.services.is_empty() {
            config.consul.services = self.services.clone();
        }
        if !self.tags.is_empty() {
            config.consul.tags = self.tags.clone();
        }
        if let Some(dc) = &self.datacenter {
            config.consul.datacenter = Some(dc.clone());
        }
        if let Some(token) = &self.token {
            config.consul.token = Some(token.clone());
        }
        if let Some(timeout) = self.timeout_secs {
            config.consul.timeout_secs = timeout;
        }
        if let Some(policy) = self.label_policy {
            config.consul.label_policy = policy;
        }
        if let Some(probe) = self.liveness_probe {
            config.consul.liveness_probe = probe;
        }
        if let Some(level) = &self.log_level {
            config.observability.filter_level = level.clone();
        }
    }
}
