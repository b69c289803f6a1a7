//! 抓取编排
//!
//! 一次抓取按顺序执行，不在服务或实例之间并发。任何注册中心错误都不会向调用方抛出：
//! 存活探测失败输出 0，服务列表失败只输出存活指标，单个服务失败只跳过该服务。

use crate::checks::reduce_checks;
use crate::error::Result;
use crate::labels::{TagIssue, resolve_tag_labels};
use crate::schema::LabelSchema;
use crate::sink::{MetricDesc, MetricsSink, PrometheusSink};
use consul_api::{Instance, RegistryClient, RegistryError};
use exporter_common::config::{ConsulConfig, LabelPolicy, LivenessProbe};
use exporter_common::metrics::{INSTANCES_SKIPPED, REGISTRY_ERRORS, TAG_ISSUES};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const REGISTRY_UP_METRIC: &str = "consul_registry_up";
pub const INSTANCE_UP_METRIC: &str = "consul_service_instance_up";

/// 采集器配置，启动时构建，之后不再变化
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorConfig {
    /// 数据中心过滤，`None` 表示注册中心默认范围
    pub datacenter: Option<String>,
    /// 服务白名单，空表示每次抓取时发现全部服务
    pub services: Vec<String>,
    /// tag 派生标签名，按输出顺序
    pub tag_labels: Vec<String>,
    pub label_policy: LabelPolicy,
    pub liveness_probe: LivenessProbe,
}

impl From<&ConsulConfig> for CollectorConfig {
    fn from(consul: &ConsulConfig) -> Self {
        Self {
            datacenter: consul.datacenter().map(str::to_string),
            services: consul.services.clone(),
            tag_labels: consul.tags.clone(),
            label_policy: consul.label_policy,
            liveness_probe: consul.liveness_probe,
        }
    }
}

/// 一次抓取的统计，用于日志与测试
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub registry_up: bool,
    /// 服务列表请求失败，本次只输出了存活指标
    pub listing_failed: bool,
    pub services_fetched: usize,
    pub services_failed: usize,
    pub instances_emitted: usize,
    pub instances_skipped: usize,
}

pub struct ScrapeCollector {
    client: Arc<dyn RegistryClient>,
    datacenter: Option<String>,
    services: Vec<String>,
    label_policy: LabelPolicy,
    liveness_probe: LivenessProbe,
    schema: LabelSchema,
    registry_up: MetricDesc,
    instance_up: MetricDesc,
}

impl std::fmt::Debug for ScrapeCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeCollector")
            .field("registry", &self.client.address())
            .field("datacenter", &self.datacenter)
            .field("services", &self.services)
            .field("schema", &self.schema)
            .finish()
    }
}

impl ScrapeCollector {
    /// 构建采集器，标签名非法或重复时失败
    pub fn new(client: Arc<dyn RegistryClient>, config: CollectorConfig) -> Result<Self> {
        let schema = LabelSchema::new(&config.tag_labels)?;

        let mut seen = HashSet::new();
        let services = config
            .services
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();

        let registry_up = MetricDesc::new(
            REGISTRY_UP_METRIC,
            "Whether the Consul registry answered the liveness probe.",
            vec!["addr".to_string()],
        );
        let instance_up = MetricDesc::new(
            INSTANCE_UP_METRIC,
            "Health of a service instance according to its first non-membership check.",
            schema.names().to_vec(),
        );

        // 描述必须能被 prometheus 接受，否则每次抓取都会失败
        PrometheusSink::new(&[&registry_up, &instance_up])?;

        Ok(Self {
            client,
            datacenter: config.datacenter.filter(|dc| !dc.trim().is_empty()),
            services,
            label_policy: config.label_policy,
            liveness_probe: config.liveness_probe,
            schema,
            registry_up,
            instance_up,
        })
    }

    /// 本采集器会输出的两个指标描述
    pub fn descriptors(&self) -> [&MetricDesc; 2] {
        [&self.registry_up, &self.instance_up]
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    /// 执行一次抓取，把观测写入 `sink`
    ///
    /// 每次调用都重新从注册中心获取数据，不保留任何跨抓取状态。
    pub async fn collect<S>(&self, sink: &mut S) -> ScrapeSummary
    where
        S: MetricsSink + ?Sized,
    {
        let mut summary = ScrapeSummary::default();
        let dc = self.datacenter.as_deref();

        let services = match self.liveness_probe {
            LivenessProbe::Leader => {
                summary.registry_up = self.probe_leader().await;
                self.emit_registry_up(sink, summary.registry_up);

                if self.services.is_empty() {
                    self.list_services(dc).await
                } else {
                    Some(self.services.clone())
                }
            }
            LivenessProbe::Catalog => {
                let listed = self.list_services(dc).await;
                summary.registry_up = listed.is_some();
                self.emit_registry_up(sink, summary.registry_up);

                if self.services.is_empty() {
                    listed
                } else {
                    Some(self.services.clone())
                }
            }
        };

        let Some(services) = services else {
            summary.listing_failed = true;
            return summary;
        };

        for service in &services {
            let instances = match self.client.fetch_instances(service, dc).await {
                Ok(instances) => instances,
                Err(e) => {
                    warn!(
                        "Failed to fetch health of service {}: {}",
                        service,
                        describe(&e)
                    );
                    REGISTRY_ERRORS.with_label_values(&["health"]).inc();
                    summary.services_failed += 1;
                    continue;
                }
            };
            summary.services_fetched += 1;

            for instance in &instances {
                if self.emit_instance(sink, service, instance) {
                    summary.instances_emitted += 1;
                } else {
                    summary.instances_skipped += 1;
                }
            }
        }

        debug!("Scrape finished: {:?}", summary);
        summary
    }

    async fn probe_leader(&self) -> bool {
        match self.client.probe_liveness().await {
            Ok(leader) => {
                debug!("Registry {} leader: {}", self.client.address(), leader);
                true
            }
            Err(e) => {
                warn!(
                    "Registry {} liveness probe failed: {}",
                    self.client.address(),
                    describe(&e)
                );
                REGISTRY_ERRORS.with_label_values(&["liveness"]).inc();
                false
            }
        }
    }

    async fn list_services(&self, dc: Option<&str>) -> Option<Vec<String>> {
        match self.client.list_service_names(dc).await {
            Ok(names) => Some(names),
            Err(e) => {
                error!(
                    "Failed to list services from {}: {}",
                    self.client.address(),
                    describe(&e)
                );
                REGISTRY_ERRORS.with_label_values(&["catalog"]).inc();
                None
            }
        }
    }

    fn emit_registry_up<S>(&self, sink: &mut S, up: bool)
    where
        S: MetricsSink + ?Sized,
    {
        let value = if up { 1.0 } else { 0.0 };
        sink.observe(
            &self.registry_up,
            value,
            &[self.client.address().to_string()],
        );
    }

    /// 输出单个实例的 up 指标，返回是否输出
    fn emit_instance<S>(&self, sink: &mut S, service: &str, instance: &Instance) -> bool
    where
        S: MetricsSink + ?Sized,
    {
        let resolution =
            resolve_tag_labels(&instance.tags, self.schema.tag_labels(), self.label_policy);

        for issue in &resolution.issues {
            TAG_ISSUES.with_label_values(&[issue.kind()]).inc();
            match issue {
                TagIssue::Malformed { tag } => warn!(
                    "Malformed tag '{}' on {}/{} (node {}), expected key=value",
                    tag, service, instance.id, instance.node
                ),
                TagIssue::Duplicate { label, tag } => warn!(
                    "Label {} already defined on {}/{} (node {}), ignoring tag '{}'",
                    label, service, instance.id, instance.node, tag
                ),
                TagIssue::Missing { label } => match self.label_policy {
                    LabelPolicy::Strict => warn!(
                        "Label {} missing on {}/{} (node {}), skipping instance",
                        label, service, instance.id, instance.node
                    ),
                    LabelPolicy::Lenient => warn!(
                        "Label {} missing on {}/{} (node {}), using empty value",
                        label, service, instance.id, instance.node
                    ),
                },
            }
        }

        let Some(tag_values) = resolution.values() else {
            INSTANCES_SKIPPED.with_label_values(&["missing_label"]).inc();
            return false;
        };

        let Some(verdict) = reduce_checks(&instance.checks) else {
            debug!(
                "No service check on {}/{} (node {}), not reporting health",
                service, instance.id, instance.node
            );
            INSTANCES_SKIPPED.with_label_values(&["no_check"]).inc();
            return false;
        };

        if !verdict.up {
            warn!(
                "{}/{} (node {}): check {} ({}) is {}: {}",
                service,
                instance.id,
                instance.node,
                verdict.check.id,
                verdict.check.name,
                verdict.check.status,
                verdict.check.output.trim()
            );
        }

        let values = self.schema.values(instance, service, tag_values);
        sink.observe(&self.instance_up, verdict.value(), &values);
        true
    }
}

/// 超时单独说明，其余错误原样输出
fn describe(e: &RegistryError) -> String {
    if e.is_timeout() {
        format!("request timed out ({e})")
    } else {
        e.to_string()
    }
}
