//! 从实例 tag 还原结构化标签
//!
//! tag 是自由格式字符串，约定以 `key=value` 编码标签。只有配置过的 key 才会被提取，
//! 同一个 key 多次出现时以第一次为准（与注册中心返回的顺序相关）。

use exporter_common::config::LabelPolicy;

/// 解析过程中发现的问题，由调用方带上服务/实例上下文记录日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIssue {
    /// tag 中没有 `=`
    Malformed { tag: String },
    /// 已有值的标签再次出现，该次出现被忽略
    Duplicate { label: String, tag: String },
    /// 配置的标签在 tag 中不存在
    Missing { label: String },
}

impl TagIssue {
    /// 自监控指标中使用的类型名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::Duplicate { .. } => "duplicate",
            Self::Missing { .. } => "missing",
        }
    }
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOutcome {
    /// 与配置的标签名一一对应的值
    Labels(Vec<String>),
    /// 严格模式下缺少标签，跳过该实例
    Skip { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelResolution {
    pub outcome: LabelOutcome,
    pub issues: Vec<TagIssue>,
}

impl LabelResolution {
    /// 解析出的标签值；被跳过时为 `None`
    pub fn values(&self) -> Option<&[String]> {
        match &self.outcome {
            LabelOutcome::Labels(values) => Some(values),
            LabelOutcome::Skip { .. } => None,
        }
    }
}

/// 把 tag 列表解析为按 `label_names` 顺序排列的标签值
pub fn resolve_tag_labels(
    tags: &[String],
    label_names: &[String],
    policy: LabelPolicy,
) -> LabelResolution {
    let mut values = vec![String::new(); label_names.len()];
    let mut issues = Vec::new();

    for tag in tags {
        if tag.is_empty() {
            continue;
        }

        let Some((key, value)) = tag.split_once('=') else {
            issues.push(TagIssue::Malformed { tag: tag.clone() });
            continue;
        };

        let Some(index) = label_names.iter().position(|name| name == key) else {
            continue;
        };

        if !values[index].is_empty() {
            issues.push(TagIssue::Duplicate {
                label: key.to_string(),
                tag: tag.clone(),
            });
            continue;
        }

        values[index] = value.to_string();
    }

    let missing: Vec<String> = label_names
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name.clone())
        .collect();

    issues.extend(
        missing
            .iter()
            .map(|label| TagIssue::Missing { label: label.clone() }),
    );

    let outcome = if missing.is_empty() || policy == LabelPolicy::Lenient {
        LabelOutcome::Labels(values)
    } else {
        LabelOutcome::Skip { missing }
    };

    LabelResolution { outcome, issues }
}
