//! 把实例的多个健康检查归约为单个 up/down 信号

use consul_api::Check;

/// 归约结果：决定性的那个检查及其结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict<'a> {
    pub check: &'a Check,
    pub up: bool,
}

impl Verdict<'_> {
    pub fn value(&self) -> f64 {
        if self.up { 1.0 } else { 0.0 }
    }
}

/// 取第一个非集群成员检查作为结论，不做聚合
///
/// 只有成员检查（或没有检查）时返回 `None`，此时不对实例健康做任何断言。
pub fn reduce_checks(checks: &[Check]) -> Option<Verdict<'_>> {
    checks
        .iter()
        .find(|check| !check.is_membership())
        .map(|check| Verdict {
            check,
            up: check.status.is_passing(),
        })
}
