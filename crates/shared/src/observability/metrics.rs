//! 指标记录
//!
//! 基于 metrics crate 门面记录注册与评估指标。未安装 recorder 时所有调用都是空操作。

/// 注册指标描述信息
pub fn describe_metrics() {
    metrics::describe_counter!(
        "rule_registrations_total",
        "Total number of rule registrations"
    );
    metrics::describe_counter!("rule_evaluations_total", "Total number of rule evaluations");
    metrics::describe_histogram!(
        "rule_evaluation_duration_seconds",
        "Rule evaluation duration in seconds"
    );
    metrics::describe_counter!(
        "rule_group_applies_total",
        "Total number of group evaluation streams"
    );
}

/// 记录规则注册
#[inline]
pub fn record_rule_registration(kind: &str, status: &str) {
    metrics::counter!(
        "rule_registrations_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录单条规则评估
#[inline]
pub fn record_rule_evaluation(group: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "rule_evaluations_total",
        "group" => group.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!("rule_evaluation_duration_seconds").record(duration_secs);
}

/// 记录分组评估流的结束状态
#[inline]
pub fn record_group_apply(status: &str) {
    metrics::counter!("rule_group_applies_total", "status" => status.to_string()).increment(1);
}
