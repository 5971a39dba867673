//! 可观测性模块集成测试
//!
//! 测试日志初始化和指标记录的核心行为。

use registry_shared::config::ObservabilityConfig;
use registry_shared::observability;
use registry_shared::observability::metrics::{
    record_group_apply, record_rule_evaluation, record_rule_registration,
};

#[test]
fn test_init_is_single_shot() {
    let config = ObservabilityConfig {
        log_level: "debug".to_string(),
        log_format: "json".to_string(),
        metrics_enabled: true,
    };

    observability::init(&config).expect("first init should succeed");
    tracing::info!(group_key = "checkout", "log after init");

    // 全局 subscriber 只能安装一次
    assert!(observability::init(&config).is_err());
}

#[test]
fn test_metrics_without_recorder() {
    record_rule_registration("func", "error");
    record_rule_evaluation("checkout", "fail", 0.0005);
    record_group_apply("cancelled");
}
