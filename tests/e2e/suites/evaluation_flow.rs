//! 评估流程测试套件
//!
//! 验证按配置构建的注册中心在真实事件上的评估结果与顺序。

use crate::data::*;
use crate::setup::TestEnvironment;
use futures::StreamExt;
use registry_shared::config::ProviderKind;
use rule_registry::{Outcome, RuleError};

#[cfg(test)]
mod spending_tier_tests {
    use super::*;

    #[tokio::test]
    async fn test_config_selects_blocking_provider() {
        let env = TestEnvironment::setup().unwrap();
        assert_eq!(env.config.evaluation.provider, ProviderKind::Blocking);
        assert_eq!(env.config.service_name, "rule-registry-e2e");
    }

    /// 600 元购买只满足最低一档
    #[tokio::test]
    async fn test_purchase_matches_lowest_tier() {
        let env = TestEnvironment::setup().unwrap();
        spending_tiers(&env.registry).unwrap();

        let outcomes = env
            .registry
            .apply_collect(SPENDING_TIERS, TransactionEvent::purchase(600, MemberLevel::Silver))
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![
                Outcome::Pass("达到 500 元档位".to_string()),
                Outcome::Fail("未达到 1000 元档位".to_string()),
                Outcome::Fail("未达到 5000 元档位".to_string()),
            ]
        );
    }

    /// 退款事件不满足任何消费档位
    #[tokio::test]
    async fn test_refund_fails_all_tiers() {
        let env = TestEnvironment::setup().unwrap();
        spending_tiers(&env.registry).unwrap();

        let outcomes = env
            .registry
            .apply_collect(SPENDING_TIERS, TransactionEvent::refund(10_000))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(Outcome::is_fail));
    }
}

#[cfg(test)]
mod member_benefit_tests {
    use super::*;

    #[tokio::test]
    async fn test_formula_and_template_rules_in_order() {
        let env = TestEnvironment::setup().unwrap();
        member_benefits(&env.registry).unwrap();

        let outcomes = env
            .registry
            .apply_collect(MEMBER_BENEFITS, TransactionEvent::purchase(1200, MemberLevel::Gold))
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![
                Outcome::Pass("高级会员".to_string()),
                Outcome::Pass("老年卡用户".to_string()),
                Outcome::Pass("获得 120 积分".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_groups_do_not_leak() {
        let env = TestEnvironment::setup().unwrap();
        spending_tiers(&env.registry).unwrap();
        member_benefits(&env.registry).unwrap();

        assert_eq!(
            env.registry.group_keys(),
            vec![SPENDING_TIERS.to_string(), MEMBER_BENEFITS.to_string()]
        );
        assert_eq!(env.registry.group_len(SPENDING_TIERS), 3);
        assert_eq!(env.registry.group_len(MEMBER_BENEFITS), 3);

        let refund = env
            .registry
            .apply_collect(MEMBER_BENEFITS, TransactionEvent::refund(100))
            .await
            .unwrap();
        assert_eq!(refund.last(), Some(&Outcome::Fail("无积分".to_string())));
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_formula_over_configured_limit_is_rejected() {
        let env = TestEnvironment::with_config(
            r#"
            [evaluation]
            max_formula_length = 16
            "#,
        )
        .unwrap();

        let err = env
            .registry
            .register_func::<TransactionEvent>(
                SPENDING_TIERS,
                "event_type == 'PURCHASE' && amount >= 500",
                "p".into(),
                "f".into(),
            )
            .unwrap_err();

        assert!(err.is_registration_error());
        assert!(env.registry.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_instance_type_surfaces_error() {
        let env = TestEnvironment::setup().unwrap();
        spending_tiers(&env.registry).unwrap();

        let mut stream = env.registry.apply(SPENDING_TIERS, json!({"amount": 600}));
        let first = stream.next().await.unwrap();

        assert!(matches!(first, Err(RuleError::RuleTypeMismatch { .. })));
        assert!(stream.next().await.is_none());
    }
}
