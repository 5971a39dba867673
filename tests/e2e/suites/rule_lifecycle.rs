//! 规则生命周期测试套件
//!
//! 清空与重新注册规则时，进行中的评估与后续评估的行为。

use crate::data::*;
use crate::setup::TestEnvironment;
use futures::StreamExt;
use rule_registry::{Outcome, RuleKind};

#[tokio::test]
async fn test_reload_rules_after_reset() {
    let env = TestEnvironment::setup().unwrap();
    spending_tiers(&env.registry).unwrap();
    let before = env.registry.stats();

    env.registry.reset_rules();
    assert!(
        env.registry
            .apply_collect(SPENDING_TIERS, TransactionEvent::purchase(9000, MemberLevel::Platinum))
            .await
            .unwrap()
            .is_empty()
    );

    spending_tiers(&env.registry).unwrap();
    let after = env.registry.stats();
    assert_eq!(before, after);

    let outcomes = env
        .registry
        .apply_collect(SPENDING_TIERS, TransactionEvent::purchase(9000, MemberLevel::Platinum))
        .await
        .unwrap();
    assert!(outcomes.iter().all(Outcome::is_pass));

    // 注册序号在清空后继续递增
    let entries = env.registry.entries(SPENDING_TIERS);
    assert_eq!(entries.first().map(|e| e.seq), Some(4));
}

#[tokio::test]
async fn test_inflight_stream_keeps_snapshot() {
    let env = TestEnvironment::setup().unwrap();
    spending_tiers(&env.registry).unwrap();

    let mut stream = env
        .registry
        .apply(SPENDING_TIERS, TransactionEvent::purchase(1500, MemberLevel::Gold));
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, Outcome::Pass("达到 500 元档位".to_string()));

    env.registry.reset_rules();
    member_benefits(&env.registry).unwrap();

    let rest: Vec<_> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(
        rest,
        vec![
            Outcome::Pass("达到 1000 元档位".to_string()),
            Outcome::Fail("未达到 5000 元档位".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_entry_metadata() {
    let env = TestEnvironment::setup().unwrap();
    member_benefits(&env.registry).unwrap();

    let entries = env.registry.entries(MEMBER_BENEFITS);
    let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![RuleKind::Func, RuleKind::Func, RuleKind::Template]);
    assert_eq!(entries[2].label, "积分计算");
    assert!(entries[2].required_fields.is_empty());
    assert_eq!(
        entries[1].required_fields,
        vec!["member.registered_at".to_string(), "member.tags".to_string()]
    );
    assert!(entries.iter().all(|e| e.input_type.ends_with("TransactionEvent")));
}
