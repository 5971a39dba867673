//! 并发测试套件
//!
//! 多线程注册、多任务并发评估以及取消。

use crate::data::*;
use crate::setup::TestEnvironment;
use futures::StreamExt;
use futures::future::join_all;
use registry_shared::test_utils::EvaluationProbe;
use rule_registry::{Outcome, TemplateRule};
use std::thread;

#[tokio::test]
async fn test_concurrent_apply_on_shared_registry() {
    let env = TestEnvironment::setup().unwrap();
    spending_tiers(&env.registry).unwrap();

    let tasks = (0..16).map(|i| {
        let registry = env.registry.clone();
        tokio::spawn(async move {
            let amount = if i % 2 == 0 { 700 } else { 7000 };
            registry
                .apply_collect(SPENDING_TIERS, TransactionEvent::purchase(amount, MemberLevel::Silver))
                .await
                .map(|outcomes| (amount, outcomes))
        })
    });

    for joined in join_all(tasks).await {
        let (amount, outcomes) = joined.unwrap().unwrap();
        let passed = outcomes.iter().filter(|o| o.is_pass()).count();
        match amount {
            700 => assert_eq!(passed, 1),
            _ => assert_eq!(passed, 3),
        }
        assert_eq!(outcomes.len(), 3);
    }
}

#[tokio::test]
async fn test_registration_from_many_threads() {
    let env = TestEnvironment::setup().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = env.registry.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    registry
                        .register_func::<TransactionEvent>(
                            "bulk",
                            &format!("amount > {}", t * 100 + i),
                            format!("{}-{}", t, i),
                            "f".into(),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(env.registry.group_len("bulk"), 100);
    let outcomes = env
        .registry
        .apply_collect("bulk", TransactionEvent::purchase(10_000, MemberLevel::Gold))
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 100);
    assert!(outcomes.iter().all(Outcome::is_pass));
}

#[tokio::test]
async fn test_cancel_midway_on_blocking_provider() {
    let env = TestEnvironment::setup().unwrap();
    let probe = EvaluationProbe::new();

    for i in 0..6 {
        let counter = probe.clone();
        env.registry.register_template(
            "audit",
            TemplateRule::new(format!("audit-{}", i), move |_: &TransactionEvent| {
                counter.hit();
                Ok(Outcome::Pass(i.to_string()))
            }),
        );
    }

    let taken: Vec<_> = env
        .registry
        .apply("audit", TransactionEvent::purchase(100, MemberLevel::Silver))
        .take(2)
        .collect()
        .await;

    assert_eq!(taken.len(), 2);
    assert_eq!(probe.count(), 2);
}
