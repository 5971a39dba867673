//! 规则场景
//!
//! 预置的规则分组，模拟业务方注册的规则集合。

use super::fixtures::TransactionEvent;
use anyhow::Result;
use rule_registry::{Outcome, RuleRegistry, TemplateRule};

/// 消费分级规则分组
pub const SPENDING_TIERS: &str = "spending_tiers";
/// 会员权益规则分组
pub const MEMBER_BENEFITS: &str = "member_benefits";

/// 注册 500/1000/5000 三档消费规则
pub fn spending_tiers(registry: &RuleRegistry) -> Result<()> {
    for threshold in [500, 1000, 5000] {
        registry.register_func::<TransactionEvent>(
            SPENDING_TIERS,
            &format!("event_type == 'PURCHASE' && amount >= {}", threshold),
            format!("达到 {} 元档位", threshold),
            format!("未达到 {} 元档位", threshold),
        )?;
    }
    Ok(())
}

/// 注册会员权益规则，包含公式规则和模板规则
pub fn member_benefits(registry: &RuleRegistry) -> Result<()> {
    registry.register_func::<TransactionEvent>(
        MEMBER_BENEFITS,
        "member.level in ['gold', 'platinum']",
        "高级会员".into(),
        "普通会员".into(),
    )?;
    registry.register_func::<TransactionEvent>(
        MEMBER_BENEFITS,
        "member.registered_at < '2024-01-01' && member.tags contains 'annual_pass'",
        "老年卡用户".into(),
        "新用户".into(),
    )?;
    registry.register_template(
        MEMBER_BENEFITS,
        TemplateRule::new("积分计算", |event: &TransactionEvent| {
            let points: i64 = event
                .items
                .iter()
                .map(|item| item.price * i64::from(item.quantity) / 10)
                .sum();
            Ok(if points > 0 {
                Outcome::Pass(format!("获得 {} 积分", points))
            } else {
                Outcome::Fail("无积分".to_string())
            })
        }),
    );
    Ok(())
}
