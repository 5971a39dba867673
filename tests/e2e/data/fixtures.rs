//! 测试事件数据

use serde::Serialize;

/// 会员等级
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberLevel {
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub id: String,
    pub level: MemberLevel,
    pub tags: Vec<String>,
    pub registered_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineItem {
    pub sku: String,
    pub price: i64,
    pub quantity: u32,
}

/// 交易事件
#[derive(Debug, Clone, Serialize)]
pub struct TransactionEvent {
    pub event_type: String,
    pub occurred_at: String,
    pub amount: i64,
    pub items: Vec<LineItem>,
    pub member: Member,
}

impl TransactionEvent {
    pub fn purchase(amount: i64, level: MemberLevel) -> Self {
        Self {
            event_type: "PURCHASE".to_string(),
            occurred_at: "2024-06-01T10:00:00Z".to_string(),
            amount,
            items: vec![
                LineItem {
                    sku: "TICKET-001".to_string(),
                    price: amount,
                    quantity: 1,
                },
            ],
            member: Member {
                id: "member-001".to_string(),
                level,
                tags: vec!["annual_pass".to_string()],
                registered_at: "2023-01-01".to_string(),
            },
        }
    }

    pub fn refund(amount: i64) -> Self {
        Self {
            event_type: "REFUND".to_string(),
            items: Vec::new(),
            ..Self::purchase(amount, MemberLevel::Silver)
        }
    }
}
