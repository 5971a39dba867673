//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数、评估探针和测试数据生成器。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use metrics::{
    Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// 初始化测试日志（只初始化一次，输出到测试捕获的 writer）
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// 评估探针
///
/// 在多个规则之间共享的计数器，用于断言某条规则是否真的被评估过。
#[derive(Debug, Clone, Default)]
pub struct EvaluationProbe {
    hits: Arc<AtomicUsize>,
}

impl EvaluationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次评估
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// 已记录的评估次数
    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// 分组评估结束状态记录器
///
/// 只收集 `rule_group_applies_total` 的 status 标签，其余指标丢弃。
/// 通过 `metrics::with_local_recorder` 安装在当前线程上，测试之间互不干扰。
#[derive(Debug, Clone, Default)]
pub struct GroupApplyRecorder {
    statuses: Arc<Mutex<Vec<String>>>,
}

impl GroupApplyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在当前线程安装记录器并执行闭包
    pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self, f)
    }

    /// 按记录顺序返回的结束状态
    pub fn statuses(&self) -> Vec<String> {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

struct StatusCounter {
    status: String,
    statuses: Arc<Mutex<Vec<String>>>,
}

impl CounterFn for StatusCounter {
    fn increment(&self, value: u64) {
        let mut statuses = self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for _ in 0..value {
            statuses.push(self.status.clone());
        }
    }

    fn absolute(&self, _value: u64) {}
}

impl Recorder for GroupApplyRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        if key.name() != "rule_group_applies_total" {
            return Counter::noop();
        }
        let status = key
            .labels()
            .find(|label| label.key() == "status")
            .map(|label| label.value().to_string())
            .unwrap_or_default();
        Counter::from_arc(Arc::new(StatusCounter {
            status,
            statuses: Arc::clone(&self.statuses),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

// ==================== 测试数据生成器 ====================

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成购买订单数据
    pub fn order(amount: i64, is_vip: bool) -> Value {
        json!({
            "event": {
                "type": "PURCHASE",
                "timestamp": "2024-01-15T10:00:00Z"
            },
            "order": {
                "amount": amount,
                "currency": "CNY",
                "items": [
                    {"sku": "TICKET-001", "price": 500},
                    {"sku": "FOOD-001", "price": 80}
                ]
            },
            "user": {
                "id": "user-67890",
                "is_vip": is_vip,
                "tags": ["frequent_visitor", "annual_pass"]
            }
        })
    }

    /// 生成退款事件数据
    pub fn refund(amount: i64) -> Value {
        json!({
            "event": {
                "type": "REFUND",
                "timestamp": "2024-01-16T14:30:00Z"
            },
            "order": {
                "amount": amount,
                "currency": "CNY",
                "items": []
            },
            "user": {
                "id": "user-67890",
                "is_vip": false,
                "tags": []
            }
        })
    }
}
