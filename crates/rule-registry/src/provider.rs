//! 观察提供者
//!
//! 把 (实例, 规则) 转换为只产生一个结果的惰性流。评估管道只消费这个流，
//! 不关心它在哪里执行。

use crate::error::{Result, RuleError};
use crate::outcome::Outcome;
use crate::rule::Rule;
use futures::stream::{self, BoxStream, StreamExt};
use registry_shared::config::ProviderKind;
use std::sync::Arc;

/// 单条规则的结果流
pub type RuleStream<P, F> = BoxStream<'static, Result<Outcome<P, F>>>;

/// 单规则结果流工厂
///
/// 返回的流必须是惰性的：在第一次被轮询之前不得执行规则。
pub trait ObservationProvider: Send + Sync + 'static {
    fn generate<T, P, F>(&self, instance: Arc<T>, rule: Arc<dyn Rule<T, P, F>>) -> RuleStream<P, F>
    where
        T: Send + Sync + 'static,
        P: Send + 'static,
        F: Send + 'static;
}

/// 内置提供者
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultObservationProvider {
    /// 在消费者所在任务上直接求值
    #[default]
    Inline,
    /// 在 tokio 阻塞线程池上求值，需要运行时
    Blocking,
}

impl From<ProviderKind> for DefaultObservationProvider {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Inline => Self::Inline,
            ProviderKind::Blocking => Self::Blocking,
        }
    }
}

impl ObservationProvider for DefaultObservationProvider {
    fn generate<T, P, F>(&self, instance: Arc<T>, rule: Arc<dyn Rule<T, P, F>>) -> RuleStream<P, F>
    where
        T: Send + Sync + 'static,
        P: Send + 'static,
        F: Send + 'static,
    {
        match self {
            Self::Inline => stream::once(async move { rule.evaluate(&*instance) }).boxed(),
            Self::Blocking => stream::once(async move {
                tokio::task::spawn_blocking(move || rule.evaluate(&*instance))
                    .await
                    .unwrap_or_else(|e| {
                        Err(RuleError::ExecutionError(format!("规则执行任务异常退出: {}", e)))
                    })
            })
            .boxed(),
        }
    }
}
