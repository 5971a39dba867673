//! 分组评估管道
//!
//! 把同一分组内各条规则的单结果流按注册顺序首尾相接。前一条规则的流结束后
//! 才会向提供者请求下一条规则的流，因此消费者丢弃流之后不会再有规则被评估。

use crate::entry::RuleEntry;
use crate::error::RuleError;
use crate::provider::{ObservationProvider, RuleStream};
use futures::stream::{self, StreamExt};
use registry_shared::observability::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

struct Concat<T, P, F, O> {
    group_key: String,
    pending: std::vec::IntoIter<RuleEntry>,
    current: Option<(RuleStream<P, F>, Instant)>,
    instance: Arc<T>,
    provider: Arc<O>,
    emitted: usize,
    in_flight: bool,
    finished: bool,
}

impl<T, P, F, O> Drop for Concat<T, P, F, O> {
    fn drop(&mut self) {
        // 仍有规则未评估或正在评估时被丢弃，剩余规则不再评估
        if !self.finished && (self.in_flight || !self.pending.as_slice().is_empty()) {
            metrics::record_group_apply("cancelled");
            debug!(
                group_key = %self.group_key,
                emitted = self.emitted,
                skipped = self.pending.len(),
                "分组评估已取消"
            );
        }
    }
}

/// 按顺序串联分组快照中的规则
pub(crate) fn concat<T, P, F, O>(
    group_key: String,
    entries: Vec<RuleEntry>,
    instance: Arc<T>,
    provider: Arc<O>,
) -> RuleStream<P, F>
where
    T: Send + Sync + 'static,
    P: Send + 'static,
    F: Send + 'static,
    O: ObservationProvider,
{
    let state = Concat {
        group_key,
        pending: entries.into_iter(),
        current: None,
        instance,
        provider,
        emitted: 0,
        in_flight: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some((mut rule_stream, started)) = state.current.take() {
                state.in_flight = true;
                let next = rule_stream.next().await;
                state.in_flight = false;
                match next {
                    Some(Ok(outcome)) => {
                        metrics::record_rule_evaluation(
                            &state.group_key,
                            outcome.label(),
                            started.elapsed().as_secs_f64(),
                        );
                        debug!(
                            group_key = %state.group_key,
                            position = state.emitted,
                            outcome = outcome.label(),
                            "规则评估完成"
                        );
                        state.emitted += 1;
                        state.current = Some((rule_stream, started));
                        return Some((Ok(outcome), state));
                    }
                    Some(Err(e)) => {
                        metrics::record_rule_evaluation(
                            &state.group_key,
                            "error",
                            started.elapsed().as_secs_f64(),
                        );
                        metrics::record_group_apply("failed");
                        warn!(
                            group_key = %state.group_key,
                            position = state.emitted,
                            error = %e,
                            "规则评估失败，终止分组评估"
                        );
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                    // 当前规则的流已结束，转到下一条
                    None => {}
                }
            }

            let Some(entry) = state.pending.next() else {
                metrics::record_group_apply("completed");
                debug!(
                    group_key = %state.group_key,
                    emitted = state.emitted,
                    "分组评估完成"
                );
                return None;
            };

            match entry.rule.downcast::<T, P, F>() {
                Some(rule) => {
                    let rule_stream = state.provider.generate(Arc::clone(&state.instance), rule);
                    state.current = Some((rule_stream, Instant::now()));
                }
                None => {
                    let err = RuleError::RuleTypeMismatch {
                        group_key: entry.group_key.clone(),
                        registered: entry.rule.input_type(),
                        requested: std::any::type_name::<T>(),
                    };
                    metrics::record_group_apply("type_mismatch");
                    warn!(
                        group_key = %state.group_key,
                        seq = entry.seq,
                        error = %err,
                        "规则类型不匹配，终止分组评估"
                    );
                    state.finished = true;
                    return Some((Err(err), state));
                }
            }
        }
    })
    .boxed()
}
