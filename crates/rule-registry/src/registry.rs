//! 规则注册中心
//!
//! 所有条目保存在一个按注册顺序排列的列表中，由单把互斥锁保护。注册、清空以及
//! 评估前的分组快照都在这把锁内完成，规则的实际评估发生在锁外。

use crate::compiler::ExpressionCompiler;
use crate::entry::{EntryInfo, ErasedRule, RuleEntry, RuleKind};
use crate::error::Result;
use crate::formula::FormulaParser;
use crate::outcome::Outcome;
use crate::pipeline;
use crate::provider::{DefaultObservationProvider, ObservationProvider, RuleStream};
use crate::rule::{FuncRule, Rule};
use chrono::Utc;
use futures::TryStreamExt;
use parking_lot::Mutex;
use registry_shared::config::EvaluationConfig;
use registry_shared::observability::metrics;
use serde::Serialize;
use std::any::type_name;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Default)]
struct RegistryState {
    entries: Vec<RuleEntry>,
    next_seq: u64,
}

impl RegistryState {
    fn push(
        &mut self,
        group_key: String,
        kind: RuleKind,
        label: String,
        required_fields: Vec<String>,
        rule: ErasedRule,
    ) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.entries.push(RuleEntry {
            seq,
            group_key,
            kind,
            label,
            required_fields,
            registered_at: Utc::now(),
            rule,
        });
        seq
    }

    fn group(&self, group_key: &str) -> impl Iterator<Item = &RuleEntry> {
        self.entries.iter().filter(move |e| e.group_key == group_key)
    }
}

/// 规则注册中心
///
/// `P`、`F` 是通过与失败结果的载荷类型，`O` 决定单条规则在哪里执行。
/// 克隆得到的句柄共享同一份规则列表。
pub struct RuleRegistry<P = String, F = String, O = DefaultObservationProvider> {
    state: Arc<Mutex<RegistryState>>,
    parser: FormulaParser,
    compiler: Arc<ExpressionCompiler>,
    provider: Arc<O>,
    _payload: PhantomData<fn() -> (P, F)>,
}

impl<P, F, O> Clone for RuleRegistry<P, F, O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            parser: self.parser.clone(),
            compiler: Arc::clone(&self.compiler),
            provider: Arc::clone(&self.provider),
            _payload: PhantomData,
        }
    }
}

impl<P, F> RuleRegistry<P, F, DefaultObservationProvider> {
    /// 创建使用内联提供者的注册中心
    pub fn new() -> Self {
        Self::with_provider(DefaultObservationProvider::Inline)
    }

    /// 根据评估配置创建
    pub fn from_config(config: &EvaluationConfig) -> Self {
        let mut registry = Self::with_provider(config.provider.into());
        registry.parser = FormulaParser::with_max_length(config.max_formula_length)
            .max_depth(config.max_nesting_depth);
        registry
    }
}

impl<P, F> Default for RuleRegistry<P, F, DefaultObservationProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, F, O> RuleRegistry<P, F, O> {
    /// 使用自定义提供者创建
    pub fn with_provider(provider: O) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            parser: FormulaParser::new(),
            compiler: Arc::new(ExpressionCompiler::new()),
            provider: Arc::new(provider),
            _payload: PhantomData,
        }
    }

    /// 当前使用的观察提供者
    pub fn provider(&self) -> &O {
        &self.provider
    }
}

impl<P, F, O> RuleRegistry<P, F, O>
where
    P: Send + Sync + 'static,
    F: Send + Sync + 'static,
    O: ObservationProvider,
{
    /// 注册公式规则
    ///
    /// 公式在锁内解析并编译为 `T -> bool` 谓词，失败时返回错误且注册中心保持不变。
    /// 成功时返回条目的注册序号。
    #[instrument(skip(self, pass, fail), fields(group_key = %key, input_type = type_name::<T>()))]
    pub fn register_func<T>(&self, key: &str, formula: &str, pass: P, fail: F) -> Result<u64>
    where
        T: Serialize + Send + Sync + 'static,
        P: Clone,
        F: Clone,
    {
        let mut state = self.state.lock();

        let compiled = self
            .parser
            .parse(formula)
            .and_then(|parsed| self.compiler.compile::<T>(&parsed));
        let predicate = match compiled {
            Ok(predicate) => predicate,
            Err(e) => {
                metrics::record_rule_registration(RuleKind::Func.as_str(), "failed");
                warn!(error = %e, "公式规则注册失败");
                return Err(e);
            }
        };

        let required_fields = predicate.required_fields().iter().cloned().collect();
        let compile_version = predicate.compile_version();
        let rule: Arc<dyn Rule<T, P, F>> = Arc::new(FuncRule::compiled(predicate, pass, fail));
        let seq = state.push(
            key.to_string(),
            RuleKind::Func,
            formula.to_string(),
            required_fields,
            ErasedRule::new(rule),
        );

        metrics::record_rule_registration(RuleKind::Func.as_str(), "success");
        info!(seq, compile_version, "公式规则已注册: {}", formula);
        Ok(seq)
    }

    /// 注册调用方实现的规则，不经过编译
    #[instrument(skip(self, rule), fields(group_key = %key, input_type = type_name::<T>()))]
    pub fn register_template<T, R>(&self, key: &str, rule: R) -> u64
    where
        T: Send + Sync + 'static,
        R: Rule<T, P, F> + 'static,
    {
        let label = rule.name().to_string();
        let rule: Arc<dyn Rule<T, P, F>> = Arc::new(rule);

        let seq = self.state.lock().push(
            key.to_string(),
            RuleKind::Template,
            label.clone(),
            Vec::new(),
            ErasedRule::new(rule),
        );

        metrics::record_rule_registration(RuleKind::Template.as_str(), "success");
        info!(seq, "模板规则已注册: {}", label);
        seq
    }

    /// 清空所有规则
    #[instrument(skip(self))]
    pub fn reset_rules(&self) {
        let count = {
            let mut state = self.state.lock();
            let count = state.entries.len();
            state.entries.clear();
            count
        };
        info!("已清空 {} 条规则", count);
    }

    /// 评估分组内的所有规则
    ///
    /// 在锁内按注册顺序截取分组快照后立即返回惰性流。流被轮询时才会逐条评估，
    /// 之后的注册或清空不影响已返回的流。分组不存在时返回空流。
    #[instrument(skip(self, instance), fields(input_type = type_name::<T>()))]
    pub fn apply<T>(&self, group_key: &str, instance: T) -> RuleStream<P, F>
    where
        T: Send + Sync + 'static,
    {
        let snapshot: Vec<RuleEntry> = self.state.lock().group(group_key).cloned().collect();
        debug!(rules = snapshot.len(), "分组快照已生成");

        pipeline::concat(
            group_key.to_string(),
            snapshot,
            Arc::new(instance),
            Arc::clone(&self.provider),
        )
    }

    /// 评估分组并收集全部结果，遇到第一个错误即返回
    pub async fn apply_collect<T>(&self, group_key: &str, instance: T) -> Result<Vec<Outcome<P, F>>>
    where
        T: Send + Sync + 'static,
    {
        self.apply(group_key, instance).try_collect().await
    }

    /// 当前条目总数
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// 分组内的条目数
    pub fn group_len(&self, group_key: &str) -> usize {
        self.state.lock().group(group_key).count()
    }

    /// 所有分组键，按首次注册顺序去重
    pub fn group_keys(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut seen = HashSet::new();
        state
            .entries
            .iter()
            .filter(|e| seen.insert(e.group_key.as_str()))
            .map(|e| e.group_key.clone())
            .collect()
    }

    /// 分组内条目的元数据
    pub fn entries(&self, group_key: &str) -> Vec<EntryInfo> {
        self.state.lock().group(group_key).map(RuleEntry::info).collect()
    }

    /// 统计信息
    pub fn stats(&self) -> RegistryStats {
        let state = self.state.lock();

        let rules_count = state.entries.len();
        let func_rules = state
            .entries
            .iter()
            .filter(|e| e.kind == RuleKind::Func)
            .count();
        let total_fields: usize = state.entries.iter().map(|e| e.required_fields.len()).sum();
        let groups_count = state
            .entries
            .iter()
            .map(|e| e.group_key.as_str())
            .collect::<HashSet<_>>()
            .len();

        RegistryStats {
            rules_count,
            groups_count,
            func_rules,
            template_rules: rules_count - func_rules,
            total_fields,
            avg_fields_per_func_rule: if func_rules > 0 {
                total_fields as f64 / func_rules as f64
            } else {
                0.0
            },
        }
    }
}

/// 注册中心统计信息
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStats {
    /// 条目总数
    pub rules_count: usize,
    /// 分组数
    pub groups_count: usize,
    pub func_rules: usize,
    pub template_rules: usize,
    /// 公式规则引用的字段总数
    pub total_fields: usize,
    pub avg_fields_per_func_rule: f64,
}
