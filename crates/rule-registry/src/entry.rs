//! 规则条目
//!
//! 注册中心以类型擦除的方式保存规则，读取时再按调用方声明的类型还原。

use crate::rule::Rule;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的规则句柄
///
/// 内部保存 `Arc<dyn Rule<T, P, F>>`，同时记录注册时 `T` 的类型名用于错误信息。
#[derive(Clone)]
pub struct ErasedRule {
    inner: Arc<dyn Any + Send + Sync>,
    input_type: &'static str,
}

impl ErasedRule {
    pub fn new<T, P, F>(rule: Arc<dyn Rule<T, P, F>>) -> Self
    where
        T: 'static,
        P: 'static,
        F: 'static,
    {
        Self {
            inner: Arc::new(rule),
            input_type: type_name::<T>(),
        }
    }

    /// 按声明的类型还原规则，类型不一致时返回 None
    pub fn downcast<T, P, F>(&self) -> Option<Arc<dyn Rule<T, P, F>>>
    where
        T: 'static,
        P: 'static,
        F: 'static,
    {
        self.inner
            .downcast_ref::<Arc<dyn Rule<T, P, F>>>()
            .map(Arc::clone)
    }

    /// 注册时的输入类型名
    pub fn input_type(&self) -> &'static str {
        self.input_type
    }
}

impl fmt::Debug for ErasedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedRule")
            .field("input_type", &self.input_type)
            .finish_non_exhaustive()
    }
}

/// 规则种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// 由公式编译而来
    Func,
    /// 调用方直接提供
    Template,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Func => "func",
            RuleKind::Template => "template",
        }
    }
}

/// 注册中心中的一条规则，存入后不再修改
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub seq: u64,
    pub group_key: String,
    pub kind: RuleKind,
    /// 公式文本或模板名称，仅用于展示
    pub label: String,
    /// 公式引用的字段路径，模板规则为空
    pub required_fields: Vec<String>,
    pub registered_at: DateTime<Utc>,
    pub rule: ErasedRule,
}

impl RuleEntry {
    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            seq: self.seq,
            group_key: self.group_key.clone(),
            kind: self.kind,
            label: self.label.clone(),
            required_fields: self.required_fields.clone(),
            input_type: self.rule.input_type(),
            registered_at: self.registered_at,
        }
    }
}

/// 条目元数据快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub seq: u64,
    pub group_key: String,
    pub kind: RuleKind,
    pub label: String,
    pub required_fields: Vec<String>,
    pub input_type: &'static str,
    pub registered_at: DateTime<Utc>,
}
