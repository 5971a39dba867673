//! 规则注册中心
//!
//! 进程内的分组规则注册与评估管道：
//! - 字符串公式解析并编译为类型化的布尔谓词
//! - 调用方自定义的模板规则
//! - 单把互斥锁保护的有序规则列表
//! - 按注册顺序串行、惰性、可取消的分组评估流

pub mod compiler;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod operators;
pub mod outcome;
mod pipeline;
pub mod provider;
pub mod registry;
pub mod rule;

pub use compiler::{CompiledPredicate, ExpressionCompiler};
pub use entry::{EntryInfo, RuleKind};
pub use error::{Result, RuleError};
pub use formula::{FormulaParser, ParsedFormula};
pub use operators::{ArithmeticOperator, LogicalOperator, Operator};
pub use outcome::Outcome;
pub use provider::{DefaultObservationProvider, ObservationProvider, RuleStream};
pub use registry::{RegistryStats, RuleRegistry};
pub use rule::{FuncRule, Rule, TemplateRule};
