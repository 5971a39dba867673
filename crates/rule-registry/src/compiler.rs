//! 表达式编译器
//!
//! 将解析后的公式做静态类型检查，预编译正则表达式并折叠常量列表，
//! 生成可以对任意可序列化输入类型求值的布尔谓词。

use crate::error::{Result, RuleError};
use crate::evaluator::ValueEvaluator;
use crate::formula::{Expr, FieldPath, ParsedFormula};
use crate::operators::{ArithmeticOperator, LogicalOperator, Operator};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 编译期推断的表达式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StaticType {
    Bool,
    Number,
    String,
    List,
    Null,
    /// 字段值，运行时才能确定
    Dynamic,
}

impl StaticType {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::List,
            // 公式语法不产生对象字面量
            Value::Object(_) => Self::Dynamic,
        }
    }

    fn is_boolean_like(self) -> bool {
        matches!(self, Self::Bool | Self::Dynamic | Self::Null)
    }

    fn is_one_of(self, allowed: &[StaticType]) -> bool {
        self == Self::Dynamic || allowed.contains(&self)
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::List => "list",
            Self::Null => "null",
            Self::Dynamic => "dynamic",
        };
        write!(f, "{}", s)
    }
}

/// 编译后的执行节点
#[derive(Debug)]
enum Node {
    Literal(Value),
    Field(FieldPath),
    List(Vec<Node>),
    Not(Box<Node>),
    Negate(Box<Node>),
    Logical {
        op: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Compare {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
        pattern: Option<Regex>,
    },
    Arithmetic {
        op: ArithmeticOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn eval(&self, data: &Value) -> Result<Value> {
        match self {
            Node::Literal(value) => Ok(value.clone()),
            Node::Field(path) => Ok(path.resolve(data).cloned().unwrap_or(Value::Null)),
            Node::List(items) => items
                .iter()
                .map(|item| item.eval(data))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Node::Not(inner) => Ok(Value::Bool(!ValueEvaluator::truthy(&inner.eval(data)?)?)),
            Node::Negate(inner) => ValueEvaluator::negate(&inner.eval(data)?),
            Node::Logical { op, left, right } => {
                // 短路求值
                let lhs = ValueEvaluator::truthy(&left.eval(data)?)?;
                let result = match op {
                    LogicalOperator::And if !lhs => false,
                    LogicalOperator::Or if lhs => true,
                    _ => ValueEvaluator::truthy(&right.eval(data)?)?,
                };
                Ok(Value::Bool(result))
            }
            Node::Compare {
                op,
                left,
                right,
                pattern,
            } => {
                let lhs = left.eval(data)?;
                let rhs = right.eval(data)?;
                ValueEvaluator::compare(&lhs, *op, &rhs, pattern.as_ref()).map(Value::Bool)
            }
            Node::Arithmetic { op, left, right } => {
                ValueEvaluator::arithmetic(*op, &left.eval(data)?, &right.eval(data)?)
            }
        }
    }
}

/// 编译后的布尔谓词
///
/// 对输入实例先序列化为 JSON，再在编译好的节点树上求值。
pub struct CompiledPredicate<T> {
    source: Arc<str>,
    root: Arc<Node>,
    required_fields: Arc<BTreeSet<String>>,
    compile_version: u64,
    _input: PhantomData<fn(&T)>,
}

impl<T> Clone for CompiledPredicate<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            root: Arc::clone(&self.root),
            required_fields: Arc::clone(&self.required_fields),
            compile_version: self.compile_version,
            _input: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CompiledPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPredicate")
            .field("source", &self.source)
            .field("required_fields", &self.required_fields)
            .field("compile_version", &self.compile_version)
            .finish()
    }
}

impl<T> CompiledPredicate<T> {
    /// 原始公式文本
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 公式中引用的所有字段路径
    pub fn required_fields(&self) -> &BTreeSet<String> {
        &self.required_fields
    }

    /// 编译版本号
    pub fn compile_version(&self) -> u64 {
        self.compile_version
    }
}

impl<T: Serialize> CompiledPredicate<T> {
    /// 对实例求值
    pub fn evaluate(&self, instance: &T) -> Result<bool> {
        let data = serde_json::to_value(instance)?;
        let value = self.root.eval(&data)?;
        ValueEvaluator::truthy(&value)
    }
}

/// 表达式编译器
#[derive(Debug, Default)]
pub struct ExpressionCompiler {
    compile_version: AtomicU64,
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 编译公式为 `T -> bool` 谓词
    pub fn compile<T>(&self, formula: &ParsedFormula) -> Result<CompiledPredicate<T>> {
        let mut required_fields = BTreeSet::new();
        let (root, ty) = self.compile_node(formula.expr(), &mut required_fields)?;

        if !matches!(ty, StaticType::Bool | StaticType::Dynamic) {
            return Err(RuleError::CompileError(format!(
                "公式 '{}' 的结果类型必须为 boolean，实际为 {}",
                formula.source(),
                ty
            )));
        }

        let compile_version = self.compile_version.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(CompiledPredicate {
            source: Arc::from(formula.source()),
            root: Arc::new(root),
            required_fields: Arc::new(required_fields),
            compile_version,
            _input: PhantomData,
        })
    }

    fn compile_node(
        &self,
        expr: &Expr,
        fields: &mut BTreeSet<String>,
    ) -> Result<(Node, StaticType)> {
        match expr {
            Expr::Literal(value) => Ok((Node::Literal(value.clone()), StaticType::of(value))),
            Expr::Field(path) => {
                fields.insert(path.to_string());
                Ok((Node::Field(path.clone()), StaticType::Dynamic))
            }
            Expr::List(items) => {
                let nodes = items
                    .iter()
                    .map(|item| self.compile_node(item, fields).map(|(node, _)| node))
                    .collect::<Result<Vec<_>>>()?;

                // 全部为字面量时折叠为常量数组
                if nodes.iter().all(|n| matches!(n, Node::Literal(_))) {
                    let values = nodes
                        .into_iter()
                        .filter_map(|n| match n {
                            Node::Literal(v) => Some(v),
                            _ => None,
                        })
                        .collect();
                    return Ok((Node::Literal(Value::Array(values)), StaticType::List));
                }
                Ok((Node::List(nodes), StaticType::List))
            }
            Expr::Not(inner) => {
                let (node, ty) = self.compile_node(inner, fields)?;
                Self::require(ty.is_boolean_like(), "!", "boolean", ty, inner)?;
                Ok((Node::Not(Box::new(node)), StaticType::Bool))
            }
            Expr::Negate(inner) => {
                let (node, ty) = self.compile_node(inner, fields)?;
                Self::require(ty.is_one_of(&[StaticType::Number]), "-", "number", ty, inner)?;
                Ok((Node::Negate(Box::new(node)), StaticType::Number))
            }
            Expr::Logical { op, left, right } => {
                let (lnode, lty) = self.compile_node(left, fields)?;
                let (rnode, rty) = self.compile_node(right, fields)?;
                let symbol = op.to_string();
                Self::require(lty.is_boolean_like(), &symbol, "boolean", lty, left)?;
                Self::require(rty.is_boolean_like(), &symbol, "boolean", rty, right)?;
                Ok((
                    Node::Logical {
                        op: *op,
                        left: Box::new(lnode),
                        right: Box::new(rnode),
                    },
                    StaticType::Bool,
                ))
            }
            Expr::Arithmetic { op, left, right } => {
                let (lnode, lty) = self.compile_node(left, fields)?;
                let (rnode, rty) = self.compile_node(right, fields)?;
                let symbol = op.to_string();
                Self::require(lty.is_one_of(&[StaticType::Number]), &symbol, "number", lty, left)?;
                Self::require(rty.is_one_of(&[StaticType::Number]), &symbol, "number", rty, right)?;
                Ok((
                    Node::Arithmetic {
                        op: *op,
                        left: Box::new(lnode),
                        right: Box::new(rnode),
                    },
                    StaticType::Number,
                ))
            }
            Expr::Compare { op, left, right } => self.compile_compare(*op, left, right, fields),
        }
    }

    fn compile_compare(
        &self,
        op: Operator,
        left: &Expr,
        right: &Expr,
        fields: &mut BTreeSet<String>,
    ) -> Result<(Node, StaticType)> {
        let (lnode, lty) = self.compile_node(left, fields)?;
        let (rnode, rty) = self.compile_node(right, fields)?;
        let symbol = op.to_string();
        let mut pattern = None;

        match op {
            Operator::Eq | Operator::Neq => {}
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let orderable = [StaticType::Number, StaticType::String];
                Self::require(lty.is_one_of(&orderable), &symbol, "number or string", lty, left)?;
                Self::require(rty.is_one_of(&orderable), &symbol, "number or string", rty, right)?;
            }
            Operator::In | Operator::NotIn => {
                Self::require(rty.is_one_of(&[StaticType::List]), &symbol, "list", rty, right)?;
            }
            Operator::Contains => {
                let containers = [StaticType::String, StaticType::List];
                Self::require(lty.is_one_of(&containers), &symbol, "string or list", lty, left)?;
            }
            Operator::StartsWith | Operator::EndsWith => {
                Self::require(lty.is_one_of(&[StaticType::String]), &symbol, "string", lty, left)?;
                Self::require(rty.is_one_of(&[StaticType::String]), &symbol, "string", rty, right)?;
            }
            Operator::Matches => {
                Self::require(lty.is_one_of(&[StaticType::String]), &symbol, "string", lty, left)?;
                match &rnode {
                    Node::Literal(Value::String(p)) => {
                        pattern = Some(ValueEvaluator::compile_regex(p)?);
                    }
                    _ => Self::require(
                        rty == StaticType::Dynamic,
                        &symbol,
                        "string (regex pattern)",
                        rty,
                        right,
                    )?,
                }
            }
        }

        Ok((
            Node::Compare {
                op,
                left: Box::new(lnode),
                right: Box::new(rnode),
                pattern,
            },
            StaticType::Bool,
        ))
    }

    fn require(ok: bool, op: &str, expected: &str, actual: StaticType, expr: &Expr) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(RuleError::CompileError(format!(
                "操作符 '{}' 需要 {} 类型的操作数，'{}' 的类型为 {}",
                op, expected, expr, actual
            )))
        }
    }
}
