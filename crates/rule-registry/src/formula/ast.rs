//! 公式语法树

use crate::operators::{ArithmeticOperator, LogicalOperator, Operator};
use serde_json::Value;
use std::fmt;

/// 字段路径，如 `order.amount` 或 `items.0.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 在 JSON 数据中解析路径，对象按键查找，数组按下标查找
    pub fn resolve<'v>(&self, data: &'v Value) -> Option<&'v Value> {
        let mut current = data;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::new(path.split('.').map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(FieldPath),
    List(Vec<Expr>),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Logical {
        op: LogicalOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithmeticOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Field(path) => write!(f, "{}", path),
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Not(inner) => write!(f, "!{}", inner),
            Expr::Negate(inner) => write!(f, "-{}", inner),
            Expr::Logical { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Compare { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Arithmetic { op, left, right } => write!(f, "({} {} {})", left, op, right),
        }
    }
}

/// 解析后的公式
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    source: String,
    expr: Expr,
}

impl ParsedFormula {
    pub fn new(source: impl Into<String>, expr: Expr) -> Self {
        Self {
            source: source.into(),
            expr,
        }
    }

    /// 原始公式文本
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}
