//! 字符串公式解析
//!
//! 将 `order.amount >= 500 && user.is_vip` 这样的公式切分并解析为语法树，
//! 交给 [`crate::compiler::ExpressionCompiler`] 编译成谓词。

mod ast;
mod lexer;
mod parser;

pub use ast::{Expr, FieldPath, ParsedFormula};
pub use parser::FormulaParser;
