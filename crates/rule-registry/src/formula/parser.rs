//! 公式语法分析
//!
//! 递归下降解析，优先级从低到高：
//! - 逻辑：`||`、`&&`、`!`
//! - 比较：`==` `!=` `>` `>=` `<` `<=` `in` `not in` `contains` `starts_with` `ends_with` `matches`
//! - 加减：`+` `-`
//! - 乘除：`*` `/` `%`
//! - 一元：`-`
//! - 基本：字面量、字段路径、列表、括号表达式

use super::ast::{Expr, FieldPath, ParsedFormula};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{Result, RuleError};
use crate::operators::{ArithmeticOperator, LogicalOperator, Operator};
use serde_json::Value;

/// 公式解析器
#[derive(Debug, Clone)]
pub struct FormulaParser {
    max_length: usize,
    max_depth: usize,
}

impl FormulaParser {
    pub fn new() -> Self {
        Self {
            max_length: 4096,
            max_depth: 64,
        }
    }

    /// 限制公式最大字节数
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            ..Self::new()
        }
    }

    /// 限制括号、列表与一元运算符的嵌套层级
    ///
    /// 编译和求值都按语法树递归，层级上限同时约束了它们的栈深度。
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 解析公式字符串
    pub fn parse(&self, formula: &str) -> Result<ParsedFormula> {
        if formula.trim().is_empty() {
            return Err(RuleError::parse(0, "公式不能为空"));
        }

        if formula.len() > self.max_length {
            return Err(RuleError::parse(
                self.max_length,
                format!(
                    "公式长度 {} 超过上限 {}",
                    formula.len(),
                    self.max_length
                ),
            ));
        }

        let tokens = Lexer::new(formula).tokenize()?;
        let mut cursor = Cursor {
            tokens,
            index: 0,
            depth: 0,
            max_depth: self.max_depth,
        };
        let expr = cursor.parse_or()?;

        let trailing = cursor.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(RuleError::parse(
                trailing.position,
                format!("多余的 {}", trailing.kind.describe()),
            ));
        }

        Ok(ParsedFormula::new(formula, expr))
    }
}

impl Default for FormulaParser {
    fn default() -> Self {
        Self::new()
    }
}

struct Cursor {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
    max_depth: usize,
}

impl Cursor {
    fn peek(&self) -> &Token {
        // tokenize 保证末尾为 Eof
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &TokenKind {
        &self.tokens[(self.index + 1).min(self.tokens.len() - 1)].kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(RuleError::parse(
                found.position,
                format!("期望 {}，实际为 {}", kind.describe(), found.kind.describe()),
            ))
        }
    }

    fn descend(&mut self, position: usize) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(RuleError::parse(
                position,
                format!("嵌套层级超过上限 {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.check(&TokenKind::Bang) || self.check(&TokenKind::Not) {
            let token = self.advance();
            self.descend(token.position)?;
            let inner = self.parse_not()?;
            self.ascend();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn comparison_operator(&self) -> Option<Operator> {
        let op = match &self.peek().kind {
            TokenKind::EqEq => Operator::Eq,
            TokenKind::NotEq => Operator::Neq,
            TokenKind::Gt => Operator::Gt,
            TokenKind::GtEq => Operator::Gte,
            TokenKind::Lt => Operator::Lt,
            TokenKind::LtEq => Operator::Lte,
            TokenKind::In => Operator::In,
            TokenKind::Not if self.peek_next() == &TokenKind::In => Operator::NotIn,
            TokenKind::Contains => Operator::Contains,
            TokenKind::StartsWith => Operator::StartsWith,
            TokenKind::EndsWith => Operator::EndsWith,
            TokenKind::Matches => Operator::Matches,
            _ => return None,
        };
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;

        while let Some(op) = self.comparison_operator() {
            self.advance();
            if op == Operator::NotIn {
                self.advance();
            }
            let right = self.parse_additive()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => ArithmeticOperator::Add,
                TokenKind::Minus => ArithmeticOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => ArithmeticOperator::Mul,
                TokenKind::Slash => ArithmeticOperator::Div,
                TokenKind::Percent => ArithmeticOperator::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.check(&TokenKind::Minus) {
            let token = self.advance();
            self.descend(token.position)?;
            let inner = self.parse_unary()?;
            self.ascend();
            // 负数字面量直接折叠
            return Ok(match inner {
                Expr::Literal(Value::Number(n)) if n.is_i64() => {
                    Expr::Literal(Value::from(-n.as_i64().unwrap_or_default()))
                }
                Expr::Literal(Value::Number(n)) if n.is_f64() => {
                    Expr::Literal(Value::from(-n.as_f64().unwrap_or_default()))
                }
                other => Expr::Negate(Box::new(other)),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        let expr = match token.kind {
            TokenKind::Int(n) => Expr::Literal(Value::from(n)),
            TokenKind::Float(n) => Expr::Literal(Value::from(n)),
            TokenKind::Str(s) => Expr::Literal(Value::String(s)),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::Null => Expr::Literal(Value::Null),
            TokenKind::Ident(name) => self.parse_path(name)?,
            TokenKind::LBracket => {
                self.descend(token.position)?;
                let list = self.parse_list()?;
                self.ascend();
                list
            }
            TokenKind::LParen => {
                self.descend(token.position)?;
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen)?;
                self.ascend();
                inner
            }
            other => {
                return Err(RuleError::parse(
                    token.position,
                    format!("意外的 {}", other.describe()),
                ));
            }
        };
        Ok(expr)
    }

    fn parse_path(&mut self, head: String) -> Result<Expr> {
        let mut segments = vec![head];
        while self.check(&TokenKind::Dot) {
            self.advance();
            let token = self.advance();
            match token.kind {
                TokenKind::Ident(name) => segments.push(name),
                TokenKind::Int(index) if index >= 0 => segments.push(index.to_string()),
                other => {
                    return Err(RuleError::parse(
                        token.position,
                        format!("字段路径中意外的 {}", other.describe()),
                    ));
                }
            }
        }
        Ok(Expr::Field(FieldPath::new(segments)))
    }

    fn parse_list(&mut self) -> Result<Expr> {
        let mut items = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_or()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::List(items))
    }
}
