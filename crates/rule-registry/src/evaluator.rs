//! 值评估器
//!
//! 实现公式中比较、算术和逻辑取值的语义，支持多种 JSON 数据类型。

use crate::error::{Result, RuleError};
use crate::operators::{ArithmeticOperator, Operator};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// 值评估器
pub struct ValueEvaluator;

impl ValueEvaluator {
    /// 比较两个值
    ///
    /// `pattern` 为 `matches` 操作符预编译的正则，其他操作符忽略该参数。
    /// 左值为 null（通常是字段不存在）时，除相等比较外一律返回 false。
    pub fn compare(
        left: &Value,
        operator: Operator,
        right: &Value,
        pattern: Option<&Regex>,
    ) -> Result<bool> {
        if left.is_null() && !matches!(operator, Operator::Eq | Operator::Neq) {
            return Ok(false);
        }

        match operator {
            Operator::Eq => Ok(Self::eq(left, right)),
            Operator::Neq => Ok(!Self::eq(left, right)),
            Operator::Gt => Self::order(left, right).map(|o| o == Some(Ordering::Greater)),
            Operator::Gte => Self::order(left, right)
                .map(|o| matches!(o, Some(Ordering::Greater | Ordering::Equal))),
            Operator::Lt => Self::order(left, right).map(|o| o == Some(Ordering::Less)),
            Operator::Lte => {
                Self::order(left, right).map(|o| matches!(o, Some(Ordering::Less | Ordering::Equal)))
            }
            Operator::In => Self::in_list(left, right),
            Operator::NotIn => Self::in_list(left, right).map(|r| !r),
            Operator::Contains => Self::contains(left, right),
            Operator::StartsWith => {
                let (s, prefix) = Self::string_pair(left, right)?;
                Ok(s.starts_with(prefix))
            }
            Operator::EndsWith => {
                let (s, suffix) = Self::string_pair(left, right)?;
                Ok(s.ends_with(suffix))
            }
            Operator::Matches => match pattern {
                Some(regex) => Self::regex_match(left, regex),
                None => {
                    // 模式来自字段值，只能在运行时编译
                    let pattern = right.as_str().ok_or_else(|| {
                        RuleError::type_mismatch("string (regex pattern)", Self::type_name(right))
                    })?;
                    let regex = Self::compile_regex(pattern)
                        .map_err(|e| RuleError::ExecutionError(e.to_string()))?;
                    Self::regex_match(left, &regex)
                }
            },
        }
    }

    /// 算术运算
    pub fn arithmetic(operator: ArithmeticOperator, left: &Value, right: &Value) -> Result<Value> {
        let (a, b) = (Self::number(left)?, Self::number(right)?);

        // 两侧都是整数时尽量保持整数结果，溢出后退回浮点数
        if let (Some(x), Some(y)) = (left.as_i64(), right.as_i64()) {
            let exact = match operator {
                ArithmeticOperator::Add => x.checked_add(y),
                ArithmeticOperator::Sub => x.checked_sub(y),
                ArithmeticOperator::Mul => x.checked_mul(y),
                ArithmeticOperator::Rem if y != 0 => x.checked_rem(y),
                _ => None,
            };
            if let Some(v) = exact {
                return Ok(Value::from(v));
            }
        }

        let result = match operator {
            ArithmeticOperator::Add => a + b,
            ArithmeticOperator::Sub => a - b,
            ArithmeticOperator::Mul => a * b,
            ArithmeticOperator::Div | ArithmeticOperator::Rem if b == 0.0 => {
                return Err(RuleError::ExecutionError(format!(
                    "除数为零: {} {} {}",
                    left, operator, right
                )));
            }
            ArithmeticOperator::Div => a / b,
            ArithmeticOperator::Rem => a % b,
        };

        Ok(Value::from(result))
    }

    /// 数值取反
    pub fn negate(value: &Value) -> Result<Value> {
        if let Some(n) = value.as_i64().and_then(i64::checked_neg) {
            return Ok(Value::from(n));
        }
        Ok(Value::from(-Self::number(value)?))
    }

    /// 逻辑取值：null 视为 false，非布尔值报错
    pub fn truthy(value: &Value) -> Result<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            other => Err(RuleError::type_mismatch("boolean", Self::type_name(other))),
        }
    }

    /// 编译正则表达式
    pub fn compile_regex(pattern: &str) -> Result<Regex> {
        Regex::new(pattern)
            .map_err(|e| RuleError::CompileError(format!("无效的正则表达式 '{}': {}", pattern, e)))
    }

    /// 相等比较
    fn eq(left: &Value, right: &Value) -> bool {
        if let (Value::Number(a), Value::Number(b)) = (left, right) {
            return Self::number_cmp(a, b) == Some(Ordering::Equal);
        }
        left == right
    }

    /// 数值比较
    ///
    /// 两侧同为 i64 或同为 u64 时精确比较，否则按浮点比较，使 100 == 100.0 成立。
    fn number_cmp(a: &Number, b: &Number) -> Option<Ordering> {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            return Some(x.cmp(&y));
        }
        if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
            return Some(x.cmp(&y));
        }
        let (x, y) = (a.as_f64()?, b.as_f64()?);
        if (x - y).abs() < f64::EPSILON {
            return Some(Ordering::Equal);
        }
        x.partial_cmp(&y)
    }

    /// 有序比较：数值之间按数值，字符串之间先按时间、再按字典序
    fn order(left: &Value, right: &Value) -> Result<Option<Ordering>> {
        if right.is_null() {
            return Ok(None);
        }

        if let (Value::Number(a), Value::Number(b)) = (left, right) {
            return Ok(Self::number_cmp(a, b));
        }

        if let (Value::String(a), Value::String(b)) = (left, right) {
            if let (Some(ta), Some(tb)) = (Self::parse_datetime(a), Self::parse_datetime(b)) {
                return Ok(Some(ta.cmp(&tb)));
            }
            return Ok(Some(a.cmp(b)));
        }

        Err(RuleError::type_mismatch(
            format!("可比较的值 (与 {} 比较)", Self::type_name(right)),
            Self::type_name(left),
        ))
    }

    /// 列表包含检查 (in)
    fn in_list(item: &Value, list: &Value) -> Result<bool> {
        let arr = list
            .as_array()
            .ok_or_else(|| RuleError::type_mismatch("array", Self::type_name(list)))?;
        Ok(arr.iter().any(|candidate| Self::eq(item, candidate)))
    }

    /// 字符串子串或数组元素包含检查
    fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
        match haystack {
            Value::String(s) => {
                let sub = needle
                    .as_str()
                    .ok_or_else(|| RuleError::type_mismatch("string", Self::type_name(needle)))?;
                Ok(s.contains(sub))
            }
            Value::Array(arr) => Ok(arr.iter().any(|item| Self::eq(item, needle))),
            other => Err(RuleError::type_mismatch(
                "string or array",
                Self::type_name(other),
            )),
        }
    }

    fn regex_match(value: &Value, regex: &Regex) -> Result<bool> {
        let s = value
            .as_str()
            .ok_or_else(|| RuleError::type_mismatch("string", Self::type_name(value)))?;
        Ok(regex.is_match(s))
    }

    fn string_pair<'v>(left: &'v Value, right: &'v Value) -> Result<(&'v str, &'v str)> {
        let s = left
            .as_str()
            .ok_or_else(|| RuleError::type_mismatch("string", Self::type_name(left)))?;
        let other = right
            .as_str()
            .ok_or_else(|| RuleError::type_mismatch("string", Self::type_name(right)))?;
        Ok((s, other))
    }

    fn number(value: &Value) -> Result<f64> {
        value
            .as_f64()
            .ok_or_else(|| RuleError::type_mismatch("number", Self::type_name(value)))
    }

    /// 解析 RFC 3339 或纯日期格式
    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// 获取值的类型名称
    pub fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}
