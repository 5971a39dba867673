//! 规则注册中心错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("公式解析失败: {message} (位置 {position})")]
    ParseError { position: usize, message: String },

    #[error("公式编译失败: {0}")]
    CompileError(String),

    #[error("规则类型不匹配: 分组 '{group_key}' 中的规则注册类型为 {registered}, 请求类型为 {requested}")]
    RuleTypeMismatch {
        group_key: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("规则执行失败: {0}")]
    ExecutionError(String),

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        RuleError::ParseError {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        RuleError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 注册阶段的错误（公式解析或编译失败），注册中心状态未被修改
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            RuleError::ParseError { .. } | RuleError::CompileError(_)
        )
    }

    /// 评估阶段由规则自身逻辑产生的错误
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            RuleError::ExecutionError(_) | RuleError::TypeMismatch { .. } | RuleError::JsonError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
