//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("未注册的操作符: {0}")]
    OperationNotFound(String),

    #[error("操作符 {operator} 至少需要 {min} 个参数, 实际 {actual} 个")]
    InvalidArity {
        operator: String,
        min: usize,
        actual: usize,
    },

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("操作符 {operator} 需要可枚举值, 实际为 {actual}")]
    NotEnumerable { operator: String, actual: String },

    #[error("数值结果无法表示为 JSON 数值: {0}")]
    NonFiniteNumber(f64),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
