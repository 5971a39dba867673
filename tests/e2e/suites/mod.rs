//! 测试套件模块

pub mod concurrency;
pub mod evaluation_flow;
pub mod rule_lifecycle;
