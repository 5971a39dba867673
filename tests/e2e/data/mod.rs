//! 测试数据模块

mod fixtures;
mod scenarios;

pub use fixtures::*;
pub use scenarios::*;
