//! 规则注册中心端到端测试
//!
//! 从配置加载到分组评估的完整流程，包括：
//! - 配置驱动的注册中心构建
//! - 消费分级与会员规则的评估顺序
//! - 规则清空与重新加载
//! - 多线程注册与并发评估
//! - 评估失败与取消

pub mod data;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
