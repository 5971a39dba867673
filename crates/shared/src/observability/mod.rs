//! 统一可观测性模块
//!
//! 提供 logging 与 metrics 的统一初始化。
//! 规则注册中心本身不暴露任何网络端口，指标只通过 `metrics` 门面记录，
//! 由嵌入方自行安装 recorder/exporter。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics 描述信息（启用时）
///
/// # Example
///
/// ```ignore
/// use registry_shared::config::AppConfig;
/// use registry_shared::observability;
///
/// fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("rule-registry")?;
///     observability::init(&config.observability)?;
///     Ok(())
/// }
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;

    if config.metrics_enabled {
        metrics::describe_metrics();
    }

    info!(
        log_level = %config.log_level,
        log_format = %config.log_format,
        metrics_enabled = config.metrics_enabled,
        "Observability initialized"
    );

    Ok(())
}
