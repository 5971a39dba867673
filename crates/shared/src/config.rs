//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 规则观察者提供方的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// 在消费方的任务中直接评估
    #[default]
    Inline,
    /// 在 tokio 阻塞线程池中评估
    Blocking,
}

/// 规则评估配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub provider: ProviderKind,
    /// 公式字符串允许的最大字节数
    pub max_formula_length: usize,
    /// 括号、列表与一元运算符允许的最大嵌套层级
    pub max_nesting_depth: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Inline,
            max_formula_length: 4096,
            max_nesting_depth: 64,
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ObservabilityConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub evaluation: EvaluationConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（RULES_ 前缀，`__` 分隔层级，如 RULES_EVALUATION__PROVIDER -> evaluation.provider）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from_dir(service_name, &config_dir)
    }

    /// 从指定目录加载配置，便于测试时使用临时目录
    pub fn load_from_dir(service_name: &str, config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RULES_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("RULES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.evaluation.provider, ProviderKind::Inline);
        assert_eq!(config.evaluation.max_formula_length, 4096);
        assert_eq!(config.evaluation.max_nesting_depth, 64);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let config = AppConfig::load_from_dir("rule-registry", "/nonexistent-config-dir").unwrap();
        assert_eq!(config.service_name, "rule-registry");
        assert_eq!(config.evaluation.max_formula_length, 4096);
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("rules-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("registry-test.toml"),
            r#"
            [evaluation]
            provider = "blocking"
            max_formula_length = 128
            max_nesting_depth = 16

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from_dir("registry-test", dir.to_str().unwrap()).unwrap();
        assert_eq!(config.evaluation.provider, ProviderKind::Blocking);
        assert_eq!(config.evaluation.max_formula_length, 128);
        assert_eq!(config.evaluation.max_nesting_depth, 16);
        assert!(config.observability.json_logs());
        // 未配置的字段保持默认值
        assert_eq!(config.observability.log_level, "info");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_provider_kind_deserialization() {
        let kind: ProviderKind = serde_json::from_str("\"blocking\"").unwrap();
        assert_eq!(kind, ProviderKind::Blocking);
        assert!(serde_json::from_str::<ProviderKind>("\"remote\"").is_err());
    }
}
