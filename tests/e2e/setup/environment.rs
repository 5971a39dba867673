//! 测试环境管理
//!
//! 在临时目录写入配置文件，按配置构建注册中心。

use anyhow::Result;
use registry_shared::config::AppConfig;
use registry_shared::test_utils::init_test_tracing;
use rule_registry::RuleRegistry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ENV: AtomicUsize = AtomicUsize::new(0);

/// 端到端测试环境
pub struct TestEnvironment {
    pub config: AppConfig,
    pub registry: RuleRegistry,
    config_dir: PathBuf,
}

impl TestEnvironment {
    /// 使用默认配置（阻塞线程池提供者）
    pub fn setup() -> Result<Self> {
        Self::with_config(
            r#"
            [evaluation]
            provider = "blocking"

            [observability]
            log_level = "debug"
            "#,
        )
    }

    /// 使用给定的 TOML 配置内容
    pub fn with_config(toml: &str) -> Result<Self> {
        init_test_tracing();

        let config_dir = std::env::temp_dir().join(format!(
            "rule-registry-e2e-{}-{}",
            std::process::id(),
            NEXT_ENV.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&config_dir)?;
        std::fs::write(config_dir.join("rule-registry-e2e.toml"), toml)?;

        let dir = config_dir
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("临时目录路径不是合法的 UTF-8"))?;
        let config = AppConfig::load_from_dir("rule-registry-e2e", dir)?;
        let registry = RuleRegistry::from_config(&config.evaluation);

        Ok(Self {
            config,
            registry,
            config_dir,
        })
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.config_dir);
    }
}
