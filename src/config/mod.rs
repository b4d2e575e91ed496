pub mod sources;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::{QpError, QpResult};

pub use sources::SourceConfig;

pub const SETTINGS_PATH: &str = "config/settings.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    pub fetcher: FetcherConfig,
    pub storage: StorageConfig,
}

/// 题目提取参数
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// 每道题最多保留的图片数
    pub max_images_per_question: usize,
    /// 非祖先关系时，选项行与题干之间允许的最大位置差
    pub option_proximity_window: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub request_delay_ms: u64,
    pub max_sources: usize,
    pub cache_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
    pub images_dir: String,
    pub output_dir: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_images_per_question: 6,
            option_proximity_window: 12,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "QuestionPaperBot/1.0".to_string(),
            timeout_secs: 50,
            max_retries: 3,
            request_delay_ms: 600,
            max_sources: 20,
            cache_ttl_minutes: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./data/questions.db".to_string(),
            images_dir: "data/images".to_string(),
            output_dir: "data/output".to_string(),
        }
    }
}

impl AppConfig {
    /// 读取 config/settings.toml，并允许 QPAPER__SECTION__KEY 环境变量覆盖
    pub fn load() -> QpResult<Self> {
        Self::load_from(SETTINGS_PATH)
    }

    pub fn load_from(path: &str) -> QpResult<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::new(path, ::config::FileFormat::Toml).required(false))
            .add_source(
                ::config::Environment::with_prefix("QPAPER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> QpResult<()> {
        if let Some(dir) = Path::new(path).parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> QpResult<()> {
        let cap = self.extractor.max_images_per_question;
        if cap == 0 || cap > 100 {
            return Err(QpError::Config(format!(
                "max_images_per_question 必须在 1..=100 之间，当前为 {}",
                cap
            )));
        }
        if self.extractor.option_proximity_window > 1000 {
            return Err(QpError::Config(format!(
                "option_proximity_window 不能超过 1000，当前为 {}",
                self.extractor.option_proximity_window
            )));
        }
        if self.fetcher.max_sources == 0 {
            return Err(QpError::Config("max_sources 必须大于 0".to_string()));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(QpError::Config("timeout_secs 必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.extractor.max_images_per_question, 6);
        assert_eq!(config.extractor.option_proximity_window, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_image_cap_is_rejected() {
        let mut config = AppConfig::default();
        config.extractor.max_images_per_question = 0;
        assert!(matches!(config.validate(), Err(QpError::Config(_))));
    }

    #[test]
    fn oversized_window_is_rejected() {
        let mut config = AppConfig::default();
        config.extractor.option_proximity_window = 5000;
        assert!(matches!(config.validate(), Err(QpError::Config(_))));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[extractor]\nmax_images_per_question = 3\n").unwrap();

        let config = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.extractor.max_images_per_question, 3);
        assert_eq!(config.extractor.option_proximity_window, 12);
        assert_eq!(config.fetcher.max_sources, 20);
    }

    #[test]
    fn invalid_file_value_fails_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[extractor]\nmax_images_per_question = 0\n").unwrap();

        assert!(AppConfig::load_from(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let path = path.to_str().unwrap();

        let mut config = AppConfig::default();
        config.fetcher.user_agent = "TestAgent/2.0".to_string();
        config.save(path).unwrap();

        let loaded = AppConfig::load_from(path).unwrap();
        assert_eq!(loaded.fetcher.user_agent, "TestAgent/2.0");
    }
}
