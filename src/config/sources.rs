use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::QpResult;

pub const SOURCES_PATH: &str = "config/sources.toml";

/// 一套试卷的来源页面
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSet {
    pub name: String,
    pub sources: Vec<String>,
    /// 解析相对图片地址时使用的基础URL（本地快照时有用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub sets: Vec<SourceSet>,
}

impl SourceConfig {
    pub fn load() -> QpResult<Self> {
        Self::load_from(SOURCES_PATH)
    }

    pub fn load_from(path: &str) -> QpResult<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: SourceConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn get_active_sets(&self) -> Vec<&SourceSet> {
        self.sets.iter().filter(|s| s.enabled).collect()
    }

    pub fn find(&self, name: &str) -> Option<&SourceSet> {
        self.get_active_sets().into_iter().find(|s| s.name == name)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sets: vec![SourceSet {
                name: "physics-unit-1".to_string(),
                sources: vec![
                    "https://example.com/physics/unit-1/questions".to_string(),
                    "https://example.com/physics/unit-1/previous-year".to_string(),
                ],
                base_url: None,
                enabled: false,
            }],
        }
    }
}
