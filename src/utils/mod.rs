pub mod logger;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QpError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("来源获取失败 [{source_id}]: {message}")]
    SourceFetch { source_id: String, message: String },

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("网络请求错误: {0}")]
    Network(#[from] reqwest::Error),

    #[error("解析错误: {0}")]
    Parse(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML解析错误: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML生成错误: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("配置加载错误: {0}")]
    Settings(#[from] ::config::ConfigError),
}

impl QpError {
    pub fn source_fetch(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        QpError::SourceFetch {
            source_id: source_id.into(),
            message: message.into(),
        }
    }
}

pub type QpResult<T> = Result<T, QpError>;
