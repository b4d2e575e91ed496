use reqwest::{Client, StatusCode, Url};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FetcherConfig;
use crate::storage::cache::Cache;
use crate::utils::{QpError, QpResult};

/// 已渲染好的页面：HTML 与解析相对地址用的基础URL
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub source: String,
    pub html: String,
    pub base_url: Url,
}

/// 获取来源页面。远程地址走 HTTP；其他来源视为浏览器保存下来的本地 HTML 快照。
pub struct PageFetcher {
    client: Client,
    max_retries: u32,
    base_override: Option<Url>,
    cache: Cache<String>,
}

impl PageFetcher {
    pub fn new(config: &FetcherConfig) -> QpResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            base_override: None,
            cache: Cache::new(config.cache_ttl_minutes),
        })
    }

    /// 指定解析图片地址时使用的基础URL（覆盖来源自身的地址）
    pub fn with_base_url(mut self, base_url: Option<Url>) -> Self {
        self.base_override = base_url;
        self
    }

    pub fn is_remote(source: &str) -> bool {
        let lower = source.trim().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    pub async fn fetch(&self, source: &str) -> QpResult<RenderedPage> {
        let source = source.trim();
        self.cache.clear_expired();
        let html = match self.cache.get(source) {
            Some(html) => {
                info!("使用缓存页面: {}", source);
                html
            }
            None => {
                let html = if Self::is_remote(source) {
                    self.fetch_remote(source).await?
                } else {
                    Self::read_snapshot(source).await?
                };
                self.cache.set(source.to_string(), html.clone());
                debug!("已缓存页面数: {}", self.cache.len());
                html
            }
        };

        let base_url = match &self.base_override {
            Some(url) => url.clone(),
            None => Self::source_url(source)?,
        };

        Ok(RenderedPage {
            source: source.to_string(),
            html,
            base_url,
        })
    }

    fn source_url(source: &str) -> QpResult<Url> {
        if Self::is_remote(source) {
            return Url::parse(source)
                .map_err(|e| QpError::source_fetch(source, format!("无效的URL: {}", e)));
        }
        let path = std::fs::canonicalize(source)?;
        Url::from_file_path(&path)
            .map_err(|_| QpError::source_fetch(source, "无法把路径转换为 file:// 地址"))
    }

    async fn fetch_remote(&self, url: &str) -> QpResult<String> {
        info!("正在获取页面: {}", url);

        for attempt in 1..=self.max_retries {
            let response = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("请求失败 (第 {}/{} 次): {}", attempt, self.max_retries, e);
                    if attempt == self.max_retries {
                        return Err(QpError::Network(e));
                    }
                    let delay = backoff(attempt);
                    info!("等待 {}s 后重试...", delay.as_secs());
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();
            if matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
            ) {
                warn!("{} 返回 {} (第 {}/{} 次尝试)", url, status, attempt, self.max_retries);
                if attempt < self.max_retries {
                    let delay = backoff(attempt);
                    info!("等待 {}s 后重试...", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            if !status.is_success() {
                return Err(QpError::source_fetch(url, format!("HTTP {}", status)));
            }

            let text = response.text().await?;
            info!("页面获取完成: {} ({} 字节)", url, text.len());
            return Ok(text);
        }

        Err(QpError::source_fetch(
            url,
            format!("重试 {} 次后仍然失败", self.max_retries),
        ))
    }

    async fn read_snapshot(path: &str) -> QpResult<String> {
        if !Path::new(path).is_file() {
            return Err(QpError::source_fetch(path, "本地快照文件不存在"));
        }
        info!("读取本地快照: {}", path);
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

/// 第 attempt 次失败后的等待时间
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2 * attempt as u64)
}
