use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::FetcherConfig;
use crate::parser::QuestionRecord;
use crate::utils::{QpError, QpResult};

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

/// 下载题目配图。只读取题目中的图片地址，不修改题目本身。
pub struct ImageDownloader {
    client: Client,
}

impl ImageDownloader {
    pub fn new(config: &FetcherConfig) -> QpResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// 按 `q{题号}_{序号}.{扩展名}` 保存所选题目的图片；单张失败只记录不中断
    pub async fn download_all(
        &self,
        selected: &[(usize, &QuestionRecord)],
        dir: &Path,
    ) -> QpResult<DownloadReport> {
        tokio::fs::create_dir_all(dir).await?;
        let mut report = DownloadReport::default();

        for (number, question) in selected {
            for (i, url) in question.images().iter().enumerate() {
                let path = dir.join(format!("q{}_{}.{}", number, i + 1, extension_of(url)));
                match self.download(url, &path).await {
                    Ok(()) => report.saved.push(path),
                    Err(e) => {
                        warn!("图片下载失败 {}: {}", url, e);
                        report.failed.push((url.clone(), e.to_string()));
                    }
                }
            }
        }

        info!(
            "图片下载完成: 成功 {} 张, 失败 {} 张",
            report.saved.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn download(&self, url: &str, save_path: &Path) -> QpResult<()> {
        let parsed = Url::parse(url).map_err(|e| QpError::Parse(format!("无效的图片地址 {}: {}", url, e)))?;

        if parsed.scheme() == "file" {
            let local = parsed
                .to_file_path()
                .map_err(|_| QpError::Parse(format!("无法解析本地路径: {}", url)))?;
            tokio::fs::copy(&local, save_path).await?;
            return Ok(());
        }

        let response = self.client.get(parsed).send().await?;
        if !response.status().is_success() {
            return Err(QpError::source_fetch(url, format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(save_path, bytes).await?;
        Ok(())
    }
}

/// 从URL路径最后一段取扩展名，取不到时用 `img`
pub fn extension_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "img".to_string())
}
