use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::page_fetcher::PageFetcher;
use crate::config::{AppConfig, ExtractorConfig};
use crate::parser::{QuestionExtractor, QuestionMerger, QuestionRecord};
use crate::utils::{QpError, QpResult};

/// 某个来源的失败信息
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct PageSummary {
    pub source: String,
    pub question_count: usize,
}

/// 一次批量采集的最终结果，全部来源处理完后一次性交付
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub questions: Vec<QuestionRecord>,
    pub pages: Vec<PageSummary>,
    pub failures: Vec<SourceFailure>,
}

impl BatchOutcome {
    /// 部分失败的摘要：列出前三个失败来源（消息只取首行），其余计数
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let mut lines: Vec<String> = self
            .failures
            .iter()
            .take(3)
            .map(|f| format!("{}: {}", f.source, f.message.lines().next().unwrap_or_default()))
            .collect();
        if self.failures.len() > 3 {
            lines.push(format!("... 另有 {} 个来源失败", self.failures.len() - 3));
        }
        Some(lines.join("\n"))
    }
}

pub struct Collector {
    fetcher: PageFetcher,
    extractor: ExtractorConfig,
    request_delay: Duration,
    max_sources: usize,
}

impl Collector {
    pub fn new(config: &AppConfig, fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            extractor: config.extractor.clone(),
            request_delay: Duration::from_millis(config.fetcher.request_delay_ms),
            max_sources: config.fetcher.max_sources,
        }
    }

    /// 检查来源列表：非空、不超过上限、带协议的地址必须是 http(s)
    pub fn validate_sources(&self, sources: &[String]) -> QpResult<Vec<String>> {
        let sources: Vec<String> = sources
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if sources.is_empty() {
            return Err(QpError::Config("至少需要一个来源".to_string()));
        }
        if sources.len() > self.max_sources {
            return Err(QpError::Config(format!(
                "来源数量 {} 超过上限 {}",
                sources.len(),
                self.max_sources
            )));
        }
        if let Some(bad) = sources
            .iter()
            .find(|s| s.contains("://") && !PageFetcher::is_remote(s))
        {
            return Err(QpError::Config(format!("远程来源必须以 http 开头: {}", bad)));
        }
        Ok(sources)
    }

    /// 在后台任务中运行整批采集，调用方等待返回的句柄即可拿到最终结果
    pub fn spawn(self, sources: Vec<String>) -> JoinHandle<BatchOutcome> {
        tokio::spawn(self.collect(sources))
    }

    pub async fn collect(self, sources: Vec<String>) -> BatchOutcome {
        let total = sources.len();
        let mut merger = QuestionMerger::new(self.extractor.max_images_per_question);
        let mut outcome = BatchOutcome::default();

        for (i, source) in sources.iter().enumerate() {
            info!("正在加载 {}/{}: {}", i + 1, total, source);

            if i > 0 && PageFetcher::is_remote(source) && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let page = match self.fetcher.fetch(source).await {
                Ok(page) => page,
                Err(e) => {
                    error!("来源处理失败 {}: {}", source, e);
                    outcome.failures.push(SourceFailure {
                        source: source.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            debug!("页面 {} 共 {} 字节", page.source, page.html.len());
            let extractor = QuestionExtractor::new(self.extractor.clone());
            let extracted = tokio::task::spawn_blocking(move || {
                extractor.extract(&page.html, &page.base_url)
            })
            .await;

            match extracted {
                Ok(questions) => {
                    outcome.pages.push(PageSummary {
                        source: source.clone(),
                        question_count: questions.len(),
                    });
                    merger.absorb(questions);
                }
                Err(e) => {
                    error!("页面提取异常 {}: {}", source, e);
                    outcome.failures.push(SourceFailure {
                        source: source.clone(),
                        message: format!("提取过程异常终止: {}", e),
                    });
                }
            }
        }

        outcome.questions = merger.into_records();
        info!(
            "采集完成: {} 个来源, {} 道去重后的题目, {} 个失败",
            total,
            outcome.questions.len(),
            outcome.failures.len()
        );
        if let Some(summary) = outcome.failure_summary() {
            warn!("部分来源未能处理:\n{}", summary);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(config: &AppConfig) -> Collector {
        let fetcher = PageFetcher::new(&config.fetcher).unwrap();
        Collector::new(config, fetcher)
    }

    fn write_page(dir: &std::path::Path, name: &str, html: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, html).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn missing_middle_source_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_page(
            dir.path(),
            "a.html",
            r#"<div>1. What is gravity?<p>a) A force</p><p>b) A wave</p><img src="g1.png"></div>"#,
        );
        let missing = dir.path().join("missing.html").to_str().unwrap().to_string();
        let third = write_page(
            dir.path(),
            "c.html",
            r#"<div>Q. What is gravity?<img src="g2.png"></div><div>Q2. Define work</div>"#,
        );

        let config = AppConfig::default();
        let outcome = collector(&config)
            .spawn(vec![first, missing.clone(), third])
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, missing);
        assert_eq!(outcome.pages.len(), 2);

        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.questions[0].text(), "What is gravity?\na) A force\nb) A wave");
        assert_eq!(outcome.questions[0].images().len(), 2);
        assert!(outcome.questions[0].images()[0].ends_with("/g1.png"));
        assert!(outcome.questions[0].images()[1].ends_with("/g2.png"));
        assert_eq!(outcome.questions[1].text(), "Define work");
    }

    #[tokio::test]
    async fn pages_without_questions_give_an_empty_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), "home.html", "<p>Home</p><p>a) stray option</p>");

        let outcome = collector(&AppConfig::default())
            .collect(vec![page.clone()])
            .await;

        assert!(outcome.questions.is_empty());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].source, page);
        assert_eq!(outcome.pages[0].question_count, 0);
    }

    #[test]
    fn source_list_is_validated() {
        let mut config = AppConfig::default();
        config.fetcher.max_sources = 2;
        let collector = collector(&config);

        assert!(collector.validate_sources(&[]).is_err());
        assert!(collector.validate_sources(&["  ".to_string()]).is_err());
        assert!(collector
            .validate_sources(&["a.html".into(), "b.html".into(), "c.html".into()])
            .is_err());
        assert!(collector
            .validate_sources(&["ftp://exam.example/paper".into()])
            .is_err());

        let ok = collector
            .validate_sources(&[" https://exam.example/p1 ".into(), "saved.html".into()])
            .unwrap();
        assert_eq!(ok, vec!["https://exam.example/p1", "saved.html"]);
    }

    #[test]
    fn summary_lists_three_failures_then_a_count() {
        let failures = (1..=5)
            .map(|i| SourceFailure {
                source: format!("s{}", i),
                message: format!("timeout\nstack line {}", i),
            })
            .collect();
        let outcome = BatchOutcome {
            failures,
            ..BatchOutcome::default()
        };

        let summary = outcome.failure_summary().unwrap();
        assert_eq!(
            summary,
            "s1: timeout\ns2: timeout\ns3: timeout\n... 另有 2 个来源失败"
        );
        assert!(BatchOutcome::default().failure_summary().is_none());
    }
}
