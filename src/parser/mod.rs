pub mod classifier;
pub mod dom;
pub mod enumeration;
pub mod merger;
pub mod walker;

pub use dom::PageDom;
pub use merger::QuestionMerger;
pub use walker::DocumentWalker;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ExtractorConfig;

/// 一道题：题干 + 选项/小问行，以及附带的图片地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    text: String,
    key: String,
    images: Vec<String>,
}

impl QuestionRecord {
    /// 以题干创建题目，去重键只在这里由题干计算一次
    pub fn new(stem: &str) -> Self {
        let stem = stem.trim();
        Self {
            text: stem.to_string(),
            key: stem.to_lowercase(),
            images: Vec::new(),
        }
    }

    /// 从已持久化的数据还原
    pub fn from_parts(text: String, key: String, images: Vec<String>) -> Self {
        Self { text, key, images }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn last_line(&self) -> &str {
        self.text.lines().last().unwrap_or_default().trim()
    }

    /// 追加一行选项/续行；与最后一行（忽略大小写）重复时跳过
    pub fn append_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || line.to_lowercase() == self.last_line().to_lowercase() {
            return false;
        }
        self.text.push('\n');
        self.text.push_str(line);
        true
    }

    /// 添加图片；重复地址或已达上限时丢弃
    pub fn add_image(&mut self, url: &str, cap: usize) -> bool {
        if self.images.len() >= cap || self.images.iter().any(|u| u == url) {
            return false;
        }
        self.images.push(url.to_string());
        true
    }

    /// 合并另一来源同一道题的图片，返回新增数量
    pub fn absorb_images(&mut self, urls: &[String], cap: usize) -> usize {
        urls.iter().filter(|url| self.add_image(url, cap)).count()
    }

    pub fn truncate_images(&mut self, cap: usize) {
        self.images.truncate(cap);
    }
}

/// 单个页面的题目提取：解析HTML并运行文档遍历
pub struct QuestionExtractor {
    config: ExtractorConfig,
}

impl QuestionExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, html: &str, base_url: &Url) -> Vec<QuestionRecord> {
        let dom = PageDom::parse(html, base_url);
        let questions = DocumentWalker::new(&dom, &self.config).walk();

        if questions.is_empty() {
            warn!("页面中未识别到题目: {}", dom.base_url());
        } else {
            let images: usize = questions.iter().map(|q| q.images().len()).sum();
            info!("页面 {} 提取到 {} 道题, {} 张图", dom.base_url(), questions.len(), images);
        }
        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_fixed_at_creation() {
        let mut q = QuestionRecord::new("  What is Gravity?  ");
        assert_eq!(q.key(), "what is gravity?");
        q.append_line("a) A force");
        assert_eq!(q.key(), "what is gravity?");
        assert_eq!(q.text(), "What is Gravity?\na) A force");
    }

    #[test]
    fn repeated_last_line_is_not_appended() {
        let mut q = QuestionRecord::new("Which is a vector?");
        assert!(q.append_line("a) velocity"));
        assert!(!q.append_line("  A) VELOCITY "));
        assert!(q.append_line("b) speed"));
        assert!(q.append_line("a) velocity"));
        assert_eq!(q.text().lines().count(), 4);
    }

    #[test]
    fn images_are_capped_and_deduplicated() {
        let mut q = QuestionRecord::new("Draw the circuit");
        assert!(q.add_image("https://x/1.png", 2));
        assert!(!q.add_image("https://x/1.png", 2));
        assert!(q.add_image("https://x/2.png", 2));
        assert!(!q.add_image("https://x/3.png", 2));
        assert_eq!(q.images(), ["https://x/1.png", "https://x/2.png"]);
    }

    #[test]
    fn extractor_reports_empty_pages_as_empty() {
        let extractor = QuestionExtractor::new(ExtractorConfig::default());
        let base = Url::parse("https://exam.example/").unwrap();
        let questions = extractor.extract("<p>Nothing to see here</p>", &base);
        assert!(questions.is_empty());
    }
}
