use reqwest::Url;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// 祖先链最多向上走的层数
const MAX_ANCESTOR_DEPTH: usize = 512;

static BASE_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("base selector"));

/// 文档顺序中的一个非空文本节点
#[derive(Debug, Clone, Copy)]
pub struct TextLeaf<'a> {
    pub text: &'a str,
    /// 文本所在的元素
    pub node: ElementRef<'a>,
    /// 位置提示：该文本在所有文本节点中的序号
    pub position: usize,
    /// 在整棵文档树中的先序序号，可与图片的序号比较先后
    pub order: usize,
}

/// 文档中的一张图片及其绝对地址
#[derive(Debug, Clone)]
pub struct PageImage<'a> {
    pub node: ElementRef<'a>,
    pub order: usize,
    pub url: String,
}

/// 解析后的页面，附带解析相对图片地址所需的基础URL
pub struct PageDom {
    document: Html,
    base_url: Url,
}

impl PageDom {
    pub fn parse(html: &str, base_url: &Url) -> Self {
        let document = Html::parse_document(html);

        let base_url = document
            .select(&BASE_HREF)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| base_url.join(href.trim()).ok())
            .unwrap_or_else(|| base_url.clone());

        Self { document, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 按文档顺序收集全部非空文本（跳过 script/style）
    pub fn text_leaves(&self) -> Vec<TextLeaf<'_>> {
        let mut leaves = Vec::new();

        for (order, node) in self.document.root_element().descendants().enumerate() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if matches!(parent.value().name(), "script" | "style") {
                continue;
            }

            leaves.push(TextLeaf {
                text: trimmed,
                node: parent,
                position: leaves.len(),
                order,
            });
        }

        debug!("页面文本节点数: {}", leaves.len());
        leaves
    }

    /// node 是否就是 anchor，或位于 anchor 之下
    pub fn is_within(node: ElementRef<'_>, anchor: ElementRef<'_>) -> bool {
        let target = anchor.id();
        let mut current = Some(*node);

        for _ in 0..MAX_ANCESTOR_DEPTH {
            match current {
                Some(n) if n.id() == target => return true,
                Some(n) => current = n.parent(),
                None => return false,
            }
        }
        false
    }

    /// `<html>`/`<body>` 这类覆盖整页的容器
    pub fn is_page_container(node: ElementRef<'_>) -> bool {
        matches!(node.value().name(), "html" | "body")
    }

    /// 全部可用图片，按文档顺序；序号与 [`TextLeaf::order`] 同源
    pub fn images(&self) -> Vec<PageImage<'_>> {
        self.document
            .root_element()
            .descendants()
            .enumerate()
            .filter_map(|(order, node)| {
                let img = ElementRef::wrap(node)?;
                if img.value().name() != "img" {
                    return None;
                }
                let value = img.value();
                let src = [value.attr("src"), value.attr("data-src")]
                    .into_iter()
                    .flatten()
                    .map(str::trim)
                    .find(|s| !s.is_empty() && !s.starts_with("data:"))?;
                let url = self.resolve(src)?;
                Some(PageImage { node: img, order, url })
            })
            .collect()
    }

    fn resolve(&self, src: &str) -> Option<String> {
        match self.base_url.join(src) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                debug!("无法解析图片地址 {}: {}", src, e);
                None
            }
        }
    }
}
