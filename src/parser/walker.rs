use scraper::ElementRef;
use tracing::debug;

use super::classifier::{is_option_line, is_question_opener};
use super::dom::{PageDom, PageImage, TextLeaf};
use super::enumeration::strip;
use super::QuestionRecord;
use crate::config::ExtractorConfig;

enum WalkState<'a> {
    NoCurrentQuestion,
    Accumulating {
        current: QuestionRecord,
        anchor: ElementRef<'a>,
        anchor_position: usize,
        /// 只收集文档顺序位于 (start, end) 之间的图片
        start: usize,
        end: usize,
    },
}

/// 按文档顺序遍历文本节点，把题干、选项和图片组装成题目
pub struct DocumentWalker<'a> {
    dom: &'a PageDom,
    images: Vec<PageImage<'a>>,
    max_images: usize,
    window: usize,
    state: WalkState<'a>,
    sealed: Vec<QuestionRecord>,
}

impl<'a> DocumentWalker<'a> {
    pub fn new(dom: &'a PageDom, config: &ExtractorConfig) -> Self {
        Self {
            dom,
            images: dom.images(),
            max_images: config.max_images_per_question,
            window: config.option_proximity_window,
            state: WalkState::NoCurrentQuestion,
            sealed: Vec::new(),
        }
    }

    pub fn walk(mut self) -> Vec<QuestionRecord> {
        let leaves = self.dom.text_leaves();
        let openers: Vec<bool> = leaves.iter().map(|l| is_question_opener(l.text)).collect();

        // 每个文本节点之后下一道题题干的文档序号
        let mut next_opener = vec![usize::MAX; leaves.len()];
        let mut upcoming = usize::MAX;
        for i in (0..leaves.len()).rev() {
            next_opener[i] = upcoming;
            if openers[i] {
                upcoming = leaves[i].order;
            }
        }

        for (i, leaf) in leaves.into_iter().enumerate() {
            if openers[i] {
                self.open(leaf, next_opener[i]);
            } else {
                self.step(leaf);
            }
        }
        self.seal();
        self.sealed
    }

    fn step(&mut self, leaf: TextLeaf<'a>) {
        let WalkState::Accumulating {
            current,
            anchor,
            anchor_position,
            start,
            end,
        } = &mut self.state
        else {
            return;
        };

        let within = PageDom::is_within(leaf.node, *anchor);
        let near = leaf.position.abs_diff(*anchor_position) <= self.window;

        if (within || near) && is_option_line(leaf.text) {
            current.append_line(leaf.text);
        }
        if within {
            attach_images(&self.images, current, leaf.node, (*start, *end), self.max_images);
        }
    }

    fn open(&mut self, leaf: TextLeaf<'a>, end: usize) {
        self.seal();

        let stripped = strip(leaf.text);
        let stem = if stripped.is_empty() { leaf.text } else { stripped.as_str() };
        let mut current = QuestionRecord::new(stem);
        attach_images(&self.images, &mut current, leaf.node, (leaf.order, end), self.max_images);

        self.state = WalkState::Accumulating {
            current,
            anchor: leaf.node,
            anchor_position: leaf.position,
            start: leaf.order,
            end,
        };
    }

    fn seal(&mut self) {
        let state = std::mem::replace(&mut self.state, WalkState::NoCurrentQuestion);
        if let WalkState::Accumulating { current, .. } = state {
            debug!("题目完成: {}", crate::utils::logger::preview(current.text(), 60));
            self.sealed.push(current);
        }
    }
}

/// 把 node 之下、文档顺序落在 range 开区间内的图片加入题目
fn attach_images(
    images: &[PageImage<'_>],
    record: &mut QuestionRecord,
    node: ElementRef<'_>,
    (start, end): (usize, usize),
    cap: usize,
) {
    if PageDom::is_page_container(node) {
        return;
    }
    let from = images.partition_point(|img| img.order <= start);
    let to = images.partition_point(|img| img.order < end);
    if from >= to {
        return;
    }
    for img in &images[from..to] {
        if PageDom::is_within(img.node, node) {
            record.add_image(&img.url, cap);
        }
    }
}
