use std::collections::HashMap;
use tracing::debug;

use super::QuestionRecord;

/// 跨页面合并题目：按去重键去重，保留首次出现的顺序，只合并图片
pub struct QuestionMerger {
    max_images: usize,
    records: Vec<QuestionRecord>,
    index: HashMap<String, usize>,
}

impl QuestionMerger {
    pub fn new(max_images: usize) -> Self {
        Self {
            max_images,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 合并一个页面的提取结果
    pub fn absorb(&mut self, page: Vec<QuestionRecord>) {
        for mut record in page {
            let key = record.key().to_lowercase();
            match self.index.get(&key) {
                Some(&i) => {
                    let added = self.records[i].absorb_images(record.images(), self.max_images);
                    debug!("重复题目 [{}]，新增 {} 张图", key, added);
                }
                None => {
                    record.truncate_images(self.max_images);
                    self.index.insert(key, self.records.len());
                    self.records.push(record);
                }
            }
        }
    }

    pub fn into_records(self) -> Vec<QuestionRecord> {
        self.records
    }
}
