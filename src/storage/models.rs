use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::parser::QuestionRecord;
use crate::utils::QpResult;

/// 题库中的一行；images 以 JSON 数组存储
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredQuestion {
    pub id: i64,
    pub dedup_key: String,
    pub text: String,
    pub images: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl StoredQuestion {
    pub fn into_record(self) -> QpResult<QuestionRecord> {
        let images: Vec<String> = serde_json::from_str(&self.images)?;
        Ok(QuestionRecord::from_parts(self.text, self.dedup_key, images))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CollectionRun {
    pub id: i64,
    pub source: String,
    pub question_count: i64,
    pub error: Option<String>,
    pub created_at: Option<String>,
}
