use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::parser::QuestionRecord;
use crate::storage::models::{CollectionRun, StoredQuestion};
use crate::utils::QpResult;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub merged: usize,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_path: &str) -> QpResult<Self> {
        if let Some(dir) = std::path::Path::new(database_path).parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        info!("数据库连接成功: {}", database_path);
        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> QpResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dedup_key TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                images TEXT NOT NULL DEFAULT '[]',
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                question_count INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("数据库表结构初始化完成");
        Ok(())
    }

    /// 把一批题目并入题库：新题插入；已有的题只合并图片，题干和选项保持不变
    pub async fn save_questions(
        &self,
        questions: &[QuestionRecord],
        max_images: usize,
    ) -> QpResult<SaveSummary> {
        let mut tx = self.pool.begin().await?;
        let mut summary = SaveSummary::default();

        for question in questions {
            let key = question.key().to_lowercase();
            let existing = sqlx::query_as::<_, StoredQuestion>(
                "SELECT * FROM questions WHERE dedup_key = ?",
            )
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                None => {
                    let images: Vec<&String> = question.images().iter().take(max_images).collect();
                    sqlx::query("INSERT INTO questions (dedup_key, text, images) VALUES (?, ?, ?)")
                        .bind(&key)
                        .bind(question.text())
                        .bind(serde_json::to_string(&images)?)
                        .execute(&mut *tx)
                        .await?;
                    summary.inserted += 1;
                }
                Some(row) => {
                    let id = row.id;
                    let mut stored = row.into_record()?;
                    let added = stored.absorb_images(question.images(), max_images);
                    if added > 0 {
                        sqlx::query(
                            "UPDATE questions SET images = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                        )
                        .bind(serde_json::to_string(stored.images())?)
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    }
                    debug!("题库中已有 [{}]，新增 {} 张图", key, added);
                    summary.merged += 1;
                }
            }
        }

        tx.commit().await?;
        info!(
            "题库保存完成: 新增 {} 道, 合并 {} 道",
            summary.inserted, summary.merged
        );
        Ok(summary)
    }

    /// 按入库顺序读取全部题目
    pub async fn load_questions(&self) -> QpResult<Vec<QuestionRecord>> {
        let rows = sqlx::query_as::<_, StoredQuestion>("SELECT * FROM questions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StoredQuestion::into_record).collect()
    }

    pub async fn record_run(
        &self,
        source: &str,
        question_count: usize,
        error: Option<&str>,
    ) -> QpResult<i64> {
        let result = sqlx::query(
            "INSERT INTO collection_runs (source, question_count, error) VALUES (?, ?, ?)",
        )
        .bind(source)
        .bind(question_count as i64)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn recent_runs(&self, limit: i64) -> QpResult<Vec<CollectionRun>> {
        let runs = sqlx::query_as::<_, CollectionRun>(
            "SELECT * FROM collection_runs ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(runs)
    }

    pub async fn clear_all_tables(&self) -> QpResult<()> {
        sqlx::query("DELETE FROM questions").execute(&self.pool).await?;
        sqlx::query("DELETE FROM collection_runs").execute(&self.pool).await?;
        info!("已清空题库与采集记录");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("bank").join("questions.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.init_schema().await.unwrap();
        db
    }

    fn question(stem: &str, lines: &[&str], images: &[&str]) -> QuestionRecord {
        let mut q = QuestionRecord::new(stem);
        for line in lines {
            q.append_line(line);
        }
        for url in images {
            q.add_image(url, usize::MAX);
        }
        q
    }

    #[tokio::test]
    async fn known_keys_merge_images_and_keep_text() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let first = question("What is gravity?", &["a) A force"], &["https://a/g1.png"]);
        let summary = db.save_questions(&[first], 6).await.unwrap();
        assert_eq!(summary, SaveSummary { inserted: 1, merged: 0 });

        let again = question("WHAT IS GRAVITY?", &["z) other"], &["https://a/g1.png", "https://b/g2.png"]);
        let summary = db.save_questions(&[again], 6).await.unwrap();
        assert_eq!(summary, SaveSummary { inserted: 0, merged: 1 });

        let bank = db.load_questions().await.unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank[0].text(), "What is gravity?\na) A force");
        assert_eq!(bank[0].images(), ["https://a/g1.png", "https://b/g2.png"]);
    }

    #[tokio::test]
    async fn bank_keeps_insertion_order_and_cap() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        let urls: Vec<String> = (0..5).map(|i| format!("https://x/{}.png", i)).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

        db.save_questions(&[question("B?", &[], &refs[..2]), question("A?", &[], &[])], 3)
            .await
            .unwrap();
        db.save_questions(&[question("C?", &[], &[]), question("B?", &[], &refs[2..])], 3)
            .await
            .unwrap();

        let bank = db.load_questions().await.unwrap();
        let keys: Vec<&str> = bank.iter().map(|q| q.key()).collect();
        assert_eq!(keys, vec!["b?", "a?", "c?"]);
        assert_eq!(bank[0].images().len(), 3);
    }

    #[tokio::test]
    async fn runs_are_recorded_and_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;

        db.record_run("https://exam.example/p1", 12, None).await.unwrap();
        db.record_run("missing.html", 0, Some("本地快照文件不存在")).await.unwrap();
        db.save_questions(&[question("Define work", &[], &[])], 6).await.unwrap();

        let runs = db.recent_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].source, "missing.html");
        assert_eq!(runs[0].error.as_deref(), Some("本地快照文件不存在"));
        assert_eq!(runs[1].question_count, 12);

        db.clear_all_tables().await.unwrap();
        assert!(db.load_questions().await.unwrap().is_empty());
        assert!(db.recent_runs(10).await.unwrap().is_empty());
    }
}
