//! Highlights database operations

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::highlights::Highlight;

/// Highlight row including peer-side counters
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HighlightRecord {
    pub id: i64,
    pub page_id: i64,
    pub user_id: Option<String>,
    pub text: String,
    pub path: String,
    pub start_offset: i64,
    pub end_offset: i64,
    pub upvotes: i64,
    pub blacklists: i64,
    pub created_at: String,
}

impl HighlightRecord {
    pub fn into_highlight(self) -> Highlight {
        Highlight {
            id: Some(self.id),
            page_id: Some(self.page_id),
            text: self.text,
            path: self.path,
            start_offset: usize::try_from(self.start_offset).unwrap_or_default(),
            end_offset: usize::try_from(self.end_offset).unwrap_or_default(),
            user_id: self.user_id,
        }
    }
}

/// Highlight repository
pub struct HighlightRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HighlightRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Id of the page with this hash, creating it if needed
    pub async fn page_id(&self, page_hash: u32) -> Result<i64> {
        sqlx::query("INSERT OR IGNORE INTO pages (page_hash) VALUES (?)")
            .bind(i64::from(page_hash))
            .execute(self.pool)
            .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM pages WHERE page_hash = ?")
            .bind(i64::from(page_hash))
            .fetch_one(self.pool)
            .await?;

        Ok(id)
    }

    /// Get a specific highlight
    pub async fn get(&self, id: i64) -> Result<Option<HighlightRecord>> {
        let record = sqlx::query_as::<_, HighlightRecord>(
            r#"
            SELECT id, page_id, user_id, text, path, start_offset, end_offset,
                   upvotes, blacklists, created_at
            FROM highlights
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Canonical highlight list of a page, oldest first
    pub async fn list_for_page(&self, page_hash: u32) -> Result<Vec<Highlight>> {
        let records = sqlx::query_as::<_, HighlightRecord>(
            r#"
            SELECT h.id, h.page_id, h.user_id, h.text, h.path, h.start_offset,
                   h.end_offset, h.upvotes, h.blacklists, h.created_at
            FROM highlights h
            JOIN pages p ON p.id = h.page_id
            WHERE p.page_hash = ?
            ORDER BY h.id ASC
            "#,
        )
        .bind(i64::from(page_hash))
        .fetch_all(self.pool)
        .await?;

        Ok(records.into_iter().map(HighlightRecord::into_highlight).collect())
    }

    /// Insert new highlights, ignoring ones already stored for the page,
    /// and return the page's canonical list
    pub async fn upsert_batch(
        &self,
        page_hash: u32,
        batch: &[Highlight],
        user_id: Option<&str>,
    ) -> Result<Vec<Highlight>> {
        let page_id = self.page_id(page_hash).await?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        for highlight in batch {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO highlights (
                    page_id, user_id, text, path, start_offset, end_offset, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(page_id)
            .bind(user_id.or(highlight.user_id.as_deref()))
            .bind(&highlight.text)
            .bind(&highlight.path)
            .bind(highlight.start_offset as i64)
            .bind(highlight.end_offset as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.list_for_page(page_hash).await
    }

    /// Count a blacklist vote; false if the highlight does not exist
    pub async fn blacklist(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE highlights SET blacklists = blacklists + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count an upvote; false if the highlight does not exist
    pub async fn upvote(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE highlights SET upvotes = upvotes + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
