use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::any::{AnyPool, AnyPoolOptions};
use sqlx::FromRow;
use tracing::info;

use super::{Storage, StorageResult};
use crate::models::PasteRecord;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS pastes (
    id          TEXT PRIMARY KEY,
    content     TEXT NOT NULL,
    title       TEXT NOT NULL,
    syntax      TEXT NOT NULL,
    visibility  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NULL,
    views       INTEGER NOT NULL DEFAULT 0
)";

const SELECT_COLUMNS: &str =
    "SELECT id, content, title, syntax, visibility, created_at, expires_at, views FROM pastes";

/// Pastes in a single SQL table. Timestamps are stored as RFC 3339 text.
#[derive(Clone)]
pub struct SqlStorage {
    pool: AnyPool,
}

#[derive(FromRow)]
struct PasteRow {
    id: String,
    content: String,
    title: String,
    syntax: String,
    visibility: String,
    created_at: String,
    expires_at: Option<String>,
    views: i64,
}

impl TryFrom<PasteRow> for PasteRecord {
    type Error = chrono::ParseError;

    fn try_from(row: PasteRow) -> Result<Self, Self::Error> {
        Ok(PasteRecord {
            id: row.id,
            content: row.content,
            title: row.title,
            syntax: row.syntax,
            visibility: row.visibility,
            created_at: parse_timestamp(&row.created_at)?,
            expires_at: row.expires_at.as_deref().map(parse_timestamp).transpose()?,
            views: row.views,
        })
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

impl SqlStorage {
    /// Connect to a database by URL and make sure the table exists.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!("connected to paste database");

        Ok(Self { pool })
    }
}

impl Storage for SqlStorage {
    async fn put(&mut self, paste: &PasteRecord) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO pastes (id, content, title, syntax, visibility, created_at, expires_at, \
             views) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&paste.id)
        .bind(&paste.content)
        .bind(&paste.title)
        .bind(&paste.syntax)
        .bind(&paste.visibility)
        .bind(format_timestamp(&paste.created_at))
        .bind(paste.expires_at.as_ref().map(format_timestamp))
        .bind(paste.views)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&mut self, id: &str) -> StorageResult<Option<PasteRecord>> {
        let row = sqlx::query_as::<_, PasteRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PasteRecord::try_from).transpose()?)
    }

    async fn list_all(&mut self) -> StorageResult<Vec<PasteRecord>> {
        let rows = sqlx::query_as::<_, PasteRow>(SELECT_COLUMNS)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(PasteRecord::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn increment_views(&mut self, id: &str) -> StorageResult<()> {
        sqlx::query("UPDATE pastes SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> StorageResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
