//! User feedback: validation and persistence.
//!
//! Submissions arrive as `{firstName, lastName, opinion}`. All three fields
//! are required after trimming. Stored records gain an id and a UTC
//! timestamp. Two stores are provided: [`SqliteFeedbackStore`] for the
//! server and [`MemoryFeedbackStore`] for tests and `--no-db` runs.

use crate::error::ReportError;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS feedback (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    opinion TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_feedback_created ON feedback(created_at);
"#;

/// Feedback as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub opinion: String,
}

impl NewFeedback {
    /// Trim every field and reject the submission if any is empty.
    pub fn validate(self) -> Result<Self, ReportError> {
        let trimmed = Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            opinion: self.opinion.trim().to_string(),
        };
        if trimmed.first_name.is_empty() || trimmed.last_name.is_empty() || trimmed.opinion.is_empty()
        {
            return Err(ReportError::InvalidFeedback(
                "all fields are required".to_string(),
            ));
        }
        Ok(trimmed)
    }
}

/// A stored feedback record.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub opinion: String,
    pub created_at: String,
}

impl Feedback {
    fn from_new(new: NewFeedback) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            first_name: new.first_name,
            last_name: new.last_name,
            opinion: new.opinion,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Somewhere feedback can be kept.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Validate and store a submission.
    async fn insert(&self, feedback: NewFeedback) -> Result<Feedback, ReportError>;

    /// Most recent records first.
    async fn list(&self, limit: usize) -> Result<Vec<Feedback>, ReportError>;
}

// ── SQLite ───────────────────────────────────────────────────────────────────

pub struct SqliteFeedbackStore {
    pool: SqlitePool,
}

impl SqliteFeedbackStore {
    /// Open (creating if needed) the database at `database_url` and make
    /// sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, ReportError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(persistence)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(persistence)?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(persistence)?;

        info!("Feedback store ready at {}", database_url);
        Ok(Self { pool })
    }
}

fn persistence(e: sqlx::Error) -> ReportError {
    ReportError::PersistenceFailed(e.to_string())
}

#[async_trait]
impl FeedbackStore for SqliteFeedbackStore {
    async fn insert(&self, feedback: NewFeedback) -> Result<Feedback, ReportError> {
        let record = Feedback::from_new(feedback.validate()?);
        sqlx::query(
            r#"
            INSERT INTO feedback (id, first_name, last_name, opinion, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.opinion)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        debug!("Stored feedback {}", record.id);
        Ok(record)
    }

    async fn list(&self, limit: usize) -> Result<Vec<Feedback>, ReportError> {
        sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, first_name, last_name, opinion, created_at
            FROM feedback
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryFeedbackStore {
    records: RwLock<Vec<Feedback>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn insert(&self, feedback: NewFeedback) -> Result<Feedback, ReportError> {
        let record = Feedback::from_new(feedback.validate()?);
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self, limit: usize) -> Result<Vec<Feedback>, ReportError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
