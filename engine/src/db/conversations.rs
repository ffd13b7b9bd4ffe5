//! Conversation History Repository
//!
//! Write-once conversation records, read back for recency-ordered recall.
//! Records are never updated or deleted by the engine; retention is out of
//! scope for the durable store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// One persisted conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub user_message: String,
    pub assistant_response: String,
    pub intent: Option<String>,
    pub skills_used: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Create a record timestamped now
    pub fn new(
        user_message: impl Into<String>,
        assistant_response: impl Into<String>,
        intent: Option<String>,
        skills_used: Vec<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_response: assistant_response.into(),
            intent,
            skills_used,
            created_at: Utc::now(),
        }
    }
}

/// Repository for conversation history
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a conversation record
    pub async fn insert(&self, record: &ConversationRecord) -> Result<()> {
        let skills_json = if record.skills_used.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.skills_used)?)
        };

        sqlx::query(
            r#"
            INSERT INTO conversation_history
                (user_message, assistant_response, intent, skills_used, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_message)
        .bind(&record.assistant_response)
        .bind(&record.intent)
        .bind(skills_json)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert conversation record")?;
        Ok(())
    }

    /// Get the `limit` most recent conversation turns.
    ///
    /// The most recent page is selected, then reversed, so callers always
    /// see the window in chronological (oldest-first) order.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ConversationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT user_message, assistant_response, intent, skills_used, created_at
            FROM conversation_history
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query conversation history")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let skills_json: Option<String> = row.get("skills_used");
            let skills_used = skills_json
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default();
            let created_raw: String = row.get("created_at");
            let created_at = DateTime::parse_from_rfc3339(&created_raw)
                .context("Invalid created_at timestamp in conversation history")?
                .with_timezone(&Utc);

            records.push(ConversationRecord {
                user_message: row.get("user_message"),
                assistant_response: row.get("assistant_response"),
                intent: row.get("intent"),
                skills_used,
                created_at,
            });
        }

        records.reverse();
        Ok(records)
    }
}
