//! Preference and Fact Repositories
//!
//! Key-value stores for durable user preferences and facts. Saving is an
//! upsert: an existing key gets its value and updated_at replaced, a new
//! key is inserted. Concurrent upserts to the same key are serialized by
//! SQLite; the latest write wins. There is no deletion path.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Repository for user preferences
pub struct PreferenceStore {
    pool: SqlitePool,
}

impl PreferenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save or update a preference
    pub async fn upsert(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to upsert preference")?;
        Ok(())
    }

    /// Get a preference by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM user_preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query preference")?;
        Ok(row.map(|r| r.get("value")))
    }

    /// Get all preferences as a map
    pub async fn get_all(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT key, value FROM user_preferences ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("Failed to query preferences")?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get("key"), r.get("value")))
            .collect())
    }
}

/// Repository for durable user facts
pub struct FactStore {
    pool: SqlitePool,
}

impl FactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save or update a fact
    pub async fn upsert(&self, fact_key: &str, fact_value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO user_facts (fact_key, fact_value, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(fact_key) DO UPDATE SET
                fact_value = excluded.fact_value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(fact_key)
        .bind(fact_value)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to upsert fact")?;
        Ok(())
    }

    /// Get a fact by key
    pub async fn get(&self, fact_key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT fact_value FROM user_facts WHERE fact_key = ?")
            .bind(fact_key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query fact")?;
        Ok(row.map(|r| r.get("fact_value")))
    }

    /// Get all facts as (key, value) pairs, ordered by key
    pub async fn get_all(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT fact_key, fact_value FROM user_facts ORDER BY fact_key")
            .fetch_all(&self.pool)
            .await
            .context("Failed to query facts")?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get("fact_key"), r.get("fact_value")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("test.db")).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_preference_upsert_round_trip() {
        let (_dir, db) = setup().await;
        let prefs = db.preferences();

        prefs.upsert("tone_style", "casual").await.unwrap();
        prefs.upsert("tone_style", "formal").await.unwrap();

        assert_eq!(
            prefs.get("tone_style").await.unwrap(),
            Some("formal".to_string())
        );

        let all = prefs.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("tone_style"), Some(&"formal".to_string()));
    }

    #[tokio::test]
    async fn test_preference_missing_key() {
        let (_dir, db) = setup().await;
        assert_eq!(db.preferences().get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fact_upsert_updates_value() {
        let (_dir, db) = setup().await;
        let facts = db.facts();

        facts.upsert("job", "engineer").await.unwrap();
        facts.upsert("location", "Berlin").await.unwrap();
        facts.upsert("job", "designer").await.unwrap();

        assert_eq!(facts.get("job").await.unwrap(), Some("designer".to_string()));

        let all = facts.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "job");
        assert_eq!(all[1].0, "location");
    }
}
