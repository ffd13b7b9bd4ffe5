//! Semantic Memory Index
//!
//! Append-only vector index over free-text conversation records. Entries
//! store the document text, a metadata map, and the embedding as a
//! little-endian f32 BLOB in the same SQLite file as the structured store.
//! Queries scan stored vectors and rank by cosine distance to the query
//! embedding.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// One ranked semantic search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHit {
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub distance: f32,
}

/// SQLite-backed vector index
pub struct SemanticIndex {
    pool: SqlitePool,
}

impl SemanticIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document with its metadata and embedding
    pub async fn insert(
        &self,
        id: &str,
        document: &str,
        metadata: &HashMap<String, String>,
        embedding: &[f32],
    ) -> Result<()> {
        let metadata_json =
            serde_json::to_string(metadata).context("Failed to serialize metadata")?;

        sqlx::query(
            r#"
            INSERT INTO semantic_memory (id, document, metadata, embedding)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(document)
        .bind(metadata_json)
        .bind(encode_embedding(embedding))
        .execute(&self.pool)
        .await
        .context("Failed to insert semantic memory entry")?;
        Ok(())
    }

    /// Return the `k` entries nearest to the query embedding, closest first
    pub async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SemanticHit>> {
        let rows = sqlx::query("SELECT document, metadata, embedding FROM semantic_memory")
            .fetch_all(&self.pool)
            .await
            .context("Failed to scan semantic memory")?;

        let mut hits: Vec<SemanticHit> = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.get("embedding");
            let embedding = decode_embedding(&blob);
            let distance = 1.0 - cosine_similarity(query_embedding, &embedding);

            let metadata_json: String = row.get("metadata");
            let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

            hits.push(SemanticHit {
                content: row.get("document"),
                metadata,
                distance,
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Number of indexed entries
    pub async fn len(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM semantic_memory")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count semantic memory")?;
        Ok(count)
    }
}

/// Encode an embedding as little-endian f32 bytes
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into an embedding
fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
