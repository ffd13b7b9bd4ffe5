//! Dual-store Memory Subsystem
//!
//! One facade over two complementary stores: the structured SQLite store
//! (preferences, facts, ordered conversation history) and the semantic
//! vector index over free-text conversation records. The facade is the only
//! component permitted to mutate persisted entities; everything else goes
//! through its operations.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub mod embedding;
pub mod semantic;

pub use embedding::{Embedder, OllamaEmbedder};
pub use semantic::{SemanticHit, SemanticIndex};

use crate::db::{ConversationRecord, ConversationStore, Database, FactStore, PreferenceStore};

/// Number of semantic hits pulled into assembled context
const CONTEXT_SEMANTIC_HITS: usize = 3;

/// Number of recent turns pulled into assembled context
const CONTEXT_RECENT_TURNS: i64 = 5;

/// Facade over the structured and semantic stores
pub struct MemoryStore {
    preferences: PreferenceStore,
    facts: FactStore,
    conversations: ConversationStore,
    semantic: SemanticIndex,
    embedder: Arc<dyn Embedder>,
}

impl MemoryStore {
    /// Build the facade over an open database and an embedder
    pub fn new(db: &Database, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            preferences: db.preferences(),
            facts: db.facts(),
            conversations: db.conversations(),
            semantic: SemanticIndex::new(db.pool().clone()),
            embedder,
        }
    }

    /// Save or update a user preference
    pub async fn upsert_preference(&self, key: &str, value: &str) -> Result<()> {
        self.preferences.upsert(key, value).await
    }

    /// Get a user preference by key
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.preferences.get(key).await
    }

    /// Get all user preferences
    pub async fn get_all_preferences(&self) -> Result<HashMap<String, String>> {
        self.preferences.get_all().await
    }

    /// Save or update a user fact
    pub async fn upsert_fact(&self, key: &str, value: &str) -> Result<()> {
        self.facts.upsert(key, value).await
    }

    /// Get a user fact by key
    pub async fn get_fact(&self, key: &str) -> Result<Option<String>> {
        self.facts.get(key).await
    }

    /// Get all user facts
    pub async fn get_all_facts(&self) -> Result<Vec<(String, String)>> {
        self.facts.get_all().await
    }

    /// Persist a completed conversation turn.
    ///
    /// Two-phase: (a) insert the structured record, (b) index the
    /// concatenated turn text into the semantic store under a time-derived
    /// id. Both phases are attempted even when one fails; there is no
    /// cross-store transaction.
    pub async fn append_conversation(&self, record: &ConversationRecord) -> Result<()> {
        let structured = self.conversations.insert(record).await;
        if let Err(ref e) = structured {
            warn!("Structured conversation insert failed: {}", e);
        }

        let semantic = self.index_turn(record).await;
        if let Err(ref e) = semantic {
            warn!("Semantic conversation indexing failed: {}", e);
        }

        match (structured, semantic) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(a), Err(b)) => Err(anyhow!("both memory phases failed: {}; {}", a, b)),
        }
    }

    async fn index_turn(&self, record: &ConversationRecord) -> Result<()> {
        let document = format!(
            "User: {}\nAssistant: {}",
            record.user_message, record.assistant_response
        );

        let mut metadata = HashMap::new();
        metadata.insert(
            "intent".to_string(),
            record.intent.clone().unwrap_or_else(|| "unknown".to_string()),
        );
        metadata.insert("timestamp".to_string(), record.created_at.to_rfc3339());
        if !record.skills_used.is_empty() {
            metadata.insert(
                "skills".to_string(),
                serde_json::to_string(&record.skills_used)?,
            );
        }

        let embedding = self
            .embedder
            .embed(&document)
            .await
            .map_err(|e| anyhow!(e))?;

        let id = format!("conv_{}", Utc::now().timestamp_micros());
        self.semantic.insert(&id, &document, &metadata, &embedding).await
    }

    /// Get the `limit` most recent turns, oldest first
    pub async fn recent_conversations(&self, limit: i64) -> Result<Vec<ConversationRecord>> {
        self.conversations.recent(limit).await
    }

    /// Search the semantic index for entries similar to `query`
    pub async fn semantic_search(&self, query: &str, k: usize) -> Result<Vec<SemanticHit>> {
        let embedding = self.embedder.embed(query).await.map_err(|e| anyhow!(e))?;
        self.semantic.search(&embedding, k).await
    }

    /// Assemble memory context for a query.
    ///
    /// Concatenates, in fixed order: the top-3 semantically nearest past
    /// exchanges, all current preferences, and the 5 most recent turns.
    /// Sections are omitted entirely when empty. Returns an empty string
    /// when nothing is available.
    pub async fn assemble_context(&self, query: &str) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();

        // Semantic recall is best-effort: an unreachable embedder should not
        // take down context assembly.
        match self.semantic_search(query, CONTEXT_SEMANTIC_HITS).await {
            Ok(hits) if !hits.is_empty() => {
                parts.push("## Relevant Past Conversations:".to_string());
                for hit in hits {
                    parts.push(format!("- {}", hit.content));
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Semantic recall skipped: {}", e),
        }

        let prefs = self.get_all_preferences().await?;
        if !prefs.is_empty() {
            parts.push("\n## User Preferences:".to_string());
            let mut keys: Vec<_> = prefs.keys().collect();
            keys.sort();
            for key in keys {
                parts.push(format!("- {}: {}", key, prefs[key]));
            }
        }

        let recent = self.recent_conversations(CONTEXT_RECENT_TURNS).await?;
        if !recent.is_empty() {
            parts.push("\n## Recent Conversation History:".to_string());
            for turn in recent {
                parts.push(format!("User: {}", turn.user_message));
                parts.push(format!("Assistant: {}", turn.assistant_response));
            }
        }

        Ok(parts.join("\n"))
    }
}

/// In-process rolling window of recent turns.
///
/// Private per orchestrator instance, used only for prompt construction.
/// Trimmed on overflow, discarded on restart; never persisted.
#[derive(Debug, Clone)]
pub struct SessionWindow {
    messages: Vec<(String, String)>,
    limit: usize,
}

impl SessionWindow {
    /// Create a window holding at most `limit` messages
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit,
        }
    }

    /// Record a completed turn (two messages: user then assistant)
    pub fn push_turn(&mut self, user: &str, assistant: &str) {
        self.messages.push(("user".to_string(), user.to_string()));
        self.messages
            .push(("assistant".to_string(), assistant.to_string()));
        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            self.messages.drain(..excess);
        }
    }

    /// Render the most recent `turns` exchanges for prompt injection
    pub fn render_recent(&self, turns: usize) -> String {
        let take = (turns * 2).min(self.messages.len());
        let start = self.messages.len() - take;
        self.messages[start..]
            .iter()
            .map(|(role, content)| format!("{}: {}", role, content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of messages currently held
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no messages are held
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all messages
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
