//! Personalization Engine
//!
//! Learns about the user from ordinary conversation and renders what is
//! known for prompt injection. Extraction runs three independent passes
//! per turn: self-introduction regexes for the user's name, keyword
//! matching for tone preference, and a best-effort LLM pass for anything
//! else. The LLM pass must never fail the turn; parse failures are
//! swallowed.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::llm::{extract_json_object, CompletionProvider, CompletionRequest};
use crate::memory::MemoryStore;

/// Tone categories matched against the user's wording; first category with
/// a hit wins
const TONE_KEYWORDS: &[(&str, &[&str])] = &[
    ("formal", &["formal", "professional", "business"]),
    ("casual", &["casual", "relaxed", "friendly"]),
    ("technical", &["technical", "detailed", "precise"]),
];

fn name_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)my name is ([A-Z][a-z]+)",
            r"(?i)call me ([A-Z][a-z]+)",
            r"(?i)i'm ([A-Z][a-z]+)",
            r"(?i)i am ([A-Z][a-z]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid name pattern"))
        .collect()
    })
}

#[derive(Debug, Deserialize, Default)]
struct Extracted {
    #[serde(default)]
    preferences: HashMap<String, serde_json::Value>,
    #[serde(default)]
    facts: HashMap<String, serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    corrections: Vec<String>,
}

pub struct Personalization {
    memory: Arc<MemoryStore>,
    llm: Arc<dyn CompletionProvider>,
}

impl Personalization {
    pub fn new(memory: Arc<MemoryStore>, llm: Arc<dyn CompletionProvider>) -> Self {
        Self { memory, llm }
    }

    /// Render what is known about the user for prompt injection.
    ///
    /// Each line appears only when the underlying value exists; an empty
    /// string means nothing is known yet.
    pub async fn render_context(&self) -> String {
        let mut parts = Vec::new();

        if let Ok(Some(name)) = self.memory.get_preference("user_name").await {
            parts.push(format!("User's name: {}", name));
        }
        if let Ok(Some(tone)) = self.memory.get_preference("tone_style").await {
            parts.push(format!("Preferred tone: {}", tone));
        }
        if let Ok(Some(apps)) = self.memory.get_preference("frequent_apps").await {
            parts.push(format!("Frequently used apps: {}", apps));
        }

        if let Ok(facts) = self.memory.get_all_facts().await {
            if !facts.is_empty() {
                parts.push("User Facts:".to_string());
                for (key, value) in facts {
                    parts.push(format!("- {}: {}", key, value));
                }
            }
        }

        parts.join("\n")
    }

    /// Extract preferences and facts from a completed turn and persist
    /// them. Best-effort throughout; never fails the turn.
    pub async fn extract_and_persist(&self, user_message: &str, assistant_response: &str) {
        if let Some(name) = extract_name(user_message) {
            debug!("Learned user name: {}", name);
            if let Err(e) = self.memory.upsert_preference("user_name", &name).await {
                warn!("Failed to save user name: {}", e);
            }
        }

        if let Some(tone) = extract_tone(user_message) {
            debug!("Learned tone preference: {}", tone);
            if let Err(e) = self.memory.upsert_preference("tone_style", tone).await {
                warn!("Failed to save tone preference: {}", e);
            }
        }

        self.llm_extract(user_message, assistant_response).await;
    }

    async fn llm_extract(&self, user_message: &str, assistant_response: &str) {
        let prompt = format!(
            r#"Analyze this conversation and extract any user preferences, facts, or information that should be remembered.

User: {}
Assistant: {}

Extract:
1. User preferences (tone, style, tools, etc.)
2. Facts about the user (job, location, interests, etc.)
3. Corrections the user made

Respond in JSON format:
{{
  "preferences": {{"key": "value"}},
  "facts": {{"key": "value"}},
  "corrections": ["correction1", "correction2"]
}}

If nothing to extract, return {{"preferences": {{}}, "facts": {{}}, "corrections": []}}

Respond with ONLY valid JSON, no other text:"#,
            user_message, assistant_response
        );

        let Ok(response) = self
            .llm
            .complete(&CompletionRequest::new(prompt).with_generation(0.2, 1024))
            .await
        else {
            return;
        };

        let Some(json) = extract_json_object(&response) else {
            return;
        };
        let Ok(extracted) = serde_json::from_str::<Extracted>(json) else {
            return;
        };

        for (key, value) in extracted.preferences {
            let value = value_to_string(&value);
            if let Err(e) = self.memory.upsert_preference(&key, &value).await {
                warn!("Failed to save extracted preference '{}': {}", key, e);
            }
        }
        for (key, value) in extracted.facts {
            let value = value_to_string(&value);
            if let Err(e) = self.memory.upsert_fact(&key, &value).await {
                warn!("Failed to save extracted fact '{}': {}", key, e);
            }
        }
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Match self-introduction phrasing; the first pattern with a hit wins
fn extract_name(message: &str) -> Option<String> {
    for pattern in name_patterns() {
        if let Some(captures) = pattern.captures(message) {
            return captures.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Match tone keywords; the first category with a hit wins
fn extract_tone(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    for (tone, keywords) in TONE_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some(tone);
        }
    }
    None
}
