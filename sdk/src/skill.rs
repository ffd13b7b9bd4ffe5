//! Skill trait and invocation types
//!
//! A skill is a named, independently invocable unit performing one concrete
//! action (open an app, run a command, read/write a file, open a URL, search
//! the web, or answer conversationally). Each invocation produces a tagged
//! `SkillOutput` variant carrying the payload specific to that action,
//! wrapped in a `SkillResult` that records success or a captured error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::EngineError;

/// Parameters passed to a skill invocation
///
/// A thin wrapper over a JSON map with typed accessors. Missing or
/// wrongly-typed parameters surface as `EngineError::MissingParameter`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkillParams(pub HashMap<String, serde_json::Value>);

impl SkillParams {
    /// Create an empty parameter map
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Build params from a JSON value; non-object values yield empty params
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self(map.into_iter().collect()),
            _ => Self::new(),
        }
    }

    /// Add a parameter (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a required string parameter
    pub fn str(&self, key: &str) -> Result<&str, EngineError> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| EngineError::MissingParameter(key.to_string()))
    }

    /// Get an optional string parameter
    pub fn str_opt(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Get an optional i64 parameter
    pub fn i64_opt(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    /// True when no parameters are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single web search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Tagged output payload, one variant per skill kind
///
/// This is the typed replacement for loosely-schematized JSON results:
/// each capability declares the payload it produces, and `reduce()` is the
/// single place that turns a payload into a direct user-facing answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillOutput {
    /// An application was launched
    Launched { message: String },

    /// A URL was opened in the default browser
    UrlOpened { message: String },

    /// A shell command ran to completion
    CommandOutput {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },

    /// Contents of a file that was read
    FileContent { content: String },

    /// A file was written
    FileWritten { message: String },

    /// Formatted web search results
    SearchResults {
        formatted: String,
        hits: Vec<SearchHit>,
    },

    /// Marker output for conversational turns (no side effect)
    Conversational { message: String },
}

impl SkillOutput {
    /// Reduce an output to a direct, unembellished answer string.
    ///
    /// Field precedence: formatted, then content, then message, then stdout.
    /// Each variant carries exactly one of those as its primary field, so the
    /// precedence is realized by the variant itself.
    pub fn reduce(&self) -> String {
        match self {
            SkillOutput::SearchResults { formatted, .. } => formatted.clone(),
            SkillOutput::FileContent { content } => content.clone(),
            SkillOutput::Launched { message }
            | SkillOutput::UrlOpened { message }
            | SkillOutput::FileWritten { message }
            | SkillOutput::Conversational { message } => message.clone(),
            SkillOutput::CommandOutput { stdout, .. } => stdout.clone(),
        }
    }
}

/// Result of one skill invocation
///
/// Never mutated after creation. Failures raised inside a skill are captured
/// at the registry boundary and recorded here instead of propagating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillResult {
    pub success: bool,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub output: Option<SkillOutput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SkillResult {
    /// Create a successful result from a skill output
    pub fn ok(output: SkillOutput) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// Create a failed result with an error message
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Serialize the raw result for inclusion in a synthesis prompt
    pub fn to_report_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Skill trait that all capabilities implement
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique skill name used for plan dispatch (e.g. "open_app")
    fn name(&self) -> &str;

    /// Human-readable description advertised to the planner
    fn description(&self) -> &str;

    /// Execute the skill with the given parameters
    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError>;
}
