//! Completion-provider abstraction layer
//!
//! The completion capability is an opaque text-completion function: given a
//! prompt and generation parameters it returns raw text or a typed failure.
//! Structure extraction (JSON objects/arrays embedded in model output) is
//! the caller's job and lives here as shared helpers.

use async_trait::async_trait;

pub mod gemini;

/// Result type for completion operations
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Errors that can occur during completion calls
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The prompt text
    pub prompt: String,

    /// Optional system instruction prepended by the provider
    pub system_instruction: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with the given prompt and default generation
    /// parameters
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
            temperature: 0.7,
            max_tokens: 8192,
        }
    }

    /// Attach a system instruction
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Override generation parameters
    pub fn with_generation(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

/// Completion provider trait
///
/// Implementations must return the raw completion text; callers extract any
/// JSON structure themselves.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider (e.g. "gemini")
    fn name(&self) -> &str;

    /// Generate a completion for the request
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Extract the first balanced JSON object (`{...}`) from model output.
///
/// Scans for the first `{` and counts brace depth, respecting string
/// literals and escapes, to find the matching close brace. Returns `None`
/// when no balanced object exists.
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    extract_balanced(&content[start..], '{', '}')
}

/// Extract the first balanced JSON array (`[...]`) from model output.
pub fn extract_json_array(content: &str) -> Option<&str> {
    let start = content.find('[')?;
    extract_balanced(&content[start..], '[', ']')
}

/// Extract a balanced delimiter pair starting at position 0 of `s`.
///
/// Counts open/close depth, respecting string literals, to find the
/// matching close delimiter.
fn extract_balanced(s: &str, open: char, close: char) -> Option<&str> {
    if !s.starts_with(open) {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
