//! Error types and handling
//!
//! This module provides the error types used throughout the Valet engine.
//! All errors implement the `ValetErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.

use thiserror::Error;

/// Trait for Valet error extensions
///
/// Provides additional context for errors: a hint safe to display to end
/// users (no secrets, no internal paths) and recoverability information.
pub trait ValetErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require manual intervention.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// Represents all failure categories that can occur in the Valet engine:
/// configuration, database, completion provider, embedding, skill
/// execution, and timeouts.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Completion provider errors
    #[error("Completion provider error: {0}")]
    Completion(String),

    #[error("Completion call timed out")]
    CompletionTimeout,

    // Embedding errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    // Skill errors
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Skill error: {0}")]
    Skill(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Command timed out after {0} seconds")]
    CommandTimeout(u64),

    // I/O errors surfaced through skills
    #[error("I/O error: {0}")]
    Io(String),
}

impl ValetErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            EngineError::Config(_) => "Check ~/.valet/config.toml for invalid or missing values",
            EngineError::Database(_) => "The memory store could not complete the operation",
            EngineError::Completion(_) => "The language model could not be reached",
            EngineError::CompletionTimeout => "The language model took too long to respond",
            EngineError::Embedding(_) => "The embedding service could not be reached",
            EngineError::SkillNotFound(_) => "No skill with that name is registered",
            EngineError::Skill(_) => "The skill failed while running",
            EngineError::MissingParameter(_) => "A required skill parameter was not provided",
            EngineError::CommandTimeout(_) => "The command ran too long and was stopped",
            EngineError::Io(_) => "A file or process operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Config(_) => false,
            EngineError::Database(_) => true,
            EngineError::Completion(_) => true,
            EngineError::CompletionTimeout => true,
            EngineError::Embedding(_) => true,
            EngineError::SkillNotFound(_) => true,
            EngineError::Skill(_) => true,
            EngineError::MissingParameter(_) => true,
            EngineError::CommandTimeout(_) => true,
            EngineError::Io(_) => true,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_hints_are_path_free() {
        let errors = vec![
            EngineError::Config("bad".into()),
            EngineError::Database("locked".into()),
            EngineError::SkillNotFound("open_app".into()),
            EngineError::CommandTimeout(30),
        ];
        for err in errors {
            let hint = err.user_hint();
            assert!(!hint.is_empty());
            assert!(!hint.contains("/home"));
        }
    }

    #[test]
    fn test_recoverability() {
        assert!(!EngineError::Config("missing api key".into()).is_recoverable());
        assert!(EngineError::Completion("503".into()).is_recoverable());
        assert!(EngineError::CommandTimeout(30).is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = EngineError::SkillNotFound("web_search".into());
        assert_eq!(err.to_string(), "Skill not found: web_search");

        let err = EngineError::CommandTimeout(30);
        assert_eq!(err.to_string(), "Command timed out after 30 seconds");
    }
}
