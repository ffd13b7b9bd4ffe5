//! Valet SDK
//!
//! Shared library providing the skill trait, skill parameter/result types,
//! and error types used by the Valet engine and out-of-tree skill crates.

/// Error types and handling
pub mod errors;

/// Skill trait and invocation types
pub mod skill;

// Re-export commonly used types
pub use errors::{EngineError, ValetErrorExt};
pub use skill::{SearchHit, Skill, SkillOutput, SkillParams, SkillResult};
