//! Valet Engine Library
//!
//! Core of the Valet personal-assistant backend: the request orchestration
//! pipeline (intent classification, task planning, step execution, skill
//! dispatch, response synthesis) and the dual-store memory subsystem.
//! This library is used by both the `valet` binary and integration tests.

/// Configuration management module
pub mod config;

/// Completion-provider abstraction layer
pub mod llm;

/// Database persistence module
pub mod db;

/// Dual-store memory subsystem
pub mod memory;

/// Intent classification module
pub mod intent;

/// Task planning module
pub mod planner;

/// Skill registry and builtin skills
pub mod skills;

/// Execution coordinator module
pub mod executor;

/// Personalization engine module
pub mod personalization;

/// Request orchestration pipeline
pub mod orchestrator;

/// CLI interface module
pub mod cli;

/// Telemetry and observability
pub mod telemetry;
