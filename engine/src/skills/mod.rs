//! Capability Registry and Builtin Skills
//!
//! The registry maps skill names to boxed `Skill` implementations and is
//! the single dispatch point for plan execution. Builtins are registered
//! from a static constructor table at startup; a constructor failure is
//! logged and skipped, never fatal. Failures raised inside a skill's
//! `run` are caught at the registry boundary and recorded on the returned
//! `SkillResult` instead of propagating.

use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillParams, SkillResult};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::Config;

pub mod conversational;
pub mod open_app;
pub mod open_url;
pub mod read_file;
pub mod run_command;
pub mod web_search;
pub mod write_file;

pub use conversational::ConversationalSkill;
pub use open_app::OpenAppSkill;
pub use open_url::OpenUrlSkill;
pub use read_file::ReadFileSkill;
pub use run_command::RunCommandSkill;
pub use web_search::WebSearchSkill;
pub use write_file::WriteFileSkill;

type SkillConstructor = fn(&Config) -> Result<Box<dyn Skill>, EngineError>;

/// Static registration table for builtin skills
const BUILTINS: &[(&str, SkillConstructor)] = &[
    ("open_app", |c| Ok(Box::new(OpenAppSkill::new(c)))),
    ("web_search", |c| Ok(Box::new(WebSearchSkill::new(c)))),
    ("run_command", |_| Ok(Box::new(RunCommandSkill::new()))),
    ("read_file", |_| Ok(Box::new(ReadFileSkill))),
    ("write_file", |_| Ok(Box::new(WriteFileSkill))),
    ("open_url", |_| Ok(Box::new(OpenUrlSkill))),
    ("conversational", |_| Ok(Box::new(ConversationalSkill))),
];

/// Registry of invocable skills
pub struct SkillRegistry {
    skills: HashMap<String, Box<dyn Skill>>,
}

impl SkillRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            skills: HashMap::new(),
        }
    }

    /// Create a registry populated with all builtin skills.
    ///
    /// A builtin whose constructor fails is skipped with a warning so one
    /// broken capability never takes down the rest.
    pub fn with_builtins(config: &Config) -> Self {
        let mut registry = Self::new();
        for (name, constructor) in BUILTINS {
            match constructor(config) {
                Ok(skill) => registry.register(skill),
                Err(e) => warn!("Skipping skill '{}': {}", name, e),
            }
        }
        registry
    }

    /// Register a skill under its own name, replacing any previous entry
    pub fn register(&mut self, skill: Box<dyn Skill>) {
        debug!("Registered skill '{}'", skill.name());
        self.skills.insert(skill.name().to_string(), skill);
    }

    /// Look up a skill by name
    pub fn resolve(&self, name: &str) -> Option<&dyn Skill> {
        self.skills.get(name).map(|s| s.as_ref())
    }

    /// Sorted names of all registered skills
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.skills.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered skills
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// True when no skills are registered
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Invoke a skill by name.
    ///
    /// Unknown names and skill failures both come back as failed
    /// `SkillResult`s; nothing escapes this boundary.
    pub async fn invoke(&self, name: &str, params: &SkillParams) -> SkillResult {
        let Some(skill) = self.resolve(name) else {
            return SkillResult::err(format!("capability '{}' not found", name));
        };

        match skill.run(params).await {
            Ok(output) => SkillResult::ok(output),
            Err(e) => {
                warn!("Skill '{}' failed: {}", name, e);
                SkillResult::err(e.to_string())
            }
        }
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}
