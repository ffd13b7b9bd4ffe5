//! Application Launcher Skill
//!
//! Normalizes a spoken app name to a canonical key, resolves the launch
//! command (configured override first, builtin table second, the raw name
//! last) and spawns it detached per platform.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillOutput, SkillParams};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::Config;

/// Spoken-name variations mapped to canonical keys
const NAME_ALIASES: &[(&str, &str)] = &[
    ("vs", "vscode"),
    ("vs code", "vscode"),
    ("visual studio code", "vscode"),
    ("visual studio", "vscode"),
    ("code", "vscode"),
];

/// Builtin launch commands per platform
#[cfg(target_os = "macos")]
const LAUNCH_COMMANDS: &[(&str, &str)] = &[
    ("vscode", "/Applications/Visual Studio Code.app/Contents/MacOS/Electron"),
    ("chrome", "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
    ("firefox", "/Applications/Firefox.app/Contents/MacOS/firefox"),
    ("brave", "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"),
    ("safari", "/Applications/Safari.app/Contents/MacOS/Safari"),
];

#[cfg(not(target_os = "macos"))]
const LAUNCH_COMMANDS: &[(&str, &str)] = &[
    ("vscode", "code"),
    ("chrome", "google-chrome"),
    ("firefox", "firefox"),
    ("brave", "brave-browser"),
];

pub struct OpenAppSkill {
    overrides: HashMap<String, String>,
}

impl OpenAppSkill {
    pub fn new(config: &Config) -> Self {
        Self {
            overrides: config.skills.app_commands.clone(),
        }
    }

    fn resolve_command(&self, normalized: &str) -> Option<String> {
        if let Some(command) = self.overrides.get(normalized) {
            return Some(command.clone());
        }
        LAUNCH_COMMANDS
            .iter()
            .find(|(key, _)| *key == normalized)
            .map(|(_, cmd)| cmd.to_string())
    }
}

/// Normalize a spoken app name: alias table first, then squashed
/// comparison (spaces/dashes/underscores removed) against known keys
fn normalize_app_name(app_name: &str, known_keys: impl Iterator<Item = String>) -> String {
    let lower = app_name.to_lowercase().trim().to_string();

    for (alias, canonical) in NAME_ALIASES {
        if lower == *alias {
            return canonical.to_string();
        }
    }

    let squashed = squash(&lower);
    for key in known_keys {
        if squash(&key) == squashed {
            return key;
        }
    }

    lower
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| *c != ' ' && *c != '-' && *c != '_')
        .collect()
}

/// Spawn a launch command detached; stdout/stderr are discarded
fn spawn_detached(program: &str, args: &[&str]) -> Result<(), EngineError> {
    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    command
        .spawn()
        .map(|_| ())
        .map_err(EngineError::from)
}

#[cfg(target_os = "macos")]
fn launch(command: &str) -> Result<(), EngineError> {
    // `open -a` resolves app bundles; fall back to a direct spawn for
    // plain executables
    spawn_detached("open", &["-a", command]).or_else(|_| spawn_detached(command, &[]))
}

#[cfg(not(target_os = "macos"))]
fn launch(command: &str) -> Result<(), EngineError> {
    spawn_detached(command, &[])
}

#[async_trait]
impl Skill for OpenAppSkill {
    fn name(&self) -> &str {
        "open_app"
    }

    fn description(&self) -> &str {
        "Opens an application by name"
    }

    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError> {
        let app_name = params.str("app_name")?;

        let known = self
            .overrides
            .keys()
            .cloned()
            .chain(LAUNCH_COMMANDS.iter().map(|(k, _)| k.to_string()));
        let normalized = normalize_app_name(app_name, known);
        debug!("Normalized app name '{}' -> '{}'", app_name, normalized);

        let result = match self.resolve_command(&normalized) {
            Some(command) => {
                info!("Launching '{}' via '{}'", normalized, command);
                // Resolved command failing falls back to the raw name
                launch(&command).or_else(|_| launch(&normalized))
            }
            None => {
                info!("No known command for '{}', launching directly", normalized);
                launch(&normalized)
            }
        };

        match result {
            Ok(()) => Ok(SkillOutput::Launched {
                message: format!("Opened {}", app_name),
            }),
            Err(e) => Err(EngineError::Skill(format!(
                "Could not open {}: {}",
                app_name, e
            ))),
        }
    }
}
