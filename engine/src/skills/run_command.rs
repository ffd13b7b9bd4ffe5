//! Shell Command Skill
//!
//! Runs one shell command with a 30-second wall-clock timeout and returns
//! captured stdout/stderr. Echo-with-redirection targeting a source or
//! text file is rejected up front; that pattern is unreliable across
//! platforms and file creation belongs to the write_file skill.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillOutput, SkillParams};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const COMMAND_TIMEOUT_SECS: u64 = 30;

/// Extensions that mark an echo-redirection target as file creation
const GUARDED_EXTENSIONS: &[&str] = &[
    ".py", ".java", ".js", ".ts", ".rs", ".txt", ".md", ".json", ".html", ".css", ".xml",
    ".yaml", ".yml",
];

pub struct RunCommandSkill {
    timeout: Duration,
}

impl RunCommandSkill {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
        }
    }
}

impl Default for RunCommandSkill {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect `echo ... > file.ext` file creation and return the target path
fn echo_redirect_target(command: &str) -> Option<String> {
    let lower = command.to_lowercase();
    if !lower.contains("echo") || !command.contains('>') {
        return None;
    }
    let (_, file_part) = command.split_once('>')?;
    let target = file_part.trim_start_matches('>').trim();
    if GUARDED_EXTENSIONS.iter().any(|ext| target.ends_with(ext)) {
        Some(target.to_string())
    } else {
        None
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("powershell");
    cmd.args(["-Command", command]);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

#[async_trait]
impl Skill for RunCommandSkill {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Runs system commands and returns output"
    }

    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError> {
        let command = params.str("command")?;

        if let Some(target) = echo_redirect_target(command) {
            return Err(EngineError::Skill(format!(
                "File creation via echo is unreliable. Please use write_file skill with \
                 file_path='{}' and content parameters.",
                target
            )));
        }

        info!("Executing shell command: {}", command);
        let output = tokio::time::timeout(self.timeout, shell_command(command).output())
            .await
            .map_err(|_| {
                warn!("Command timed out after {}s: {}", self.timeout.as_secs(), command);
                EngineError::CommandTimeout(self.timeout.as_secs())
            })?
            .map_err(EngineError::from)?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if output.status.success() {
            Ok(SkillOutput::CommandOutput {
                stdout,
                stderr,
                exit_code,
            })
        } else {
            let detail = if stderr.trim().is_empty() {
                stdout
            } else {
                stderr
            };
            Err(EngineError::Skill(format!(
                "Command exited with status {}: {}",
                exit_code,
                detail.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_redirect_guard_detects_file_creation() {
        assert_eq!(
            echo_redirect_target("echo 'hi' > script.py"),
            Some("script.py".to_string())
        );
        assert_eq!(
            echo_redirect_target("echo data >> notes.txt"),
            Some("notes.txt".to_string())
        );
        // Redirection to a non-source target passes through
        assert_eq!(echo_redirect_target("echo x > /dev/null"), None);
        assert_eq!(echo_redirect_target("ls -la"), None);
        assert_eq!(echo_redirect_target("echo hello"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_command_captures_stdout() {
        let skill = RunCommandSkill::new();
        let output = skill
            .run(&SkillParams::new().with("command", "echo hello"))
            .await
            .unwrap();

        match output {
            SkillOutput::CommandOutput {
                stdout, exit_code, ..
            } => {
                assert_eq!(stdout.trim(), "hello");
                assert_eq!(exit_code, 0);
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_an_error() {
        let skill = RunCommandSkill::new();
        let result = skill
            .run(&SkillParams::new().with("command", "exit 3"))
            .await;
        assert!(matches!(result, Err(EngineError::Skill(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_produces_typed_failure() {
        let mut skill = RunCommandSkill::new();
        skill.timeout = Duration::from_millis(50);
        let result = skill
            .run(&SkillParams::new().with("command", "sleep 5"))
            .await;
        assert!(matches!(result, Err(EngineError::CommandTimeout(_))));
    }
}
