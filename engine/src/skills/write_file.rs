//! File Write Skill
//!
//! Creates or overwrites a file, creating parent directories as needed.
//! This is the sanctioned file-creation path; the shell skill refuses
//! echo-redirection file creation and points here.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillOutput, SkillParams};
use std::path::Path;
use tokio::fs;
use tracing::info;

pub struct WriteFileSkill;

#[async_trait]
impl Skill for WriteFileSkill {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Creates or writes content to a file"
    }

    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError> {
        let file_path = params.str("file_path")?;
        let content = params.str_opt("content").unwrap_or("");
        let path = Path::new(file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    EngineError::Skill(format!(
                        "Failed to create directories {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        fs::write(path, content).await.map_err(|e| {
            EngineError::Skill(format!("Failed to write {}: {}", file_path, e))
        })?;

        info!("Wrote {} bytes to {}", content.len(), file_path);
        Ok(SkillOutput::FileWritten {
            message: format!("Created/wrote to file: {}", file_path),
        })
    }
}
