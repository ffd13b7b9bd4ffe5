//! File Read Skill

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillOutput, SkillParams};
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub struct ReadFileSkill;

#[async_trait]
impl Skill for ReadFileSkill {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads the contents of a file"
    }

    async fn run(&self, params: &SkillParams) -> Result<SkillOutput, EngineError> {
        let file_path = params.str("file_path")?;
        let path = Path::new(file_path);

        if !path.exists() {
            return Err(EngineError::Skill(format!("File not found: {}", file_path)));
        }
        if !path.is_file() {
            return Err(EngineError::Skill(format!(
                "Path is not a file: {}",
                file_path
            )));
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            EngineError::Skill(format!("Failed to read {}: {}", file_path, e))
        })?;

        debug!("Read {} bytes from {}", content.len(), file_path);
        Ok(SkillOutput::FileContent { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "remember the milk").unwrap();

        let skill = ReadFileSkill;
        let output = skill
            .run(&SkillParams::new().with("file_path", path.to_string_lossy().to_string()))
            .await
            .unwrap();
        assert_eq!(output.reduce(), "remember the milk");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let skill = ReadFileSkill;
        let result = skill
            .run(&SkillParams::new().with("file_path", "/no/such/file.txt"))
            .await;
        match result {
            Err(EngineError::Skill(msg)) => assert!(msg.contains("File not found")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let skill = ReadFileSkill;
        let result = skill
            .run(
                &SkillParams::new()
                    .with("file_path", dir.path().to_string_lossy().to_string()),
            )
            .await;
        match result {
            Err(EngineError::Skill(msg)) => assert!(msg.contains("not a file")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
