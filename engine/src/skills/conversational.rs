//! Conversational Skill
//!
//! Marker capability for plan steps with no side effect. The orchestrator
//! answers conversational turns itself with the completion provider; this
//! skill only exists so plans referencing "conversational" resolve.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::skill::{Skill, SkillOutput, SkillParams};

pub struct ConversationalSkill;

#[async_trait]
impl Skill for ConversationalSkill {
    fn name(&self) -> &str {
        "conversational"
    }

    fn description(&self) -> &str {
        "Handles general conversation and questions"
    }

    async fn run(&self, _params: &SkillParams) -> Result<SkillOutput, EngineError> {
        Ok(SkillOutput::Conversational {
            message: "Conversational request handled by LLM".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_marker_output() {
        let skill = ConversationalSkill;
        let output = skill.run(&SkillParams::new()).await.unwrap();
        assert!(matches!(output, SkillOutput::Conversational { .. }));
    }
}
