//! Task Planning
//!
//! Expands a classified intent into an ordered sequence of skill
//! invocations. Simple requests get a direct single-step plan from the
//! fixed intent → skill mapping; compound requests (multi-step intents or
//! utterances with conjunction indicators) go through LLM-assisted
//! decomposition, with the single-step plan as the fallback when
//! decomposition fails.
//!
//! Plans are ephemeral and scoped to one request. Step order is
//! significant and preserved end-to-end. Skill names referenced by a plan
//! are not validated here; unknown names surface during execution.

use sdk::skill::SkillParams;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::intent::Intent;
use crate::llm::{extract_json_array, CompletionProvider, CompletionRequest};

/// One planned skill invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub step: u32,
    pub skill: String,
    pub parameters: SkillParams,
    pub description: String,
}

/// Ordered, never-empty sequence of steps satisfying one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn single(step: PlanStep) -> Self {
        Self { steps: vec![step] }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Conjunctions that mark a compound request
const COMPOUND_INDICATORS: &[&str] = &["and", "then", "after", "also", "plus"];

/// Keywords that mark a file-creation request
const FILE_CREATION_KEYWORDS: &[&str] = &[
    "create", "write", "make", "file", "java", "python", "code", "program",
];

/// True when the utterance reads as a compound request
fn is_compound(lower: &str) -> bool {
    if lower.contains(',') {
        return true;
    }
    lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| COMPOUND_INDICATORS.contains(&w))
}

/// True when the utterance asks for a file to be created
fn wants_file_creation(lower: &str) -> bool {
    FILE_CREATION_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    step: Option<u32>,
    skill: String,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default)]
    description: String,
}

/// Plans skill invocations for an utterance
pub struct TaskPlanner {
    llm: Arc<dyn CompletionProvider>,
}

impl TaskPlanner {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Produce a plan for the utterance. Never returns an empty plan.
    ///
    /// LLM-assisted decomposition is used for multi-step intents and for
    /// utterances containing compound indicators; everything else maps the
    /// intent directly onto its skill.
    pub async fn plan(&self, utterance: &str, intent: &Intent, capabilities: &[String]) -> Plan {
        let lower = utterance.to_lowercase();

        if intent.kind == crate::intent::IntentKind::MultiStep || is_compound(&lower) {
            match self.decompose(utterance, intent, capabilities, &lower).await {
                Some(plan) => return plan,
                None => {
                    warn!("Plan decomposition failed, falling back to single-step plan");
                }
            }
        }

        single_step_plan(utterance, intent)
    }

    async fn decompose(
        &self,
        utterance: &str,
        intent: &Intent,
        capabilities: &[String],
        lower: &str,
    ) -> Option<Plan> {
        // Shell redirection is unreliable for file creation across
        // platforms, so the prompt mandates the write_file skill whenever
        // the request looks like file creation.
        let file_note = if wants_file_creation(lower) {
            "\nIMPORTANT: If the request involves creating or writing a file, you MUST use the \
             \"write_file\" skill with \"file_path\" and \"content\" parameters. NEVER use \
             run_command with shell redirection (>, >>) to create files."
        } else {
            ""
        };

        let prompt = format!(
            r#"Break this user request into an ordered sequence of skill invocations.

Available skills: {}

User request: "{}"
Detected intent: {}
{}
Respond with ONLY a JSON array of steps, each step an object:
[{{"step": 1, "skill": "<skill name>", "parameters": {{...}}, "description": "<what this step does>"}}]"#,
            capabilities.join(", "),
            utterance,
            intent.kind.as_str(),
            file_note,
        );

        let response = self
            .llm
            .complete(&CompletionRequest::new(prompt).with_generation(0.2, 2048))
            .await
            .ok()?;

        let json = extract_json_array(&response)?;
        let raw: Vec<RawStep> = serde_json::from_str(json).ok()?;
        if raw.is_empty() {
            return None;
        }

        // Listed order is authoritative; step numbers are renumbered to be
        // consistent with it.
        let steps = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| PlanStep {
                step: r.step.filter(|&s| s == i as u32 + 1).unwrap_or(i as u32 + 1),
                skill: r.skill,
                parameters: SkillParams::from_value(r.parameters),
                description: r.description,
            })
            .collect();

        debug!(steps = ?steps, "LLM-decomposed plan");
        Some(Plan { steps })
    }
}

/// The direct plan: one step invoking the intent's skill with the intent's
/// extracted parameters
fn single_step_plan(utterance: &str, intent: &Intent) -> Plan {
    let skill = intent.kind.skill_name();
    Plan::single(PlanStep {
        step: 1,
        skill: skill.to_string(),
        parameters: intent.parameters.clone(),
        description: format!("Handle '{}' with the {} skill", utterance, skill),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentKind;
    use crate::llm::{CompletionError, Result as LlmResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct PanickingProvider;

    #[async_trait]
    impl CompletionProvider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }
        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
            panic!("simple requests must not invoke the completion provider");
        }
    }

    /// Records prompts and replies with a fixed response
    struct RecordingProvider {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }
        async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if self.response.is_empty() {
                Err(CompletionError::ProviderUnavailable("down".into()))
            } else {
                Ok(self.response.clone())
            }
        }
    }

    fn intent(kind: IntentKind, params: SkillParams) -> Intent {
        Intent {
            kind,
            confidence: 0.9,
            parameters: params,
        }
    }

    fn caps() -> Vec<String> {
        ["open_app", "web_search", "run_command", "read_file", "write_file", "open_url", "conversational"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_simple_request_gets_single_step_plan() {
        let planner = TaskPlanner::new(Arc::new(PanickingProvider));
        let intent = intent(
            IntentKind::OpenApp,
            SkillParams::new().with("app_name", "vscode"),
        );

        let plan = planner.plan("open vscode", &intent, &caps()).await;

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].step, 1);
        assert_eq!(plan.steps[0].skill, "open_app");
        assert_eq!(plan.steps[0].parameters.str("app_name").unwrap(), "vscode");
    }

    #[tokio::test]
    async fn test_conversational_intent_maps_to_conversational_skill() {
        let planner = TaskPlanner::new(Arc::new(PanickingProvider));
        let intent = intent(IntentKind::Conversational, SkillParams::new());

        let plan = planner.plan("how are you", &intent, &caps()).await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].skill, "conversational");
    }

    #[tokio::test]
    async fn test_compound_request_uses_llm_decomposition() {
        let canned = r#"[
            {"step": 1, "skill": "open_app", "parameters": {"app_name": "vscode"}, "description": "Open vscode"},
            {"step": 2, "skill": "web_search", "parameters": {"query": "rust async"}, "description": "Search rust async"}
        ]"#;
        let provider = Arc::new(RecordingProvider::new(canned));
        let planner = TaskPlanner::new(provider.clone());
        let intent = intent(IntentKind::MultiStep, SkillParams::new());

        let plan = planner
            .plan("open vscode and search rust async", &intent, &caps())
            .await;

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].skill, "open_app");
        assert_eq!(plan.steps[1].skill, "web_search");
        assert_eq!(plan.steps[1].step, 2);
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decomposition_failure_falls_back_to_single_step() {
        let provider = Arc::new(RecordingProvider::new("sorry, no json"));
        let planner = TaskPlanner::new(provider);
        let intent = intent(
            IntentKind::OpenApp,
            SkillParams::new().with("app_name", "firefox"),
        );

        let plan = planner
            .plan("open firefox, then tell me a joke", &intent, &caps())
            .await;

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].skill, "open_app");
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_single_step() {
        let provider = Arc::new(RecordingProvider::new(""));
        let planner = TaskPlanner::new(provider);
        let intent = intent(IntentKind::Conversational, SkillParams::new());

        let plan = planner
            .plan("do this and also that", &intent, &caps())
            .await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].skill, "conversational");
    }

    #[tokio::test]
    async fn test_file_creation_mandates_write_file_in_prompt() {
        let canned =
            r#"[{"step": 1, "skill": "write_file", "parameters": {}, "description": "Write file"}]"#;
        let provider = Arc::new(RecordingProvider::new(canned));
        let planner = TaskPlanner::new(provider.clone());
        let intent = intent(IntentKind::MultiStep, SkillParams::new());

        planner
            .plan("create a python script and run it", &intent, &caps())
            .await;

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("write_file"));
        assert!(prompts[0].contains("NEVER use"));
    }

    #[test]
    fn test_compound_detection() {
        assert!(is_compound("open vscode and search rust"));
        assert!(is_compound("first this, second that"));
        assert!(is_compound("do x then y"));
        assert!(!is_compound("open android studio"));
        assert!(!is_compound("search rust tutorials"));
    }

    #[test]
    fn test_llm_step_numbers_are_renumbered_to_listed_order() {
        let raw = vec![
            RawStep {
                step: Some(7),
                skill: "a".into(),
                parameters: serde_json::Value::Null,
                description: String::new(),
            },
            RawStep {
                step: None,
                skill: "b".into(),
                parameters: serde_json::Value::Null,
                description: String::new(),
            },
        ];
        let steps: Vec<u32> = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.step.filter(|&s| s == i as u32 + 1).unwrap_or(i as u32 + 1))
            .collect();
        assert_eq!(steps, vec![1, 2]);
    }
}
