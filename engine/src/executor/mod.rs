//! Execution Coordinator
//!
//! Runs a plan's steps against the skill registry strictly in order and
//! shapes the final response. A single successful step passes its payload
//! through unembellished; anything else (multi-step plans, or a failed
//! single step) is summarized by one synthesis completion call that sees
//! every step's description and raw result. A failing step never halts
//! the plan; its failure is part of the aggregated report.

use sdk::skill::SkillResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::llm::{CompletionProvider, CompletionRequest};
use crate::planner::Plan;
use crate::skills::SkillRegistry;

/// Outcome of one executed step
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u32,
    pub skill: String,
    pub description: String,
    pub result: SkillResult,
}

/// Aggregated outcome of a full plan
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub reports: Vec<StepReport>,
}

impl ExecutionReport {
    /// Skill names of the successfully executed steps
    pub fn skills_used(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| r.result.success)
            .map(|r| r.skill.clone())
            .collect()
    }
}

pub struct ExecutionCoordinator {
    registry: Arc<SkillRegistry>,
    llm: Arc<dyn CompletionProvider>,
}

impl ExecutionCoordinator {
    pub fn new(registry: Arc<SkillRegistry>, llm: Arc<dyn CompletionProvider>) -> Self {
        Self { registry, llm }
    }

    /// Execute every step of the plan and shape the user-facing answer
    pub async fn execute(&self, plan: &Plan, utterance: &str) -> (String, ExecutionReport) {
        let mut reports = Vec::with_capacity(plan.len());

        // Strictly sequential: later steps may depend on earlier side
        // effects.
        for step in &plan.steps {
            info!("Executing step {} ({})", step.step, step.skill);
            let result = self.registry.invoke(&step.skill, &step.parameters).await;
            if !result.success {
                warn!(
                    "Step {} ({}) failed: {}",
                    step.step,
                    step.skill,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            reports.push(StepReport {
                step: step.step,
                skill: step.skill.clone(),
                description: step.description.clone(),
                result,
            });
        }

        let report = ExecutionReport { reports };

        let answer = if report.reports.len() == 1 && report.reports[0].result.success {
            // Direct pass-through for simple successful requests
            let only = &report.reports[0];
            match &only.result.output {
                Some(output) => output.reduce(),
                None => only.result.to_report_json(),
            }
        } else {
            self.synthesize(utterance, &report).await
        };

        (answer, report)
    }

    /// One completion call turning the step reports into a coherent reply
    async fn synthesize(&self, utterance: &str, report: &ExecutionReport) -> String {
        let mut sections = Vec::with_capacity(report.reports.len());
        for r in &report.reports {
            sections.push(format!(
                "Step {}: {}\nResult: {}",
                r.step,
                r.description,
                r.result.to_report_json()
            ));
        }

        let prompt = format!(
            r#"The user asked: "{}"

The following steps were executed:

{}

Write one short, natural reply to the user summarizing what was done. Mention any step that failed and what went wrong. Do not invent results that are not in the reports."#,
            utterance,
            sections.join("\n\n")
        );

        match self
            .llm
            .complete(&CompletionRequest::new(prompt))
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                // Degrade to a plain report when the provider is down
                warn!("Synthesis completion failed: {}", e);
                debug!("Falling back to plain step report");
                report
                    .reports
                    .iter()
                    .map(|r| match (&r.result.output, &r.result.error) {
                        (Some(output), _) => output.reduce(),
                        (None, Some(error)) => format!("Step {} failed: {}", r.step, error),
                        (None, None) => format!("Step {} produced no output", r.step),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::errors::EngineError;
    use sdk::skill::{Skill, SkillOutput, SkillParams};
    use crate::llm::Result as LlmResult;
    use crate::planner::PlanStep;
    use std::sync::Mutex;

    struct FixedSkill {
        name: &'static str,
        output: SkillOutput,
    }

    #[async_trait]
    impl Skill for FixedSkill {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "fixed"
        }
        async fn run(&self, _params: &SkillParams) -> Result<SkillOutput, EngineError> {
            Ok(self.output.clone())
        }
    }

    struct FailingSkill;

    #[async_trait]
    impl Skill for FailingSkill {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn run(&self, _params: &SkillParams) -> Result<SkillOutput, EngineError> {
            Err(EngineError::Skill("boom".into()))
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl CompletionProvider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }
        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
            panic!("single successful step must not trigger synthesis");
        }
    }

    struct RecordingProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }
        async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            Ok("Done: opened the app and searched.".to_string())
        }
    }

    fn step(n: u32, skill: &str, description: &str) -> PlanStep {
        PlanStep {
            step: n,
            skill: skill.to_string(),
            parameters: SkillParams::new(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_successful_step_passes_through() {
        let mut registry = SkillRegistry::new();
        registry.register(Box::new(FixedSkill {
            name: "open_app",
            output: SkillOutput::Launched {
                message: "Opened X".into(),
            },
        }));

        let coordinator =
            ExecutionCoordinator::new(Arc::new(registry), Arc::new(PanickingProvider));
        let plan = Plan::single(step(1, "open_app", "Open X"));

        let (answer, report) = coordinator.execute(&plan, "open x").await;
        assert_eq!(answer, "Opened X");
        assert_eq!(report.skills_used(), vec!["open_app".to_string()]);
    }

    #[tokio::test]
    async fn test_two_steps_make_exactly_one_synthesis_call() {
        let mut registry = SkillRegistry::new();
        registry.register(Box::new(FixedSkill {
            name: "open_app",
            output: SkillOutput::Launched {
                message: "Opened vscode".into(),
            },
        }));
        registry.register(Box::new(FixedSkill {
            name: "web_search",
            output: SkillOutput::SearchResults {
                formatted: "1. Rust async book".into(),
                hits: vec![],
            },
        }));

        let provider = Arc::new(RecordingProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let coordinator = ExecutionCoordinator::new(Arc::new(registry), provider.clone());
        let plan = Plan {
            steps: vec![
                step(1, "open_app", "Open the vscode editor"),
                step(2, "web_search", "Search for rust async"),
            ],
        };

        let (answer, _) = coordinator
            .execute(&plan, "open vscode and search rust async")
            .await;

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        // Step descriptions appear verbatim in the synthesis prompt
        assert!(prompts[0].contains("Open the vscode editor"));
        assert!(prompts[0].contains("Search for rust async"));
        assert!(prompts[0].contains("Opened vscode"));
        assert_eq!(answer, "Done: opened the app and searched.");
    }

    #[tokio::test]
    async fn test_failed_step_does_not_halt_plan() {
        let mut registry = SkillRegistry::new();
        registry.register(Box::new(FailingSkill));
        registry.register(Box::new(FixedSkill {
            name: "open_app",
            output: SkillOutput::Launched {
                message: "Opened Y".into(),
            },
        }));

        let provider = Arc::new(RecordingProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let coordinator = ExecutionCoordinator::new(Arc::new(registry), provider.clone());
        let plan = Plan {
            steps: vec![step(1, "broken", "Break things"), step(2, "open_app", "Open Y")],
        };

        let (_, report) = coordinator.execute(&plan, "do both").await;
        assert_eq!(report.reports.len(), 2);
        assert!(!report.reports[0].result.success);
        assert!(report.reports[1].result.success);
        assert_eq!(report.skills_used(), vec!["open_app".to_string()]);

        // The failure reaches the synthesis prompt verbatim
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("boom"));
    }

    #[tokio::test]
    async fn test_failed_single_step_goes_through_synthesis() {
        let mut registry = SkillRegistry::new();
        registry.register(Box::new(FailingSkill));

        let provider = Arc::new(RecordingProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let coordinator = ExecutionCoordinator::new(Arc::new(registry), provider.clone());
        let plan = Plan::single(step(1, "broken", "Break things"));

        coordinator.execute(&plan, "break").await;
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_skill_surfaces_at_execution_time() {
        let registry = SkillRegistry::new();
        let provider = Arc::new(RecordingProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let coordinator = ExecutionCoordinator::new(Arc::new(registry), provider.clone());
        let plan = Plan::single(step(1, "ghost", "Use a ghost skill"));

        let (_, report) = coordinator.execute(&plan, "do it").await;
        assert_eq!(
            report.reports[0].result.error.as_deref(),
            Some("capability 'ghost' not found")
        );
    }
}
