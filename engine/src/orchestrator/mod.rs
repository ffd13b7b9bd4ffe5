//! Request Orchestration Pipeline
//!
//! The entry point that sequences one user turn end to end: context
//! assembly → intent classification → planning → execution → memory
//! persistence → personalization update. Conversational intents bypass the
//! execution coordinator and are answered directly with the assistant's
//! identity and personalization context. One-shot and streaming delivery
//! share the same pipeline; streaming additionally emits incremental
//! status events over an mpsc channel. The outermost boundary converts any
//! unhandled failure into a single user-visible error reply.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::ConversationRecord;
use crate::executor::ExecutionCoordinator;
use crate::intent::{Intent, IntentClassifier, IntentKind};
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::memory::{MemoryStore, SessionWindow};
use crate::personalization::Personalization;
use crate::planner::TaskPlanner;
use crate::skills::SkillRegistry;

const DEFAULT_IDENTITY: &str = "You are Valet, an AI assistant designed to help users.";

/// Incremental status emitted during a streaming turn
#[derive(Debug, Clone)]
pub enum TurnEvent {
    Processing,
    IntentExtracted { kind: IntentKind, confidence: f32 },
    PlanCreated { steps: usize },
    Complete { response: String },
}

/// Full outcome of one handled turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub intent: IntentKind,
    pub skills_used: Vec<String>,
}

pub struct Orchestrator {
    llm: Arc<dyn CompletionProvider>,
    memory: Arc<MemoryStore>,
    registry: Arc<SkillRegistry>,
    classifier: IntentClassifier,
    planner: TaskPlanner,
    coordinator: ExecutionCoordinator,
    personalization: Personalization,
    identity: String,
    window: Mutex<SessionWindow>,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        llm: Arc<dyn CompletionProvider>,
        memory: Arc<MemoryStore>,
        registry: Arc<SkillRegistry>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(llm.clone()),
            planner: TaskPlanner::new(llm.clone()),
            coordinator: ExecutionCoordinator::new(registry.clone(), llm.clone()),
            personalization: Personalization::new(memory.clone(), llm.clone()),
            identity: load_identity(config),
            window: Mutex::new(SessionWindow::new(config.memory.window_limit)),
            llm,
            memory,
            registry,
        }
    }

    /// Handle one turn, returning the reply text. Failures never escape;
    /// they become an error reply.
    pub async fn handle_turn(&self, utterance: &str) -> TurnOutcome {
        match self.run_pipeline(utterance, None).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Turn failed: {:#}", e);
                TurnOutcome {
                    response: format!("I ran into a problem handling that: {}", e),
                    intent: IntentKind::Conversational,
                    skills_used: Vec::new(),
                }
            }
        }
    }

    /// Handle one turn, emitting status events while it progresses. The
    /// final `Complete` event carries the reply.
    pub async fn handle_turn_streaming(&self, utterance: &str, events: mpsc::Sender<TurnEvent>) {
        let outcome = match self.run_pipeline(utterance, Some(&events)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Streaming turn failed: {:#}", e);
                TurnOutcome {
                    response: format!("I ran into a problem handling that: {}", e),
                    intent: IntentKind::Conversational,
                    skills_used: Vec::new(),
                }
            }
        };
        let _ = events
            .send(TurnEvent::Complete {
                response: outcome.response,
            })
            .await;
    }

    async fn run_pipeline(
        &self,
        utterance: &str,
        events: Option<&mpsc::Sender<TurnEvent>>,
    ) -> Result<TurnOutcome> {
        emit(events, TurnEvent::Processing).await;

        // Memory recall is best-effort; a cold store must not block the turn
        let memory_context = match self.memory.assemble_context(utterance).await {
            Ok(context) => context,
            Err(e) => {
                warn!("Context assembly failed: {}", e);
                String::new()
            }
        };
        let personalization_context = self.personalization.render_context().await;

        let intent = self.classifier.classify(utterance).await;
        info!(kind = ?intent.kind, confidence = intent.confidence, "Classified intent");
        emit(
            events,
            TurnEvent::IntentExtracted {
                kind: intent.kind,
                confidence: intent.confidence,
            },
        )
        .await;

        let plan = self
            .planner
            .plan(utterance, &intent, &self.registry.names())
            .await;
        emit(events, TurnEvent::PlanCreated { steps: plan.len() }).await;

        let response = if intent.kind == IntentKind::Conversational {
            self.answer_directly(utterance, &memory_context, &personalization_context)
                .await?
        } else {
            let (answer, _report) = self.coordinator.execute(&plan, utterance).await;
            answer
        };

        let skills_used: Vec<String> = plan.steps.iter().map(|s| s.skill.clone()).collect();
        self.persist_turn(utterance, &response, &intent, &skills_used)
            .await;

        self.window.lock().await.push_turn(utterance, &response);

        Ok(TurnOutcome {
            response,
            intent: intent.kind,
            skills_used,
        })
    }

    /// Direct conversational answer with identity, personalization, and
    /// memory context
    async fn answer_directly(
        &self,
        utterance: &str,
        memory_context: &str,
        personalization_context: &str,
    ) -> Result<String> {
        let system_instruction = format!(
            r#"{}

{}

You have access to various skills and can help with tasks, answer questions, and have conversations.
Be helpful, concise, and friendly. Always remember who you are and your purpose."#,
            self.identity, personalization_context
        );

        let mut parts = Vec::new();
        if !memory_context.is_empty() {
            parts.push(format!("Context:\n{}\n", memory_context));
        }
        let recent = self.window.lock().await.render_recent(5);
        if !recent.is_empty() {
            parts.push(format!("Recent Conversation:\n{}\n", recent));
        }
        parts.push(format!("User: {}", utterance));
        parts.push("Assistant:".to_string());

        let request = CompletionRequest::new(parts.join("\n")).with_system(system_instruction);
        self.llm
            .complete(&request)
            .await
            .context("Conversational completion failed")
    }

    /// Persist the turn and update personalization; both are
    /// warn-and-continue, never fatal to the reply
    async fn persist_turn(
        &self,
        utterance: &str,
        response: &str,
        intent: &Intent,
        skills_used: &[String],
    ) {
        let record = ConversationRecord::new(
            utterance,
            response,
            Some(intent.kind.as_str().to_string()),
            skills_used.to_vec(),
        );
        if let Err(e) = self.memory.append_conversation(&record).await {
            warn!("Failed to persist conversation turn: {}", e);
        }

        self.personalization
            .extract_and_persist(utterance, response)
            .await;
    }
}

async fn emit(events: Option<&mpsc::Sender<TurnEvent>>, event: TurnEvent) {
    if let Some(tx) = events {
        // A dropped receiver never stalls the pipeline
        let _ = tx.send(event).await;
    }
}

/// Load the assistant identity text from the data directory, falling back
/// to the builtin default line
pub fn load_identity(config: &Config) -> String {
    match std::fs::read_to_string(config.identity_path()) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => DEFAULT_IDENTITY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::memory::Embedder;
    use async_trait::async_trait;
    use sdk::errors::EngineError;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
            // Deterministic toy embedding
            let sum: u32 = text.bytes().map(u32::from).sum();
            Ok(vec![(sum % 97) as f32, (sum % 89) as f32, 1.0])
        }
    }

    /// Returns scripted responses in order, then repeats the last one
    struct ScriptedProvider {
        responses: StdMutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: StdMutex::new(responses.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> crate::llm::Result<String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.pop_front().unwrap_or_default())
            } else {
                Ok(responses.front().cloned().unwrap_or_default())
            }
        }
    }

    async fn orchestrator_with(
        dir: &TempDir,
        provider: Arc<dyn CompletionProvider>,
    ) -> Orchestrator {
        let mut config = Config::default();
        config.core.data_dir = dir.path().to_path_buf();

        let db = Database::new(&config.db_path()).await.unwrap();
        let memory = Arc::new(MemoryStore::new(&db, Arc::new(StubEmbedder)));
        let registry = Arc::new(SkillRegistry::with_builtins(&config));
        Orchestrator::new(&config, provider, memory, registry)
    }

    #[tokio::test]
    async fn test_conversational_turn_answers_directly_and_persists() {
        let dir = TempDir::new().unwrap();
        // One response covers the conversational answer; the extraction
        // pass reuses the same scripted reply and parses nothing from it.
        let provider = Arc::new(ScriptedProvider::new(&["Hello! How can I help?"]));
        let orchestrator = orchestrator_with(&dir, provider).await;

        let outcome = orchestrator.handle_turn("hello there").await;
        assert_eq!(outcome.response, "Hello! How can I help?");
        assert_eq!(outcome.intent, IntentKind::Conversational);

        let recent = orchestrator.memory.recent_conversations(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_message, "hello there");
        assert_eq!(recent[0].intent.as_deref(), Some("conversational"));
    }

    #[tokio::test]
    async fn test_streaming_emits_status_sequence() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&["Hi!"]));
        let orchestrator = orchestrator_with(&dir, provider).await;

        let (tx, mut rx) = mpsc::channel(16);
        orchestrator.handle_turn_streaming("hello", tx).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert!(matches!(events[0], TurnEvent::Processing));
        assert!(matches!(events[1], TurnEvent::IntentExtracted { .. }));
        assert!(matches!(events[2], TurnEvent::PlanCreated { .. }));
        assert!(matches!(events.last(), Some(TurnEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_skill_turn_bypasses_direct_answer() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(ScriptedProvider::new(&["unused"]));
        let orchestrator = orchestrator_with(&dir, provider).await;

        // read_file on a missing path: the single step fails, synthesis
        // runs, but the turn still completes with a reply and a record.
        let outcome = orchestrator.handle_turn("read /no/such/thing.txt").await;
        assert!(!outcome.response.is_empty());
        assert_eq!(outcome.skills_used, vec!["read_file".to_string()]);

        let recent = orchestrator.memory.recent_conversations(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].skills_used, vec!["read_file".to_string()]);
    }

    #[tokio::test]
    async fn test_identity_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.core.data_dir = dir.path().to_path_buf();
        assert_eq!(load_identity(&config), DEFAULT_IDENTITY);

        std::fs::write(config.identity_path(), "You are Valet, butler supreme.").unwrap();
        assert_eq!(load_identity(&config), "You are Valet, butler supreme.");
    }
}
