//! Intent Classification
//!
//! Maps a raw user utterance to a typed intent plus a confidence score and
//! extracted parameters. Fast deterministic keyword rules run first; when
//! they are inconclusive (confidence below the threshold) an LLM-assisted
//! classification takes over, and a conversational default catches
//! everything else.
//!
//! The rules live in a fixed-priority table. Order is observable behavior:
//! open/launch/start precedes play, and "play" always resolves to a web
//! search so that "play X" routes to media search.

use sdk::skill::SkillParams;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::debug;

use crate::llm::{extract_json_object, CompletionProvider, CompletionRequest};

/// Confidence below which rule output is discarded in favor of the LLM path
const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// The classified purpose of a user utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    OpenApp,
    WebSearch,
    RunCommand,
    ReadFile,
    Conversational,
    MultiStep,
}

impl IntentKind {
    /// Fixed intent → skill mapping; kinds without a dedicated skill fall
    /// back to the conversational capability
    pub fn skill_name(&self) -> &'static str {
        match self {
            IntentKind::OpenApp => "open_app",
            IntentKind::WebSearch => "web_search",
            IntentKind::RunCommand => "run_command",
            IntentKind::ReadFile => "read_file",
            IntentKind::Conversational | IntentKind::MultiStep => "conversational",
        }
    }

    /// Name used when persisting alongside a conversation record
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::OpenApp => "open_app",
            IntentKind::WebSearch => "web_search",
            IntentKind::RunCommand => "run_command",
            IntentKind::ReadFile => "read_file",
            IntentKind::Conversational => "conversational",
            IntentKind::MultiStep => "multi_step",
        }
    }
}

/// A classified intent, produced fresh per utterance and never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub kind: IntentKind,
    pub confidence: f32,
    pub parameters: SkillParams,
}

impl Intent {
    fn new(kind: IntentKind, confidence: f32, parameters: SkillParams) -> Self {
        Self {
            kind,
            confidence,
            parameters,
        }
    }

    /// The conversational fallback intent
    pub fn conversational() -> Self {
        Self::new(IntentKind::Conversational, 0.5, SkillParams::new())
    }
}

/// One keyword-trigger rule: a trigger set plus a builder that extracts
/// parameters and assigns the rule's fixed confidence. A builder returning
/// `None` lets evaluation continue to the next rule.
struct IntentRule {
    triggers: &'static [&'static str],
    build: fn(utterance: &str, lower: &str) -> Option<Intent>,
}

/// Ordered rule table; the first rule whose builder yields an intent wins
const RULES: &[IntentRule] = &[
    IntentRule {
        triggers: &["open", "launch", "start"],
        build: build_open_app,
    },
    IntentRule {
        triggers: &["play"],
        build: build_play,
    },
    IntentRule {
        triggers: &["search", "find", "look up", "google", "youtube"],
        build: build_web_search,
    },
    IntentRule {
        triggers: &["run", "execute", "command", "terminal"],
        build: build_run_command,
    },
    IntentRule {
        triggers: &["read", "show", "display", "file"],
        build: build_read_file,
    },
];

fn build_open_app(_utterance: &str, lower: &str) -> Option<Intent> {
    let app_name = extract_app_name(lower)?;
    Some(Intent::new(
        IntentKind::OpenApp,
        0.9,
        SkillParams::new().with("app_name", app_name),
    ))
}

// "play" deliberately resolves to a web search so media requests route to
// search; confidence reflects that the trigger is unambiguous.
fn build_play(_utterance: &str, lower: &str) -> Option<Intent> {
    let query = extract_search_query(lower);
    Some(Intent::new(
        IntentKind::WebSearch,
        0.95,
        SkillParams::new().with("query", query),
    ))
}

fn build_web_search(_utterance: &str, lower: &str) -> Option<Intent> {
    let query = extract_search_query(lower);
    let confidence = if lower.contains("youtube") { 0.9 } else { 0.85 };
    Some(Intent::new(
        IntentKind::WebSearch,
        confidence,
        SkillParams::new().with("query", query),
    ))
}

fn build_run_command(utterance: &str, _lower: &str) -> Option<Intent> {
    let command = extract_command(utterance)?;
    Some(Intent::new(
        IntentKind::RunCommand,
        0.9,
        SkillParams::new().with("command", command),
    ))
}

fn build_read_file(utterance: &str, _lower: &str) -> Option<Intent> {
    let file_path = extract_file_path(utterance)?;
    Some(Intent::new(
        IntentKind::ReadFile,
        0.8,
        SkillParams::new().with("file_path", file_path),
    ))
}

/// Apply the rule table; falls back to conversational at 0.5
fn rule_based(utterance: &str) -> Intent {
    let lower = utterance.to_lowercase();
    for rule in RULES {
        if rule.triggers.iter().any(|t| matches_trigger(&lower, t)) {
            if let Some(intent) = (rule.build)(utterance, &lower) {
                return intent;
            }
        }
    }
    Intent::conversational()
}

/// Whole-word trigger match; multi-word triggers match as phrases. Keeps
/// "display" from tripping the play rule and "undefined" the find rule.
fn matches_trigger(lower: &str, trigger: &str) -> bool {
    find_word(lower, trigger).is_some()
}

/// Position of `word` in `lower` with non-alphanumeric boundaries on both
/// sides
fn find_word(lower: &str, word: &str) -> Option<usize> {
    let bytes = lower.as_bytes();
    lower
        .match_indices(word)
        .find(|(i, _)| {
            let before_ok = *i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let after = i + word.len();
            let after_ok = after >= lower.len() || !bytes[after].is_ascii_alphanumeric();
            before_ok && after_ok
        })
        .map(|(i, _)| i)
}

/// Extract an app name following an open/launch/start trigger.
///
/// Strips leading articles and resolves known multi-word aliases (vs code,
/// visual studio code) to their canonical name.
fn extract_app_name(lower: &str) -> Option<String> {
    const ALIASES: &[(&str, &str)] = &[
        ("visual studio code", "vscode"),
        ("visual studio", "vscode"),
        ("vs code", "vscode"),
        ("vs", "vscode"),
        ("code", "vscode"),
    ];

    for keyword in ["open", "launch", "start"] {
        let Some(idx) = find_word(lower, keyword) else {
            continue;
        };
        let remaining = lower[idx + keyword.len()..].trim();
        if remaining.is_empty() {
            continue;
        }

        // Known aliases are matched against the start of the remainder
        for (pattern, canonical) in ALIASES {
            if remaining == *pattern || remaining.starts_with(&format!("{} ", pattern)) {
                return Some(canonical.to_string());
            }
        }

        let mut words = remaining.split_whitespace().peekable();
        if matches!(words.peek(), Some(&"the") | Some(&"a") | Some(&"an")) {
            words.next();
        }
        let rest: Vec<&str> = words.collect();
        if rest.is_empty() {
            continue;
        }
        if rest.len() >= 2 && rest[0] == "vs" && rest[1] == "code" {
            return Some("vscode".to_string());
        }
        return Some(rest[0].to_string());
    }

    None
}

/// Extract a search query: text after "play", else text after the first
/// search trigger, else the whole utterance
fn extract_search_query(lower: &str) -> String {
    if let Some(idx) = find_word(lower, "play") {
        let rest = lower[idx + "play".len()..].trim();
        if !rest.is_empty() {
            return rest.to_string();
        }
    }

    for keyword in ["search", "find", "look up", "google", "youtube"] {
        if let Some(idx) = find_word(lower, keyword) {
            let rest = lower[idx + keyword.len()..].trim();
            if !rest.is_empty() {
                return rest.trim_start_matches("for ").trim().to_string();
            }
        }
    }

    lower.to_string()
}

/// Extract a command: text after a run/execute/command trigger, or a
/// `$`/backtick-prefixed message taken verbatim. Commands keep their
/// original casing, so the keyword is located against an ASCII-lowered
/// copy of the utterance; ASCII lowering preserves byte offsets, unlike
/// `to_lowercase()` which can expand characters such as 'İ'.
fn extract_command(utterance: &str) -> Option<String> {
    let ascii_lower = utterance.to_ascii_lowercase();
    for keyword in ["run", "execute", "command"] {
        if let Some(idx) = find_word(&ascii_lower, keyword) {
            let rest = utterance[idx + keyword.len()..].trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }

    let trimmed = utterance.trim();
    if trimmed.starts_with('$') || trimmed.starts_with('`') {
        return Some(trimmed.trim_matches(['$', '`']).trim().to_string());
    }

    None
}

/// Extract a file path via fixed-priority patterns: quoted paths with a
/// known extension, Windows drive paths, then relative/absolute paths
fn extract_file_path(utterance: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<regex::Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            regex::Regex::new(
                r#"["']([^"']+\.(?:txt|py|rs|json|md|yaml|yml|xml|html|css|js))["']"#,
            )
            .expect("valid quoted-path regex"),
            regex::Regex::new(r"\b([a-zA-Z]:[\\/][^\s]+\.\w+)").expect("valid drive-path regex"),
            regex::Regex::new(r"(?:^|\s)([./~][^\s]*\.\w+)").expect("valid relative-path regex"),
        ]
    });

    for pattern in patterns {
        if let Some(captures) = pattern.captures(utterance) {
            return captures.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    intent: String,
    confidence: f32,
    #[serde(default)]
    parameters: serde_json::Value,
}

/// Intent classifier: rule table first, LLM fallback when inconclusive
pub struct IntentClassifier {
    llm: Arc<dyn CompletionProvider>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Classify an utterance into an intent.
    ///
    /// Pure apart from at most one completion call: rule matches at or
    /// above the confidence threshold never reach the LLM.
    pub async fn classify(&self, utterance: &str) -> Intent {
        let intent = rule_based(utterance);
        if intent.confidence >= CONFIDENCE_THRESHOLD {
            debug!(kind = ?intent.kind, confidence = intent.confidence, "Rule-based intent");
            return intent;
        }

        match self.llm_assisted(utterance).await {
            Some(intent) => intent,
            None => Intent::conversational(),
        }
    }

    async fn llm_assisted(&self, utterance: &str) -> Option<Intent> {
        let prompt = format!(
            r#"Analyze this user message and extract the intent and parameters.

User message: "{}"

Respond in JSON format with:
- intent: one of ["open_app", "web_search", "run_command", "read_file", "conversational", "multi_step"]
- confidence: float between 0 and 1
- parameters: object with relevant parameters

Examples:
- "open vscode" -> {{"intent": "open_app", "confidence": 0.95, "parameters": {{"app_name": "vscode"}}}}
- "search python decorators" -> {{"intent": "web_search", "confidence": 0.95, "parameters": {{"query": "python decorators"}}}}
- "what's the weather?" -> {{"intent": "conversational", "confidence": 0.9, "parameters": {{}}}}

Respond with ONLY valid JSON, no other text:"#,
            utterance
        );

        let response = self
            .llm
            .complete(&CompletionRequest::new(prompt).with_generation(0.2, 1024))
            .await
            .ok()?;

        let json = extract_json_object(&response)?;
        let raw: RawIntent = serde_json::from_str(json).ok()?;

        let kind = match raw.intent.as_str() {
            "open_app" => IntentKind::OpenApp,
            "web_search" => IntentKind::WebSearch,
            "run_command" => IntentKind::RunCommand,
            "read_file" => IntentKind::ReadFile,
            "conversational" => IntentKind::Conversational,
            "multi_step" => IntentKind::MultiStep,
            _ => return None,
        };

        Some(Intent::new(
            kind,
            raw.confidence.clamp(0.0, 1.0),
            SkillParams::from_value(raw.parameters),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::llm::{CompletionError, Result as LlmResult};

    /// Provider that fails the test if the LLM path is ever taken
    struct PanickingProvider;

    #[async_trait]
    impl CompletionProvider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }
        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
            panic!("rule-based classification must not call the completion provider");
        }
    }

    /// Provider returning a fixed response
    struct CannedProvider(String);

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }
        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
            Ok(self.0.clone())
        }
    }

    /// Provider that always fails
    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
            Err(CompletionError::ProviderUnavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_open_app_rule_never_calls_llm() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        let intent = classifier.classify("open vscode").await;

        assert_eq!(intent.kind, IntentKind::OpenApp);
        assert!((intent.confidence - 0.9).abs() < 1e-6);
        assert_eq!(intent.parameters.str("app_name").unwrap(), "vscode");
    }

    #[tokio::test]
    async fn test_search_rule_extracts_query() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        let intent = classifier.classify("search python decorators").await;

        assert_eq!(intent.kind, IntentKind::WebSearch);
        assert!((intent.confidence - 0.85).abs() < 1e-6);
        assert_eq!(intent.parameters.str("query").unwrap(), "python decorators");
    }

    #[tokio::test]
    async fn test_youtube_search_gets_higher_confidence() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        let intent = classifier.classify("search youtube rust tutorials").await;

        assert_eq!(intent.kind, IntentKind::WebSearch);
        assert!((intent.confidence - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_play_always_resolves_to_web_search() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        let intent = classifier.classify("play some jazz").await;

        assert_eq!(intent.kind, IntentKind::WebSearch);
        assert!((intent.confidence - 0.95).abs() < 1e-6);
        assert_eq!(intent.parameters.str("query").unwrap(), "some jazz");

        // "play" wins over the later search triggers too
        let intent = classifier.classify("play and then search jazz").await;
        assert_eq!(intent.kind, IntentKind::WebSearch);
        assert!((intent.confidence - 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_open_precedes_play() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        // "start" matches the open rule first; "playing jazz" becomes the app
        // extraction input, so the open rule produces an intent and wins.
        let intent = classifier.classify("start playing jazz").await;
        assert_eq!(intent.kind, IntentKind::OpenApp);
    }

    #[tokio::test]
    async fn test_run_command_extraction() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        let intent = classifier.classify("run ls -la").await;

        assert_eq!(intent.kind, IntentKind::RunCommand);
        assert_eq!(intent.parameters.str("command").unwrap(), "ls -la");
    }

    #[tokio::test]
    async fn test_read_file_extraction() {
        let classifier = IntentClassifier::new(Arc::new(PanickingProvider));
        let intent = classifier.classify("read ./notes/todo.md please").await;

        assert_eq!(intent.kind, IntentKind::ReadFile);
        assert!((intent.confidence - 0.8).abs() < 1e-6);
        assert_eq!(
            intent.parameters.str("file_path").unwrap(),
            "./notes/todo.md"
        );
    }

    #[tokio::test]
    async fn test_ambiguous_utterance_uses_llm() {
        let canned = r#"{"intent": "web_search", "confidence": 0.8, "parameters": {"query": "weather"}}"#;
        let classifier = IntentClassifier::new(Arc::new(CannedProvider(canned.to_string())));
        let intent = classifier.classify("what about the weather").await;

        assert_eq!(intent.kind, IntentKind::WebSearch);
        assert_eq!(intent.parameters.str("query").unwrap(), "weather");
    }

    #[tokio::test]
    async fn test_unparsable_llm_output_falls_back_to_conversational() {
        let classifier =
            IntentClassifier::new(Arc::new(CannedProvider("no json here".to_string())));
        let intent = classifier.classify("hmm").await;

        assert_eq!(intent.kind, IntentKind::Conversational);
        assert!((intent.confidence - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_conversational() {
        let classifier = IntentClassifier::new(Arc::new(FailingProvider));
        let intent = classifier.classify("tell me something").await;

        assert_eq!(intent.kind, IntentKind::Conversational);
        assert!((intent.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_app_name_alias_resolution() {
        assert_eq!(extract_app_name("open vs code"), Some("vscode".to_string()));
        assert_eq!(
            extract_app_name("launch visual studio code"),
            Some("vscode".to_string())
        );
        assert_eq!(
            extract_app_name("open the firefox browser"),
            Some("firefox".to_string())
        );
        assert_eq!(extract_app_name("open"), None);
    }

    #[test]
    fn test_command_prefix_forms() {
        assert_eq!(
            extract_command("$ cargo build"),
            Some("cargo build".to_string())
        );
        assert_eq!(extract_command("terminal"), None);
    }

    #[test]
    fn test_command_extraction_keeps_case_and_survives_multibyte_text() {
        // The command text must come back with its original casing
        assert_eq!(
            extract_command("run Docker PS -a"),
            Some("Docker PS -a".to_string())
        );
        assert_eq!(
            extract_command("RUN ls -la"),
            Some("ls -la".to_string())
        );

        // 'İ' lowercases to a longer byte sequence; slicing the utterance
        // with offsets taken from its lowercased form would split 'é' here
        assert_eq!(
            extract_command("İstanbul: run cafè --brew"),
            Some("cafè --brew".to_string())
        );
        assert_eq!(extract_command("İ runé x"), Some("é x".to_string()));

        let intent = rule_based("İstanbul'da run echo ok");
        assert_eq!(intent.kind, IntentKind::RunCommand);
        assert_eq!(intent.parameters.str("command").unwrap(), "echo ok");
    }

    #[test]
    fn test_triggers_match_whole_words_only() {
        // "display" must not trip the play rule, "undefined" not the find
        // rule
        assert_eq!(rule_based("display settings").kind, IntentKind::Conversational);
        assert_eq!(
            rule_based("what is undefined behavior").kind,
            IntentKind::Conversational
        );
        assert!(find_word("search undefined behavior", "find").is_none());
        assert_eq!(find_word("look up rust traits", "look up"), Some(0));
    }

    #[test]
    fn test_skill_name_mapping() {
        assert_eq!(IntentKind::OpenApp.skill_name(), "open_app");
        assert_eq!(IntentKind::MultiStep.skill_name(), "conversational");
        assert_eq!(IntentKind::MultiStep.as_str(), "multi_step");
    }
}
