// Valet Personal Assistant Engine
// Main entry point for the valet binary

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use valet_engine::cli::{Cli, Command};
use valet_engine::config::Config;
use valet_engine::db::Database;
use valet_engine::llm::gemini::GeminiProvider;
use valet_engine::llm::CompletionProvider;
use valet_engine::memory::{MemoryStore, OllamaEmbedder};
use valet_engine::orchestrator::{Orchestrator, TurnEvent};
use valet_engine::skills::SkillRegistry;
use valet_engine::telemetry::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_or_create()?
    };

    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_logging(level);

    tracing::info!("Valet Engine v{}", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&config.core.data_dir)?;
    let db = Database::new(&config.db_path()).await?;

    match cli.command {
        Command::Ask { query, stream } => {
            let orchestrator = build_orchestrator(&config, &db)?;
            if stream {
                let (tx, mut rx) = tokio::sync::mpsc::channel(16);
                let handle = {
                    let orchestrator = Arc::new(orchestrator);
                    let orchestrator_task = orchestrator.clone();
                    tokio::spawn(async move {
                        orchestrator_task.handle_turn_streaming(&query, tx).await;
                    })
                };
                while let Some(event) = rx.recv().await {
                    match event {
                        TurnEvent::Processing => println!("[processing]"),
                        TurnEvent::IntentExtracted { kind, confidence } => {
                            println!("[intent] {:?} ({:.2})", kind, confidence)
                        }
                        TurnEvent::PlanCreated { steps } => {
                            println!("[plan] {} step(s)", steps)
                        }
                        TurnEvent::Complete { response } => println!("{}", response),
                    }
                }
                handle.await?;
            } else {
                let outcome = orchestrator.handle_turn(&query).await;
                println!("{}", outcome.response);
            }
        }

        Command::Repl => {
            let orchestrator = build_orchestrator(&config, &db)?;
            println!("Valet interactive session. Type 'exit' to quit.");
            let stdin = std::io::stdin();
            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    break;
                }
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if query == "exit" || query == "quit" {
                    break;
                }
                let outcome = orchestrator.handle_turn(query).await;
                println!("{}", outcome.response);
            }
        }

        Command::History { limit } => {
            let memory = build_memory(&config, &db);
            let turns = memory.recent_conversations(limit).await?;
            if turns.is_empty() {
                println!("No conversation history yet.");
            }
            for turn in turns {
                println!("[{}] User: {}", turn.created_at.format("%Y-%m-%d %H:%M"), turn.user_message);
                println!("       Valet: {}", turn.assistant_response);
            }
        }

        Command::Memory => {
            let memory = build_memory(&config, &db);
            let prefs = memory.get_all_preferences().await?;
            if prefs.is_empty() {
                println!("No preferences stored.");
            } else {
                println!("Preferences:");
                let mut keys: Vec<_> = prefs.keys().collect();
                keys.sort();
                for key in keys {
                    println!("  {}: {}", key, prefs[key]);
                }
            }
            let facts = memory.get_all_facts().await?;
            if !facts.is_empty() {
                println!("Facts:");
                for (key, value) in facts {
                    println!("  {}: {}", key, value);
                }
            }
        }
    }

    Ok(())
}

fn build_memory(config: &Config, db: &Database) -> Arc<MemoryStore> {
    let embedder = Arc::new(OllamaEmbedder::new(
        config.memory.embedding_url.clone(),
        config.memory.embedding_model.clone(),
    ));
    Arc::new(MemoryStore::new(db, embedder))
}

fn build_orchestrator(config: &Config, db: &Database) -> anyhow::Result<Orchestrator> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!("No API key configured; set llm.api_key or the VALET_API_KEY variable")
    })?;
    let provider: Arc<dyn CompletionProvider> =
        Arc::new(GeminiProvider::new(config.llm.model.clone(), api_key));

    let memory = build_memory(config, db);
    let registry = Arc::new(SkillRegistry::with_builtins(config));
    Ok(Orchestrator::new(config, provider, memory, registry))
}
