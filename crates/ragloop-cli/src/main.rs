//! # ragloop CLI
//!
//! Ask questions against a local corpus with web fallback and graded answers.
//!
//! ## Usage
//!
//! ```bash
//! # One question, answer on stdout
//! ragloop --config ragloop.yaml ask "What was TotalEnergies net income in 2023?"
//!
//! # Watch the loop, emit JSON
//! ragloop ask "..." --stream --json
//!
//! # Validate configuration
//! ragloop --config ragloop.yaml check-config
//! ```

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use ragloop_core::{LoopSnapshot, Turn};
use ragloop_runtime::providers::ProviderFactory;
use ragloop_runtime::{
    EvidenceStore, InMemoryEvidenceStore, OrchestratorBuilder, ProviderRegistry, RunRequest,
    TavilySearch,
};

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "ragloop", version, about = "Adaptive retrieval-and-generation loop", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Regenerations allowed after the first draft
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,

        /// JSON array of prior turns: [{"role": "user", "content": "..."}]
        #[arg(long, value_name = "FILE")]
        history_file: Option<PathBuf>,

        /// Print a line for every stage the loop enters
        #[arg(long)]
        stream: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file and exit
    CheckConfig,

    /// List the model providers compiled into this binary
    Providers,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => CliConfig::load(path),
        None => {
            tracing::debug!("No config file given, using defaults");
            Ok(CliConfig::default())
        }
    }
}

async fn load_history(path: &Path) -> Result<Vec<Turn>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid history file: {}", path.display()))
}

async fn evidence_store(config: &CliConfig) -> Result<Arc<dyn EvidenceStore>> {
    match &config.corpus.path {
        Some(path) => {
            let store = InMemoryEvidenceStore::load(path)
                .await
                .context("Failed to load evidence corpus")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No corpus configured, every question will fall back to web search");
            Ok(Arc::new(InMemoryEvidenceStore::default()))
        }
    }
}

fn print_snapshot(snapshot: &LoopSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize snapshot"),
        }
    } else {
        eprintln!(
            "[{}] step={} store={} web={} fallback={}",
            snapshot.stage,
            snapshot.loop_step,
            snapshot.store_passages,
            snapshot.web_passages,
            snapshot.needs_web_fallback
        );
    }
}

async fn ask(
    config: CliConfig,
    question: String,
    max_retries: Option<u32>,
    history_file: Option<PathBuf>,
    stream: bool,
    json: bool,
) -> Result<()> {
    let provider = ProviderRegistry::with_defaults()
        .create_from_config(&config.provider)
        .context("Failed to create model provider")?;
    let web = TavilySearch::from_config(&config.web).context("Failed to configure web search")?;
    let store = evidence_store(&config).await?;

    let orchestrator = OrchestratorBuilder::new()
        .provider(provider)
        .evidence_store(store)
        .web_search(Arc::new(web))
        .config(config.runtime)
        .build()
        .context("Failed to build control loop")?;

    let mut request = RunRequest::new(question);
    request.max_retries = max_retries;
    if let Some(path) = history_file {
        request.history = load_history(&path).await?;
    }

    let outcome = if stream {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                print_snapshot(&snapshot, json);
            }
        });
        let outcome = orchestrator.run_streaming(request, tx).await;
        printer.await.context("Snapshot printer failed")?;
        outcome?
    } else {
        orchestrator.run(request).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.display_answer());
        eprintln!(
            "loop_step={} termination={:?} passages={}",
            outcome.loop_step,
            outcome.termination,
            outcome.evidence.len()
        );
    }

    let usage = orchestrator.usage();
    tracing::info!(
        llm_calls = usage.llm_calls,
        total_tokens = usage.total_tokens,
        "Model usage"
    );
    Ok(())
}

fn check_config(config: &CliConfig) -> Result<()> {
    config.runtime.validate().context("Invalid runtime section")?;

    let registry = ProviderRegistry::with_defaults();
    let provider_type = config.provider["type"]
        .as_str()
        .context("provider section requires a 'type' field")?;
    registry
        .validate(provider_type, &config.provider)
        .context("Invalid provider section")?;

    if let Some(path) = &config.corpus.path {
        anyhow::ensure!(path.exists(), "Corpus file not found: {}", path.display());
    }

    println!("Configuration OK");
    println!("  provider:    {}", provider_type);
    println!("  model:       {}", config.runtime.model.model);
    println!("  max_retries: {}", config.runtime.max_retries);
    println!(
        "  corpus:      {}",
        config
            .corpus
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    Ok(())
}

fn list_providers() {
    let registry = ProviderRegistry::with_defaults();
    for factory in registry.factories() {
        println!("{:<10} {}", factory.provider_type(), factory.description());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Ask {
            question,
            max_retries,
            history_file,
            stream,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            ask(config, question, max_retries, history_file, stream, json).await
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref())?;
            check_config(&config)
        }
        Commands::Providers => {
            list_providers();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_ask() {
        let cli = Cli::parse_from([
            "ragloop",
            "-c",
            "ragloop.yaml",
            "ask",
            "What was revenue?",
            "--max-retries",
            "1",
            "--stream",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("ragloop.yaml")));
        match cli.command {
            Commands::Ask {
                question,
                max_retries,
                stream,
                json,
                ..
            } => {
                assert_eq!(question, "What was revenue?");
                assert_eq!(max_retries, Some(1));
                assert!(stream);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_config_rejects_unknown_provider() {
        let mut config = CliConfig::default();
        config.provider = serde_json::json!({ "type": "carrier-pigeon" });
        assert!(check_config(&config).is_err());
    }

    #[test]
    fn test_check_config_rejects_invalid_runtime() {
        let mut config = CliConfig::default();
        config.runtime.web_top_k = 0;
        assert!(check_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_history_file_round_trip() {
        let path = std::env::temp_dir().join(format!("ragloop-history-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]"#,
        )
        .unwrap();

        let history = load_history(&path).await.unwrap();
        assert_eq!(history, vec![Turn::user("hi"), Turn::assistant("hello")]);

        std::fs::remove_file(&path).unwrap();
    }
}
