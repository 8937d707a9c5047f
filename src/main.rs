//! DocPilot - AI command shell for a text document
//!
//! Loads a markdown file into an editor session and reads commands from
//! stdin. Lines starting with `:` drive the editor, everything else goes to
//! the assistant.

use anyhow::{Context, Result};
use clap::Parser;
use docpilot::audit::AuditLog;
use docpilot::bridge::{EditorBridge, EditorSurface};
use docpilot::config::Config;
use docpilot::dispatcher::AgentResponse;
use docpilot::document::Document;
use docpilot::intent::Classifier;
use docpilot::providers::{create_providers, StaticToken};
use docpilot::selection::SelectionEvent;
use docpilot::Assistant;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Markdown file to edit
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the intent for a command as JSON and exit
    #[arg(long)]
    classify: Option<String>,

    /// Completion backend: api, groq or ollama
    #[arg(long)]
    backend: Option<String>,
}

const HELP: &str = "\
Commands:
  :select START END   select a char range
  :clear              clear the selection
  :accept / :reject   resolve the pending suggestion
  :show               print the document
  :undo               undo the last change
  :write              save to --file
  :quit               exit
Anything else is sent to the assistant.";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load()?;

    if let Some(command) = &args.classify {
        let classifier = Classifier::new(config.command_corrections.clone());
        println!("{}", serde_json::to_string_pretty(&classifier.classify(command))?);
        return Ok(());
    }

    if let Some(backend) = &args.backend {
        config.completion_backend = backend.clone();
    }

    // Setup logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("📝 DocPilot v{} starting...", env!("CARGO_PKG_VERSION"));

    let document = match &args.file {
        Some(path) if path.exists() => {
            let markup = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Document::from_markup(&markup)
        }
        _ => Document::new(),
    };
    let editor = EditorBridge::new(document);

    let credentials = Arc::new(StaticToken(Some(config.api_token.clone())));
    let providers = create_providers(&config, credentials);
    let mut assistant = Assistant::new(&config, Arc::new(editor.clone()), providers);
    if config.audit_enabled {
        assistant = assistant.with_audit(AuditLog::default_location());
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":q" {
            break;
        }
        if let Err(e) = run_line(line, &assistant, &editor, args.file.as_ref()).await {
            warn!("❌ {}", e);
            println!("Error: {}", e);
        }
    }

    info!("👋 Goodbye");
    Ok(())
}

async fn run_line(
    line: &str,
    assistant: &Assistant,
    editor: &EditorBridge,
    file: Option<&PathBuf>,
) -> Result<()> {
    let mut parts = line.split_whitespace();
    match parts.next().unwrap_or_default() {
        ":select" => {
            let start: usize = parts.next().context("missing START")?.parse()?;
            let end: usize = parts.next().context("missing END")?.parse()?;
            match assistant.on_selection_change(Some(start..end), None)? {
                SelectionEvent::Captured { snapshot, .. } => {
                    println!("Selected #{}: {:?}", snapshot.id, snapshot.text)
                }
                SelectionEvent::Cleared => println!("Nothing selected"),
            }
        }
        ":clear" => {
            assistant.on_selection_change(None, None)?;
        }
        ":accept" => {
            let mutation = assistant.accept()?;
            println!("Applied at {}..{}", mutation.range.start, mutation.range.end);
        }
        ":reject" => {
            assistant.reject()?;
            println!("Suggestion discarded");
        }
        ":show" => println!("{}", editor.read()?),
        ":undo" => {
            if !editor.undo()? {
                println!("Nothing to undo");
            }
        }
        ":write" => {
            let path = file.context("no --file given")?;
            std::fs::write(path, editor.markup()?)?;
            println!("Saved {}", path.display());
        }
        ":help" => println!("{}", HELP),
        _ => {
            let outcome = assistant.handle(line).await?;
            if outcome.response != AgentResponse::Superseded {
                println!("{}", outcome.response);
            }
            if let Some(mutation) = outcome.applied {
                println!(
                    "({:?} at {}..{})",
                    mutation.mode, mutation.range.start, mutation.range.end
                );
            }
            if outcome.response.needs_auth() {
                println!("Set DOCPILOT_TOKEN and restart to sign in.");
            }
        }
    }
    Ok(())
}
