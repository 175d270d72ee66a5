//! Maestro CLI
//!
//! # Usage
//! ```bash
//! maestro [--config maestro.toml] [--verbose] roles [--json]
//! maestro run session.json [--journal maestro.db] [--json]
//! maestro journal maestro.db [--session <uuid>]
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use maestro_core::{JournalStore, MaestroConfig, Orchestrator, RoleRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod script;

use script::{Script, StepOutcome};

/// Maestro - coordination of multi-role agent workflows
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (.toml or .json); built-in roles when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured roles
    Roles {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a handoff script against a fresh session
    Run {
        /// Script file (JSON)
        script: PathBuf,

        /// Persist the session journal to this SQLite database
        #[arg(long, value_name = "DB")]
        journal: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print persisted journal entries
    Journal {
        /// SQLite database written by `run --journal`
        db: PathBuf,

        /// Only this session
        #[arg(long)]
        session: Option<Uuid>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => MaestroConfig::from_file(path)
            .with_context(|| format!("Loading configuration {}", path.display()))?,
        None => MaestroConfig::default(),
    };

    match cli.command {
        Commands::Roles { json } => {
            let registry = config.registry()?;
            print_roles(&registry, json)?;
        }
        Commands::Run {
            script,
            journal,
            json,
        } => {
            let script = Script::from_file(&script)?;
            let session = script.session.clone().unwrap_or(config.session.clone());
            let registry = Arc::new(config.registry()?);

            let mut orchestrator = Orchestrator::new(registry, session);
            let outcomes = script::replay(&mut orchestrator, &script)?;
            let archive = orchestrator.close();

            if let Some(path) = journal {
                let store = JournalStore::open(&path)?;
                let written = store.append_all(&archive.journal)?;
                tracing::info!(
                    session = %archive.session_id,
                    entries = written,
                    db = %path.display(),
                    "Journal persisted"
                );
            }

            if json {
                let output = serde_json::json!({
                    "steps": outcomes,
                    "archive": archive,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for outcome in &outcomes {
                    println!("{}", describe(outcome));
                }
                println!();
                println!("SESSION: {}", archive.session_id);
                println!("FACTS:");
                for fact in &archive.snapshot.facts {
                    println!("  [{}] {} ({})", fact.seq, fact.text, fact.role);
                }
                println!("OPEN QUESTIONS:");
                for question in &archive.snapshot.open_questions {
                    println!("  {} {} ({})", question.id, question.text, question.owner);
                }
            }
        }
        Commands::Journal { db, session } => {
            let store = JournalStore::open(&db)?;
            let sessions = match session {
                Some(id) => vec![id],
                None => store.sessions()?,
            };

            for id in sessions {
                println!("SESSION {}", id);
                for entry in store.load_session(id)? {
                    println!(
                        "  {:>4} {} {:<20} {:<36} {:<16} {}",
                        entry.seq,
                        entry.timestamp.to_rfc3339(),
                        entry.role.as_ref().map(|r| r.as_str()).unwrap_or("-"),
                        entry.task.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
                        entry.event.name(),
                        entry.event.payload(),
                    );
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn print_roles(registry: &RoleRegistry, json: bool) -> anyhow::Result<()> {
    if json {
        let roles: Vec<_> = registry.iter().collect();
        println!("{}", serde_json::to_string_pretty(&roles)?);
        return Ok(());
    }

    for role in registry.iter() {
        println!("{}  {}", role.id, role.description);
        for responsibility in &role.responsibilities {
            println!("    - {}", responsibility);
        }
        if !role.required_fields.is_empty() {
            let fields: Vec<_> = role.required_fields.iter().map(|f| f.to_string()).collect();
            println!("    requires: {}", fields.join(", "));
        }
    }
    Ok(())
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Delegated { label, task } => format!("delegated  {} -> {}", label, task),
        StepOutcome::Accepted { label, outcome } => {
            let mut line = format!(
                "accepted   {} [{}] +{} facts",
                label,
                outcome.status,
                outcome.accepted_facts.len()
            );
            if let Some(next) = &outcome.next_step {
                line.push_str(&format!(", next: {} ({})", next.role, next.task));
            }
            if outcome.requires_confirmation {
                line.push_str(", awaiting confirmation");
            }
            if outcome.cycle_detected {
                line.push_str(", hand-back cycle");
            }
            line
        }
        StepOutcome::Blocked { label } => format!("blocked    {}", label),
        StepOutcome::Retried {
            label,
            task,
            retry_of,
        } => format!("retried    {} -> {} (from {})", label, task, retry_of),
        StepOutcome::Resolved { question, matched } => {
            format!("resolved   {:?} matched={}", question, matched)
        }
        StepOutcome::Refused { step, error } => format!("refused    step {}: {}", step, error),
    }
}
