//! # Support Desk CLI (`desk`)
//!
//! The `desk` binary initializes the database, feeds the knowledge base,
//! serves the HTTP API, and offers a terminal chat for trying the assistant.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `desk init` | Create the SQLite database and run schema migrations |
//! | `desk serve` | Start the HTTP server |
//! | `desk ingest <file>` | Index a plain-text file |
//! | `desk refresh` | Re-scrape the website and re-index if it changed |
//! | `desk upload <pdf>` | Extract and index a PDF |
//! | `desk chat` | Interactive chat on stdin |
//! | `desk records` | List recent escalation records |
//!
//! ## Examples
//!
//! ```bash
//! desk --config ./config/desk.toml init
//! desk ingest ./docs/faq.txt --source faq
//! desk refresh
//! RUST_LOG=debug desk serve
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use support_harness::app::AppServices;
use support_harness::chat::{ChatError, ChatRequest};
use support_harness::ingest::IngestOutcome;
use support_harness::{config, migrate, server};

/// Support Desk: a retrieval-grounded support assistant with human handoff.
#[derive(Parser)]
#[command(name = "desk", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/desk.toml")]
    config: PathBuf,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Index a plain-text file.
    Ingest {
        file: PathBuf,

        /// Source tag stored with the chunks (defaults to the file name).
        #[arg(long)]
        source: Option<String>,
    },

    /// Re-scrape the configured website; re-index only if it changed.
    Refresh,

    /// Extract and index a PDF file.
    Upload { file: PathBuf },

    /// Chat with the assistant on stdin.
    Chat {
        /// Session identifier (a new one per run by default).
        #[arg(long)]
        session: Option<String>,
    },

    /// List recent escalation records, newest first.
    Records {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

fn env_filter() -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::fmt;

    let env_filter = env_filter();

    match format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn print_outcome(outcome: &IngestOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(outcome)?);
    if outcome.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ingest { file, source } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let source = source.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string())
            });
            let services = AppServices::from_config(&cfg).await?;
            print_outcome(&services.ingest.ingest_text(&text, &source).await)?;
        }
        Commands::Refresh => {
            let services = AppServices::from_config(&cfg).await?;
            print_outcome(&services.ingest.refresh_website().await)?;
        }
        Commands::Upload { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let services = AppServices::from_config(&cfg).await?;
            print_outcome(&services.ingest.ingest_upload(&filename, &bytes).await)?;
        }
        Commands::Chat { session } => {
            let services = AppServices::from_config(&cfg).await?;
            let session_id = session
                .unwrap_or_else(|| format!("cli-{}", chrono::Utc::now().timestamp_millis()));
            run_chat(&services, &session_id).await?;
        }
        Commands::Records { limit } => {
            let services = AppServices::from_config(&cfg).await?;
            let records = services.records.list(limit).await?;
            if records.is_empty() {
                println!("No records.");
            }
            for stored in records {
                let r = &stored.record;
                println!(
                    "#{} {} [{}] session={} email={} phone={}\n    {}",
                    stored.id,
                    r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    r.reason,
                    r.session_id,
                    r.email.as_deref().unwrap_or("-"),
                    r.phone.as_deref().unwrap_or("-"),
                    r.summary.replace('\n', "\n    "),
                );
            }
        }
    }

    Ok(())
}

async fn run_chat(services: &AppServices, session_id: &str) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Session {} (Ctrl-D to quit)", session_id);

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match services.chat.handle(ChatRequest::new(session_id, line)).await {
            Ok(reply) => println!("bot> {}", reply.reply),
            Err(ChatError::Validation(msg)) => eprintln!("error: {}", msg),
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_is_info() {
        let filter = tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["desk", "records", "--log-format", "json"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Commands::Records { limit: 20 }));
    }
}
