//! # DocBot CLI (`docbot`)
//!
//! Command-line front end for the DocBot engine: ingest documentation into
//! tenants, ask questions, and drive a chat session from stdin.
//!
//! ## Usage
//!
//! ```bash
//! docbot --config ./config/docbot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docbot ingest <paths...> --tenant <id>` | Load files, directories or `--url` pages |
//! | `docbot ask "<question>" --tenant <id>` | Answer one question |
//! | `docbot chat --tenant <id>` | Answer stdin messages like a chat channel |
//! | `docbot tenants` | List tenants with chunk counts and sources |
//! | `docbot clear --tenant <id>` / `--all` | Remove stored chunks |
//! | `docbot tone get\|set` | Read or change a tenant's response tone |
//! | `docbot stats` | Storage and provider summary |
//! | `docbot completions <shell>` | Print shell completions |
//!
//! Logs go to stderr and honor `RUST_LOG` (default `info`).

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docbot::commands;
use docbot::config;

/// DocBot: documentation Q&A for community chats.
#[derive(Parser)]
#[command(
    name = "docbot",
    about = "DocBot: multi-tenant documentation Q&A with retrieval and duplicate detection",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docbot.toml`.
    #[arg(long, global = true, default_value = "./config/docbot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents into a tenant.
    ///
    /// Paths may be `.md`, `.txt` or `.pdf` files or directories. Directories
    /// are walked recursively and filtered by `--include`.
    Ingest {
        /// Files or directories to load.
        paths: Vec<PathBuf>,

        /// Tenant (project) receiving the documents.
        #[arg(long, default_value = "default")]
        tenant: String,

        /// Web pages to fetch and load.
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Include globs for directories (default: md, txt, pdf).
        #[arg(long = "include")]
        include: Vec<String>,
    },

    /// Answer a single question.
    Ask {
        question: String,

        #[arg(long, default_value = "default")]
        tenant: String,

        /// Number of chunks to retrieve (default from config).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer questions read from stdin, one message per line.
    ///
    /// Applies the full chat pipeline: message triage, cooldown, duplicate
    /// detection with escalating replies, and answering.
    Chat {
        #[arg(long, default_value = "default")]
        tenant: String,

        #[arg(long, default_value = "cli")]
        channel: String,

        #[arg(long, default_value = "cli-user")]
        user: String,
    },

    /// List tenants and their documents.
    Tenants,

    /// Remove stored documents.
    Clear {
        #[arg(long, conflicts_with = "all")]
        tenant: Option<String>,

        /// Remove every tenant's documents.
        #[arg(long)]
        all: bool,
    },

    /// Read or set a tenant's response tone.
    Tone {
        #[command(subcommand)]
        action: ToneAction,
    },

    /// Show storage and provider statistics.
    Stats,

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ToneAction {
    Get {
        #[arg(long, default_value = "default")]
        tenant: String,
    },
    /// Set the tone: casual, neutral or professional.
    Set {
        tone: String,

        #[arg(long, default_value = "default")]
        tenant: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "docbot", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            paths,
            tenant,
            urls,
            include,
        } => {
            commands::run_ingest(&cfg, &tenant, &paths, &urls, &include).await?;
        }
        Commands::Ask {
            question,
            tenant,
            top_k,
        } => {
            commands::run_ask(&cfg, &tenant, &question, top_k).await?;
        }
        Commands::Chat {
            tenant,
            channel,
            user,
        } => {
            commands::run_chat(&cfg, &tenant, &channel, &user).await?;
        }
        Commands::Tenants => {
            commands::run_tenants(&cfg).await?;
        }
        Commands::Clear { tenant, all } => {
            commands::run_clear(&cfg, tenant.as_deref(), all).await?;
        }
        Commands::Tone { action } => match action {
            ToneAction::Get { tenant } => commands::run_tone_get(&cfg, &tenant)?,
            ToneAction::Set { tone, tenant } => commands::run_tone_set(&cfg, &tenant, &tone)?,
        },
        Commands::Stats => {
            commands::run_stats(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
