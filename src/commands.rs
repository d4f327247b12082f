//! CLI command implementations.
//!
//! Each `run_*` function backs one `docbot` subcommand. Commands that only
//! touch stored data open the store directly; `ask` and `chat` build the
//! full engine and therefore need the LLM API key.

use std::path::PathBuf;

use anyhow::{bail, Result};
use docbot_core::message::{is_greeting, is_question, should_ignore};
use docbot_core::models::ToneMode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::bot::{DocBot, IncomingQuestion, Reply};
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::ingest::Loader;
use crate::settings::ProjectSettings;
use crate::store::TenantStore;

fn open_store(cfg: &Config) -> Result<TenantStore> {
    let embedder = create_embedder(&cfg.embedding)?;
    Ok(TenantStore::open(cfg.storage.documents_path(), embedder))
}

/// Load files, directories and URLs into `tenant`.
pub async fn run_ingest(
    cfg: &Config,
    tenant: &str,
    paths: &[PathBuf],
    urls: &[String],
    include_globs: &[String],
) -> Result<()> {
    if paths.is_empty() && urls.is_empty() {
        bail!("Nothing to ingest: pass at least one path or --url");
    }

    let loader = Loader::new(&cfg.chunking);
    let mut chunks = Vec::new();
    for path in paths {
        if path.is_dir() {
            chunks.extend(loader.load_directory(path, include_globs)?);
        } else {
            chunks.extend(loader.load_file(path)?);
        }
    }
    for url in urls {
        let loaded = loader.load_url(url).await?;
        info!(url = %url, chunks = loaded.len(), "loaded url");
        chunks.extend(loaded);
    }

    let store = open_store(cfg)?;
    let added = store.add_documents(chunks, tenant).await?;
    println!("Ingested {} chunks into tenant '{}'.", added, tenant);
    println!("Tenant '{}' now holds {} chunks.", tenant, store.count(Some(tenant)).await);
    Ok(())
}

/// Answer one question and print the result.
pub async fn run_ask(cfg: &Config, tenant: &str, question: &str, top_k: Option<usize>) -> Result<()> {
    let bot = DocBot::from_config(cfg)?;
    let result = bot.answer(question, tenant, top_k).await;

    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!();
        println!("Sources: {}", result.sources.join(", "));
    }
    println!(
        "confidence: {:.3}  kind: {:?}{}",
        result.confidence,
        result.kind,
        result
            .intent
            .as_deref()
            .map(|i| format!("  intent: {}", i))
            .unwrap_or_default()
    );
    Ok(())
}

/// Read messages from stdin, one per line, as a single chat channel.
pub async fn run_chat(cfg: &Config, tenant: &str, channel: &str, user: &str) -> Result<()> {
    let bot = DocBot::from_config(cfg)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut n: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        n += 1;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if should_ignore(text) || (is_greeting(text) && !is_question(text)) {
            debug!(line = n, "ignoring message");
            continue;
        }
        if !is_question(text) {
            debug!(line = n, "not a question");
            continue;
        }

        let reply = bot
            .handle(&IncomingQuestion {
                tenant_id: tenant.to_string(),
                channel_id: channel.to_string(),
                user_id: user.to_string(),
                text: text.to_string(),
                message_ref: format!("{}#{}", channel, n),
            })
            .await;

        match reply {
            Reply::Answered(result) => {
                println!("{}", result.answer);
                if !result.sources.is_empty() {
                    println!("  (sources: {})", result.sources.join(", "));
                }
            }
            Reply::Duplicate { text, cached } => {
                println!("{} (see {})", text, cached.message_ref);
            }
            Reply::Silent => {}
            Reply::Cooldown { seconds_remaining } => {
                println!("slow down, try again in {}s", seconds_remaining);
            }
        }
    }
    Ok(())
}

pub async fn run_tenants(cfg: &Config) -> Result<()> {
    let store = open_store(cfg)?;
    let tenants = store.list_tenants().await;
    if tenants.is_empty() {
        println!("No tenants.");
        return Ok(());
    }
    println!("{:<24} {:>8}  SOURCES", "TENANT", "CHUNKS");
    for t in tenants {
        println!("{:<24} {:>8}  {}", t.tenant_id, t.doc_count, t.sources.join(", "));
    }
    Ok(())
}

pub async fn run_clear(cfg: &Config, tenant: Option<&str>, all: bool) -> Result<()> {
    let store = open_store(cfg)?;
    match (tenant, all) {
        (Some(t), false) => {
            let removed = store.clear_tenant(t).await;
            println!("Removed {} chunks from tenant '{}'.", removed, t);
        }
        (None, true) => {
            let removed = store.clear_all().await;
            println!("Removed {} chunks from all tenants.", removed);
        }
        _ => bail!("Specify exactly one of --tenant or --all"),
    }
    Ok(())
}

pub fn run_tone_get(cfg: &Config, tenant: &str) -> Result<()> {
    let settings = ProjectSettings::open(cfg.storage.settings_path());
    println!("{}", settings.get_tone(tenant));
    Ok(())
}

pub fn run_tone_set(cfg: &Config, tenant: &str, tone: &str) -> Result<()> {
    let tone: ToneMode = tone.parse()?;
    let settings = ProjectSettings::open(cfg.storage.settings_path());
    settings.set_tone(tenant, tone);
    println!("Tone for '{}' set to {}.", tenant, tone);
    Ok(())
}

pub async fn run_stats(cfg: &Config) -> Result<()> {
    let store = open_store(cfg)?;
    let settings = ProjectSettings::open(cfg.storage.settings_path());
    let tenants = store.list_tenants().await;

    println!("Data directory:   {}", cfg.storage.data_dir.display());
    println!(
        "Embedding:        {} ({} dims)",
        store.embedder().model_name(),
        store.embedder().dims()
    );
    println!("LLM:              {} / {}", cfg.llm.provider, cfg.llm.model);
    println!("Tenants:          {}", tenants.len());
    println!("Total chunks:     {}", store.count(None).await);
    for t in &tenants {
        println!(
            "  {:<22} {:>6} chunks  {:>3} sources  tone {}",
            t.tenant_id,
            t.doc_count,
            t.sources.len(),
            settings.get_tone(&t.tenant_id)
        );
    }
    if !cfg.embedding.is_semantic() {
        warn!("hash embeddings are lexical only; configure a semantic provider for better recall");
    }
    Ok(())
}
