//! # DocBot
//!
//! A multi-tenant documentation Q&A engine for community chat bots.
//!
//! Projects (tenants) ingest their docs; questions asked in chat are
//! answered from the closest chunks through a language model. Questions
//! that the docs do not cover get an honest decline instead of a guess,
//! and repeated questions get an escalating pointer to the earlier answer
//! instead of a fresh generation.
//!
//! ## Architecture
//!
//! ```text
//!  chat message
//!       │
//!       ▼
//! ┌───────────┐   ┌────────────────┐   ┌───────────────┐
//! │ Cooldown  │──▶│ Question cache │──▶│ Repeat tiers  │──▶ duplicate / silent
//! └───────────┘   └───────┬────────┘   └───────────────┘
//!                         │ miss
//!                         ▼
//!                 ┌───────────────┐   ┌───────────────┐   ┌───────────┐
//!                 │ Tenant store  │──▶│ Confidence    │──▶│ Generator │──▶ answer
//!                 │ (cosine scan) │   │ gate          │   │ (LLM)     │
//!                 └───────────────┘   └───────────────┘   └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers and hash fallback |
//! | [`generation`] | Chat-completion client |
//! | [`store`] | Tenant-partitioned chunk store with JSON snapshots |
//! | [`retrieval`] | Retrieval and confidence gate |
//! | [`answer`] | Answer orchestration |
//! | [`question_cache`] | Duplicate question detection |
//! | [`repeat`] | Repeat escalation counters |
//! | [`cooldown`] | Per-user rate limiting |
//! | [`settings`] | Per-tenant tone settings |
//! | [`usage`] | Token usage counters |
//! | [`ingest`] | File, directory and URL loading |
//! | [`bot`] | The [`DocBot`](bot::DocBot) engine facade |
//! | [`commands`] | CLI command implementations |
//!
//! Pure building blocks (similarity, chunking, text normalization, prompt
//! and reply tables) live in the `docbot-core` crate.

pub mod answer;
pub mod bot;
pub mod commands;
pub mod config;
pub mod cooldown;
pub mod embedding;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod question_cache;
pub mod repeat;
pub mod retrieval;
pub mod settings;
pub mod store;
pub mod usage;

pub use bot::{DocBot, IncomingQuestion, Reply, Services};
