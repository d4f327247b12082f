//! # DocBot Core
//!
//! Shared, I/O-free logic for DocBot: data models, chunking, the
//! similarity function, ranking, prompt assembly, question normalization,
//! message triage, and the response tables used by the chat engine.
//!
//! This crate contains no tokio, network, or filesystem dependencies.
//! Time and randomness enter through the [`clock::Clock`] and
//! [`responses::RandomSource`] traits so callers (and tests) control them.

pub mod chunk;
pub mod clock;
pub mod embedding;
pub mod message;
pub mod models;
pub mod prompt;
pub mod responses;
pub mod search;
pub mod text;
