//! The chat engine facade.
//!
//! [`DocBot`] owns every service the chat adapters need and exposes one
//! entry point, [`DocBot::handle`], that runs a question through the
//! conversational pipeline:
//!
//! 1. **Cooldown**: users asking faster than the cooldown get told to wait.
//! 2. **Duplicate lookup**: a question answered recently in the same
//!    tenant is not regenerated. The repeat tracker counts how often the
//!    `(channel, topic)` pair was repeated and picks an escalating reply,
//!    going silent after the last tier.
//! 3. **Answer**: retrieval, confidence gate and generation.
//!
//! The lower-level operations are exposed as pass-throughs so adapters can
//! compose their own flows.

use std::sync::Arc;

use anyhow::Result;
use docbot_core::clock::{Clock, SystemClock};
use docbot_core::models::{CachedAnswer, NewChunk, TenantSummary, TokenUsage, ToneMode};
use docbot_core::responses::{self, RandomSource, ThreadRandom};
use docbot_core::text::extract_topic;
use tracing::{debug, info, warn};

use crate::answer::{AnswerKind, AnswerResult, Answerer};
use crate::config::Config;
use crate::cooldown::{CooldownCheck, CooldownLimiter};
use crate::embedding::create_embedder;
use crate::generation::{GenerationProvider, OpenAICompatibleGenerator};
use crate::question_cache::QuestionCache;
use crate::repeat::{RepeatKey, RepeatTracker};
use crate::retrieval::Retriever;
use crate::settings::ProjectSettings;
use crate::store::TenantStore;
use crate::usage::UsageTracker;

/// A question as it arrives from a chat platform.
#[derive(Debug, Clone)]
pub struct IncomingQuestion {
    pub tenant_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    /// Platform reference of the message that will carry the answer.
    pub message_ref: String,
}

/// What the adapter should do with a question.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Answered(AnswerResult),
    /// The question repeats a cached one.
    Duplicate { text: String, cached: CachedAnswer },
    /// Repeated past the last tier: say nothing.
    Silent,
    Cooldown { seconds_remaining: u64 },
}

/// Injectable collaborators for [`DocBot::new`].
pub struct Services {
    pub store: Arc<TenantStore>,
    pub generator: Arc<dyn GenerationProvider>,
    pub settings: Arc<ProjectSettings>,
    pub clock: Arc<dyn Clock>,
    pub rng: Arc<dyn RandomSource>,
}

pub struct DocBot {
    answerer: Answerer,
    store: Arc<TenantStore>,
    settings: Arc<ProjectSettings>,
    usage: Arc<UsageTracker>,
    cache: QuestionCache,
    repeats: RepeatTracker,
    cooldowns: CooldownLimiter,
    rng: Arc<dyn RandomSource>,
}

impl DocBot {
    pub fn new(config: &Config, services: Services) -> Self {
        let conv = &config.conversation;
        let usage = Arc::new(UsageTracker::new());
        let retriever = Retriever::new(services.store.clone(), &config.retrieval);
        let answerer = Answerer::new(
            retriever,
            services.generator,
            services.settings.clone(),
            usage.clone(),
            services.rng.clone(),
        )
        .with_max_tokens(config.llm.max_tokens)
        .with_closing_probability(conv.closing_probability);

        Self {
            answerer,
            store: services.store,
            settings: services.settings,
            usage,
            cache: QuestionCache::from_config(conv, services.clock.clone()),
            repeats: RepeatTracker::new(conv.repeat_reset(), services.clock.clone()),
            cooldowns: CooldownLimiter::new(conv.cooldown(), services.clock),
            rng: services.rng,
        }
    }

    /// Build the engine from configuration: the configured embedder and
    /// generator, storage under `data_dir`, wall clock and thread RNG.
    pub fn from_config(config: &Config) -> Result<Self> {
        let generator: Arc<dyn GenerationProvider> =
            Arc::new(OpenAICompatibleGenerator::new(&config.llm)?);
        Self::from_config_with_generator(config, generator)
    }

    /// Like [`DocBot::from_config`] with a caller-supplied generator.
    pub fn from_config_with_generator(
        config: &Config,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        if !config.embedding.is_semantic() {
            warn!("using hash embeddings; retrieval only matches shared words");
        }
        let embedder = create_embedder(&config.embedding)?;
        let store = Arc::new(TenantStore::open(config.storage.documents_path(), embedder));
        let settings = Arc::new(ProjectSettings::open(config.storage.settings_path()));
        Ok(Self::new(
            config,
            Services {
                store,
                generator,
                settings,
                clock: Arc::new(SystemClock),
                rng: Arc::new(ThreadRandom),
            },
        ))
    }

    /// Run one question through cooldown, duplicate detection and answering.
    pub async fn handle(&self, q: &IncomingQuestion) -> Reply {
        let check = self.cooldowns.check_cooldown(&q.user_id);
        if !check.allowed {
            debug!(user = %q.user_id, remaining = check.seconds_remaining, "user on cooldown");
            return Reply::Cooldown {
                seconds_remaining: check.seconds_remaining,
            };
        }

        if let Some(cached) = self.cache.find_cached_answer(&q.text, &q.tenant_id) {
            let topic = extract_topic(&q.text);
            let count = self
                .repeats
                .get_repeat_count(&RepeatKey::new(q.channel_id.clone(), topic.clone()));
            return match self.select_duplicate_response(&topic, count) {
                Some(text) => {
                    debug!(tenant = %q.tenant_id, topic = %topic, count, "duplicate question");
                    self.cooldowns.record_question(&q.user_id);
                    Reply::Duplicate { text, cached }
                }
                None => {
                    debug!(tenant = %q.tenant_id, topic = %topic, count, "duplicate past last tier, staying silent");
                    Reply::Silent
                }
            };
        }

        let result = self.answerer.answer(&q.text, &q.tenant_id, None).await;
        if matches!(result.kind, AnswerKind::Generated | AnswerKind::Declined) {
            self.cache.cache_answer(
                &q.text,
                &result.answer,
                &q.tenant_id,
                &q.message_ref,
                &q.user_id,
            );
        }
        if result.kind != AnswerKind::GenerationFailed {
            self.cooldowns.record_question(&q.user_id);
        }
        Reply::Answered(result)
    }

    pub async fn answer(&self, question: &str, tenant_id: &str, top_k: Option<usize>) -> AnswerResult {
        self.answerer.answer(question, tenant_id, top_k).await
    }

    pub async fn add_documents(&self, chunks: Vec<NewChunk>, tenant_id: &str) -> Result<usize> {
        self.store.add_documents(chunks, tenant_id).await
    }

    /// Remove a tenant's documents and its cached answers.
    pub async fn clear_tenant(&self, tenant_id: &str) -> usize {
        let removed = self.store.clear_tenant(tenant_id).await;
        self.cache.clear(Some(tenant_id));
        removed
    }

    pub async fn clear_all(&self) -> usize {
        let removed = self.store.clear_all().await;
        self.cache.clear(None);
        removed
    }

    pub async fn doc_count(&self, tenant_id: Option<&str>) -> usize {
        self.store.count(tenant_id).await
    }

    pub async fn list_tenants(&self) -> Vec<TenantSummary> {
        self.store.list_tenants().await
    }

    pub fn project_tone(&self, tenant_id: &str) -> ToneMode {
        self.settings.get_tone(tenant_id)
    }

    pub fn set_project_tone(&self, tenant_id: &str, tone: ToneMode) {
        info!(tenant = %tenant_id, tone = %tone, "tone updated");
        self.settings.set_tone(tenant_id, tone);
    }

    pub fn check_cooldown(&self, user_id: &str) -> CooldownCheck {
        self.cooldowns.check_cooldown(user_id)
    }

    pub fn record_question(&self, user_id: &str) {
        self.cooldowns.record_question(user_id);
    }

    pub fn reset_cooldown(&self, user_id: &str) {
        self.cooldowns.reset(user_id);
    }

    pub fn find_cached_answer(&self, question: &str, tenant_id: &str) -> Option<CachedAnswer> {
        self.cache.find_cached_answer(question, tenant_id)
    }

    pub fn cache_answer(
        &self,
        question: &str,
        answer: &str,
        tenant_id: &str,
        message_ref: &str,
        user_id: &str,
    ) {
        self.cache
            .cache_answer(question, answer, tenant_id, message_ref, user_id);
    }

    pub fn repeat_count(&self, key: &RepeatKey) -> u32 {
        self.repeats.get_repeat_count(key)
    }

    pub fn reset_repeats(&self, key: Option<&RepeatKey>) {
        self.repeats.reset(key);
    }

    pub fn select_duplicate_response(&self, topic: &str, count: u32) -> Option<String> {
        responses::select_duplicate_response(self.rng.as_ref(), topic, count)
    }

    pub fn usage(&self, tenant_id: &str) -> TokenUsage {
        self.usage.usage(tenant_id)
    }

    pub fn all_usage(&self) -> Vec<(String, TokenUsage)> {
        self.usage.all()
    }
}
