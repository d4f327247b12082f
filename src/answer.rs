//! Answer orchestration: retrieve, gate, then generate or decline.
//!
//! ```text
//! question ─▶ retrieve ─▶ gate ─┬─ no chunks ───▶ "no docs yet" reply
//!                               ├─ low score ───▶ topic-aware decline
//!                               └─ confident ───▶ context + tone ─▶ generator
//! ```
//!
//! Every path returns an [`AnswerResult`]; generator failures surface as
//! [`AnswerKind::GenerationFailed`] with a retry message instead of an
//! error.

use std::sync::Arc;

use docbot_core::models::ToneMode;
use docbot_core::prompt::{answer_system_prompt, build_context, decline_system_prompt};
use docbot_core::responses::{
    decline_template, maybe_add_closing, no_docs_response, retry_response, RandomSource,
};
use docbot_core::search::{Assessment, Retrieval};
use docbot_core::text::{extract_intent, extract_topic, is_multi_topic};
use serde::Serialize;
use tracing::{debug, warn};

use crate::generation::{CompletionRequest, GenerationProvider};
use crate::retrieval::Retriever;
use crate::settings::ProjectSettings;
use crate::usage::UsageTracker;

/// Token budget for the one-sentence decline.
const DECLINE_MAX_TOKENS: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// The tenant has no documents.
    NoKnowledgeBase,
    /// Documents exist but none matched well enough.
    Declined,
    Generated,
    /// The generator errored or timed out; the answer is a retry message.
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    /// Distinct sources in ranked order.
    pub sources: Vec<String>,
    /// Mean similarity of the retrieved chunks.
    pub confidence: f32,
    pub intent: Option<String>,
    pub kind: AnswerKind,
}

pub struct Answerer {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    settings: Arc<ProjectSettings>,
    usage: Arc<UsageTracker>,
    rng: Arc<dyn RandomSource>,
    max_tokens: u32,
    closing_probability: f64,
}

impl Answerer {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn GenerationProvider>,
        settings: Arc<ProjectSettings>,
        usage: Arc<UsageTracker>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            retriever,
            generator,
            settings,
            usage,
            rng,
            max_tokens: 300,
            closing_probability: 0.3,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_closing_probability(mut self, p: f64) -> Self {
        self.closing_probability = p;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn answer(
        &self,
        question: &str,
        tenant_id: &str,
        top_k: Option<usize>,
    ) -> AnswerResult {
        let intent = extract_intent(question).map(String::from);

        let retrieval = match self.retriever.retrieve(question, tenant_id, top_k).await {
            Ok(r) => r,
            Err(e) => {
                warn!(tenant = %tenant_id, error = %e, "retrieval failed");
                return AnswerResult {
                    answer: retry_response(self.rng.as_ref()),
                    sources: Vec::new(),
                    confidence: 0.0,
                    intent,
                    kind: AnswerKind::GenerationFailed,
                };
            }
        };

        let tone = self.settings.get_tone(tenant_id);

        match self.retriever.assess(&retrieval) {
            Assessment::NoKnowledgeBase => AnswerResult {
                answer: no_docs_response(self.rng.as_ref()),
                sources: Vec::new(),
                confidence: 0.0,
                intent,
                kind: AnswerKind::NoKnowledgeBase,
            },
            Assessment::Insufficient => {
                debug!(
                    tenant = %tenant_id,
                    max = retrieval.max_similarity,
                    "low confidence, declining"
                );
                let answer = self.decline(question, tenant_id, tone).await;
                AnswerResult {
                    answer,
                    sources: retrieval.sources(),
                    confidence: retrieval.avg_similarity,
                    intent,
                    kind: AnswerKind::Declined,
                }
            }
            Assessment::Sufficient => self.generate(question, tenant_id, tone, retrieval, intent).await,
        }
    }

    async fn decline(&self, question: &str, tenant_id: &str, tone: ToneMode) -> String {
        let topic = extract_topic(question);
        let request = CompletionRequest {
            system_prompt: decline_system_prompt(&topic, tone),
            user_message: question.to_string(),
            max_tokens: DECLINE_MAX_TOKENS,
            temperature: tone.temperature(),
        };
        match self.generator.complete(&request).await {
            Ok(c) => {
                self.usage.record(tenant_id, &c.usage);
                if c.text.trim().is_empty() {
                    decline_template(self.rng.as_ref(), &topic)
                } else {
                    c.text
                }
            }
            Err(e) => {
                warn!(tenant = %tenant_id, error = %e, "decline generation failed, using template");
                decline_template(self.rng.as_ref(), &topic)
            }
        }
    }

    async fn generate(
        &self,
        question: &str,
        tenant_id: &str,
        tone: ToneMode,
        retrieval: Retrieval,
        intent: Option<String>,
    ) -> AnswerResult {
        let context = build_context(&retrieval.results);
        let request = CompletionRequest {
            system_prompt: answer_system_prompt(&context, tone, is_multi_topic(question)),
            user_message: question.to_string(),
            max_tokens: self.max_tokens,
            temperature: tone.temperature(),
        };

        let sources = retrieval.sources();
        let confidence = retrieval.avg_similarity;

        match self.generator.complete(&request).await {
            Ok(c) if !c.text.trim().is_empty() => {
                self.usage.record(tenant_id, &c.usage);
                let answer = if tone == ToneMode::Casual {
                    maybe_add_closing(self.rng.as_ref(), &c.text, self.closing_probability)
                } else {
                    c.text
                };
                AnswerResult {
                    answer,
                    sources,
                    confidence,
                    intent,
                    kind: AnswerKind::Generated,
                }
            }
            Ok(c) => {
                self.usage.record(tenant_id, &c.usage);
                warn!(
                    tenant = %tenant_id,
                    model = self.generator.model_name(),
                    "generator returned empty text"
                );
                self.failed(sources, confidence, intent)
            }
            Err(e) => {
                warn!(
                    tenant = %tenant_id,
                    model = self.generator.model_name(),
                    error = %e,
                    "answer generation failed"
                );
                self.failed(sources, confidence, intent)
            }
        }
    }

    fn failed(&self, sources: Vec<String>, confidence: f32, intent: Option<String>) -> AnswerResult {
        AnswerResult {
            answer: retry_response(self.rng.as_ref()),
            sources,
            confidence,
            intent,
            kind: AnswerKind::GenerationFailed,
        }
    }
}
