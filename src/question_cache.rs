//! Recently answered questions, per tenant.
//!
//! When someone asks something that was answered a moment ago, the bot
//! points back at the earlier answer instead of regenerating it. Matching
//! uses word-set Jaccard similarity over normalized questions, so
//! reordered or lightly reworded repeats still hit.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use docbot_core::clock::Clock;
use docbot_core::models::CachedAnswer;
use docbot_core::text::question_similarity;
use tracing::debug;

use crate::config::ConversationConfig;

pub struct QuestionCache {
    entries: Mutex<HashMap<String, VecDeque<CachedAnswer>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_size: usize,
    threshold: f64,
}

impl QuestionCache {
    pub fn new(ttl: Duration, max_size: usize, threshold: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl,
            max_size: max_size.max(1),
            threshold,
        }
    }

    pub fn from_config(config: &ConversationConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.cache_ttl(),
            config.cache_size,
            config.duplicate_threshold,
            clock,
        )
    }

    /// The most recent live answer to a question similar to `question`.
    ///
    /// Expired entries of the tenant are purged first.
    pub fn find_cached_answer(&self, question: &str, tenant_id: &str) -> Option<CachedAnswer> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let queue = entries.get_mut(tenant_id)?;

        queue.retain(|e| now - e.created_at < self.ttl);

        let hit = queue
            .iter()
            .rev()
            .find(|e| question_similarity(question, &e.question) >= self.threshold)
            .cloned();
        if let Some(h) = &hit {
            debug!(tenant = %tenant_id, cached = %h.question, "question cache hit");
        }
        hit
    }

    /// Remember an answer. The oldest entry is evicted past the size limit.
    pub fn cache_answer(
        &self,
        question: &str,
        answer: &str,
        tenant_id: &str,
        message_ref: &str,
        user_id: &str,
    ) {
        let entry = CachedAnswer {
            question: question.to_string(),
            answer: answer.to_string(),
            tenant_id: tenant_id.to_string(),
            message_ref: message_ref.to_string(),
            user_id: user_id.to_string(),
            created_at: self.clock.now(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let queue = entries.entry(tenant_id.to_string()).or_default();
        queue.push_back(entry);
        while queue.len() > self.max_size {
            queue.pop_front();
        }
    }

    /// Drop one tenant's entries, or everything when `None`.
    pub fn clear(&self, tenant_id: Option<&str>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match tenant_id {
            Some(t) => {
                entries.remove(t);
            }
            None => entries.clear(),
        }
    }

    pub fn len(&self, tenant_id: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(tenant_id)
            .map_or(0, |q| q.len())
    }
}
