//! Canned response tables and the random source that picks from them.
//!
//! Every user-facing phrasing that is not produced by the language model
//! lives here as an explicit table. Selection goes through
//! [`RandomSource`] so tests can pin exactly which phrasing comes back.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness for response variation.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. `len` is always non-zero.
    fn index(&self, len: usize) -> usize;

    /// True with probability `p`.
    fn chance(&self, p: f64) -> bool;
}

/// Thread-local OS-seeded randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    fn chance(&self, p: f64) -> bool {
        rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Reproducible randomness from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..len)
    }

    fn chance(&self, p: f64) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Always picks the same index (clamped to the table) and a fixed coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedRandom {
    pub index: usize,
    pub chance: bool,
}

impl RandomSource for FixedRandom {
    fn index(&self, len: usize) -> usize {
        self.index.min(len.saturating_sub(1))
    }

    fn chance(&self, _p: f64) -> bool {
        self.chance
    }
}

/// Pick one entry from a non-empty table.
pub fn choose<'a>(rng: &dyn RandomSource, table: &[&'a str]) -> &'a str {
    if table.is_empty() {
        return "";
    }
    table[rng.index(table.len())]
}

/// Shown when a tenant has no documents at all.
pub const NO_DOCS_RESPONSES: &[&str] = &[
    "hey! i don't have any docs loaded yet for this server - an admin needs to add some first",
    "no docs loaded here yet! once an admin adds some, i can help answer questions",
    "looks like docs haven't been set up yet - ping an admin to load them up",
];

/// Shown when the language model call fails.
pub const RETRY_RESPONSES: &[&str] = &[
    "sorry, my brain glitched for a sec - mind asking that again?",
    "hmm something went wrong on my end, try again in a moment",
    "couldn't put an answer together just now - give it another shot?",
];

/// Templated declines; `{topic}` is substituted.
pub const DECLINE_TEMPLATES: &[&str] = &[
    "hmm not 100% sure on {topic} - might be worth asking in the main chat",
    "{topic} isn't really covered in the docs i have, maybe check with the team?",
    "honestly not finding much on {topic} - could be a question for the core team",
    "don't have a clear answer on {topic}, sorry! team might know better",
];

/// Occasional casual sign-offs.
pub const CASUAL_CLOSINGS: &[&str] = &[" 👍", " hope that helps!", " lmk if that makes sense"];

const TIER_FRIENDLY: &[&str] = &[
    "just covered {topic} above 👆",
    "answered {topic} a sec ago, scroll up a bit",
    "check above ser - just went over {topic}",
    "^ {topic} is right there fam",
];

const TIER_SASSY: &[&str] = &[
    "bro we just talked about {topic} 😅",
    "i know you saw my answer on {topic} 👀",
    "deja vu... {topic} again? same answer as before",
    "still no new info on {topic}, nothing changed yet",
    "{topic} answer hasn't moved ser, check above",
];

const TIER_DRAMATIC: &[&str] = &[
    "you're stressing me out with {topic} rn 😭 answer's still the same",
    "ser pls, {topic} hasn't changed in the last few mins",
    "asking about {topic} again won't change my answer lol",
    "the {topic} answer is still up there, i promise 🙏",
    "{topic}, again? it's right above, scroll up",
];

const TIER_FINAL: &[&str] = &[
    "still no updates on {topic} - gonna go quiet on this one now 🤐",
    "same answer on {topic}, i'll stop repeating myself after this 🙏",
    "{topic} hasn't changed - last reminder, going silent on this for a bit",
    "nothing new on {topic} yet - i'll chill on responding to this now",
    "answered {topic} already, gonna mute myself on this topic for now 🔇",
];

/// Escalation tiers, indexed by `repeat_count - 1`.
const DUPLICATE_TIERS: [&[&str]; 4] = [TIER_FRIENDLY, TIER_SASSY, TIER_DRAMATIC, TIER_FINAL];

/// Highest repeat count that still gets a reply.
pub const LAST_VOCAL_TIER: u32 = DUPLICATE_TIERS.len() as u32;

/// Reply for the `repeat_count`-th duplicate of `topic` within the window.
///
/// Returns `None` for counts past the final tier (and for zero): the caller
/// stays silent until the repeat window lapses.
pub fn select_duplicate_response(
    rng: &dyn RandomSource,
    topic: &str,
    repeat_count: u32,
) -> Option<String> {
    if repeat_count == 0 || repeat_count > LAST_VOCAL_TIER {
        return None;
    }
    let topic = if topic.trim().is_empty() { "that" } else { topic.trim() };
    let table = DUPLICATE_TIERS[(repeat_count - 1) as usize];
    Some(choose(rng, table).replace("{topic}", topic))
}

/// A templated topic-aware decline, used when the model cannot phrase one.
pub fn decline_template(rng: &dyn RandomSource, topic: &str) -> String {
    choose(rng, DECLINE_TEMPLATES).replace("{topic}", topic)
}

pub fn no_docs_response(rng: &dyn RandomSource) -> String {
    choose(rng, NO_DOCS_RESPONSES).to_string()
}

pub fn retry_response(rng: &dyn RandomSource) -> String {
    choose(rng, RETRY_RESPONSES).to_string()
}

/// With probability `p`, append a casual closing, unless the response
/// already ends in terminal punctuation.
pub fn maybe_add_closing(rng: &dyn RandomSource, response: &str, p: f64) -> String {
    let trimmed = response.trim_end();
    if trimmed.ends_with(&['!', '?'][..]) || trimmed.ends_with('👍') {
        return response.to_string();
    }
    if !rng.chance(p) {
        return response.to_string();
    }
    format!("{}{}", trimmed, choose(rng, CASUAL_CLOSINGS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_escalate_then_silence() {
        let rng = FixedRandom::default();
        let first = select_duplicate_response(&rng, "staking", 1).unwrap();
        assert_eq!(first, "just covered staking above 👆");
        let fourth = select_duplicate_response(&rng, "staking", 4).unwrap();
        assert!(fourth.contains("staking"));
        assert_eq!(select_duplicate_response(&rng, "staking", 5), None);
        assert_eq!(select_duplicate_response(&rng, "staking", 42), None);
        assert_eq!(select_duplicate_response(&rng, "staking", 0), None);
    }

    #[test]
    fn test_every_phrasing_mentions_topic() {
        for (tier_idx, tier) in DUPLICATE_TIERS.iter().enumerate() {
            for i in 0..tier.len() {
                let rng = FixedRandom { index: i, chance: false };
                let reply = select_duplicate_response(&rng, "TGE", tier_idx as u32 + 1).unwrap();
                assert!(reply.contains("TGE"), "{}", reply);
            }
        }
    }

    #[test]
    fn test_empty_topic_defaults() {
        let rng = FixedRandom::default();
        let reply = select_duplicate_response(&rng, "  ", 1).unwrap();
        assert!(reply.contains("that"));
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(7);
        let b = SeededRandom::new(7);
        let picks_a: Vec<usize> = (0..20).map(|_| a.index(5)).collect();
        let picks_b: Vec<usize> = (0..20).map(|_| b.index(5)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|i| *i < 5));
    }

    #[test]
    fn test_closing_skips_terminal_punctuation() {
        let rng = FixedRandom { index: 0, chance: true };
        assert_eq!(maybe_add_closing(&rng, "Done!", 1.0), "Done!");
        assert_eq!(maybe_add_closing(&rng, "Really?", 1.0), "Really?");
        assert_eq!(maybe_add_closing(&rng, "Staking is live", 1.0), "Staking is live 👍");
    }

    #[test]
    fn test_closing_respects_coin() {
        let rng = FixedRandom { index: 0, chance: false };
        assert_eq!(maybe_add_closing(&rng, "Staking is live", 0.3), "Staking is live");
    }

    #[test]
    fn test_decline_mentions_topic() {
        let rng = SeededRandom::new(1);
        for _ in 0..10 {
            assert!(decline_template(&rng, "the roadmap").contains("the roadmap"));
        }
    }
}
