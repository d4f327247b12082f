//! Question normalization, word-set similarity, and intent detection.
//!
//! Duplicate detection compares questions as sets of normalized words
//! (Jaccard similarity). Intent detection maps questions onto a small fixed
//! vocabulary of community-support topics; it drives topic-aware replies
//! and the multi-topic answer format.

use std::collections::HashSet;

/// Single words dropped during normalization.
const FILLER_WORDS: [&str; 9] = ["please", "pls", "hey", "hi", "hello", "yo", "the", "a", "an"];

/// Two-word filler phrases dropped during normalization.
const FILLER_PHRASES: [(&str, &str); 2] = [("can", "you"), ("could", "you")];

/// Intent name → keywords. Keywords match at the start of a word, so
/// `wallet` also matches `wallets`. Order decides the primary intent.
pub const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("airdrop", &["airdrop", "drop", "free tokens", "claim"]),
    ("snapshot", &["snapshot", "snap"]),
    ("tge", &["tge", "token generation", "token launch"]),
    ("listing", &["listing", "listed", "exchange", "cex", "dex"]),
    ("staking", &["stake", "staking", "apy", "yield"]),
    ("tokenomics", &["tokenomics", "supply", "allocation", "vesting"]),
    ("roadmap", &["roadmap", "timeline", "when", "wen", "date"]),
    ("wallet", &["wallet", "connect", "metamask", "phantom"]),
    ("price", &["price", "cost", "how much"]),
    ("eligibility", &["eligible", "eligibility", "qualify", "criteria"]),
];

/// Words skipped when guessing a topic for questions with no known intent.
const TOPIC_STOP_WORDS: [&str; 18] = [
    "what", "when", "where", "how", "why", "is", "are", "the", "a", "an", "do", "does", "can",
    "will", "wen", "ser", "pls", "please",
];

/// Lowercase, strip punctuation, collapse whitespace, and drop filler words.
pub fn normalize_question(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    let mut kept = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if i + 1 < words.len()
            && FILLER_PHRASES
                .iter()
                .any(|(a, b)| words[i] == *a && words[i + 1] == *b)
        {
            i += 2;
            continue;
        }
        if !FILLER_WORDS.contains(&words[i]) {
            kept.push(words[i]);
        }
        i += 1;
    }

    kept.join(" ")
}

/// Jaccard similarity of the normalized word sets of two questions.
///
/// Returns `0.0` when either side normalizes to nothing.
pub fn question_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_question(a);
    let nb = normalize_question(b);
    let words_a: HashSet<&str> = na.split_whitespace().collect();
    let words_b: HashSet<&str> = nb.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

/// Lowercased text padded with spaces, punctuation turned into spaces.
fn searchable(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", spaced.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn mentions(haystack: &str, keyword: &str) -> bool {
    haystack.contains(&format!(" {}", keyword))
}

/// The first intent whose keywords appear in the question.
pub fn extract_intent(text: &str) -> Option<&'static str> {
    let haystack = searchable(text);
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| mentions(&haystack, k)))
        .map(|(intent, _)| *intent)
}

/// Every intent the question touches, in vocabulary order.
pub fn extract_intents(text: &str) -> Vec<&'static str> {
    let haystack = searchable(text);
    INTENT_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| mentions(&haystack, k)))
        .map(|(intent, _)| *intent)
        .collect()
}

/// True when the question covers two or more distinct intents.
pub fn is_multi_topic(text: &str) -> bool {
    extract_intents(text).len() >= 2
}

fn topic_name(intent: &str) -> &str {
    match intent {
        "airdrop" => "the airdrop",
        "snapshot" => "the snapshot",
        "tge" => "TGE",
        "listing" => "listings",
        "tokenomics" => "tokenomics",
        "roadmap" => "the roadmap",
        "wallet" => "wallet stuff",
        other => other,
    }
}

/// A short human-readable topic for contextual replies.
///
/// Known intents map to a display name; otherwise the first two content
/// words longer than two characters are used, falling back to `"that"`.
pub fn extract_topic(text: &str) -> String {
    if let Some(intent) = extract_intent(text) {
        return topic_name(intent).to_string();
    }

    let lower = text.to_lowercase();
    let topic_words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2 && !TOPIC_STOP_WORDS.contains(w))
        .take(2)
        .collect();

    if topic_words.is_empty() {
        "that".to_string()
    } else {
        topic_words.join(" ")
    }
}
