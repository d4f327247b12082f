//! Message triage for passive channel listening.
//!
//! Decides whether a chat message deserves an answer at all: greetings,
//! reactions, and emoji-only messages are ignored; anything that looks like
//! a question is answered.

/// Messages ignored when they are the whole message (case-insensitive).
const IGNORE_PATTERNS: &[&str] = &[
    "gm", "gn", "good morning", "good night", "wagmi", "ngmi", "lfg", "lol", "lmao", "haha",
    "hahaha", "kek", "lmfao", "nice", "cool", "wow", "dope", "based", "sick", "thanks",
    "thank you", "thx", "ty", "tysm", "appreciated", "ok", "okay", "k", "kk", "got it",
    "understood", "makes sense", "yep", "yup", "yeah", "yes", "no", "nope", "nah",
];

/// Prefixes that mark a reaction unless the message is also a question.
const IGNORE_PREFIXES: &[&str] = &["lol", "haha", "nice", "cool", "wow", "thanks", "ty ", "thx"];

const QUESTION_SIGNALS: &[&str] = &[
    "how do", "how can", "how to", "how does", "how is", "what is", "what are", "what does",
    "what's", "whats", "where do", "where can", "where is", "where's", "when do", "when can",
    "when is", "when does", "why do", "why does", "why is", "why's", "can i", "can you",
    "could i", "could you", "do i", "do you", "does it", "does the", "is it", "is there",
    "is the", "are there", "are the", "should i", "would it", "will it", "will the", "tell me",
    "explain", "help me", "need help", "anyone know", "does anyone", "has anyone", "wen ",
];

const QUESTION_STARTERS: &[&str] = &[
    "how", "what", "where", "when", "why", "can", "does", "is", "are", "do", "will", "should",
];

const GREETINGS: &[&str] = &["gm", "gn", "hey", "hi", "hello", "yo", "sup", "good morning", "good night"];

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F300..=0x1F5FF
            | 0x1F600..=0x1F64F
            | 0x1F680..=0x1F6FF
            | 0x1F1E0..=0x1F1FF
            | 0x1F900..=0x1F9FF
            | 0x1FA00..=0x1FAFF
            | 0x2600..=0x26FF
            | 0x2702..=0x27B0
            | 0xFE0F
            | 0x200D
    )
}

/// True when the bot should not respond to `text` at all.
pub fn should_ignore(text: &str) -> bool {
    let clean = text.trim().to_lowercase();

    if clean.chars().count() < 2 {
        return true;
    }
    if IGNORE_PATTERNS.contains(&clean.as_str()) {
        return true;
    }

    let without_emoji: String = clean.chars().filter(|c| !is_emoji(*c)).collect();
    if without_emoji.trim().chars().count() < 2 {
        return true;
    }

    IGNORE_PREFIXES.iter().any(|p| clean.starts_with(p)) && !is_question(text)
}

/// True when `text` looks like a question worth answering.
pub fn is_question(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }

    let lower = text.trim().to_lowercase();
    if QUESTION_SIGNALS.iter().any(|s| lower.contains(s)) {
        return true;
    }

    // Unpunctuated questions: long enough and opening with a question word.
    let words: Vec<&str> = lower.split_whitespace().collect();
    words.len() >= 4 && QUESTION_STARTERS.contains(&words[0])
}

/// True when `text` is just a greeting.
pub fn is_greeting(text: &str) -> bool {
    let clean = text.trim().to_lowercase();
    GREETINGS.contains(&clean.as_str())
        || GREETINGS[..5]
            .iter()
            .any(|g| clean.starts_with(&format!("{} ", g)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_reactions_and_emoji() {
        assert!(should_ignore("gm"));
        assert!(should_ignore("LFG"));
        assert!(should_ignore("🔥🔥🔥"));
        assert!(should_ignore("k"));
        assert!(should_ignore("lol that's wild"));
    }

    #[test]
    fn test_reaction_prefix_with_question_is_kept() {
        assert!(!should_ignore("thanks! how do I unstake though?"));
        assert!(!should_ignore("how do I stake?"));
    }

    #[test]
    fn test_is_question() {
        assert!(is_question("staking live?"));
        assert!(is_question("wen airdrop"));
        assert!(is_question("where can I buy"));
        assert!(is_question("does staking have a lockup period"));
        assert!(!is_question("staking looks great"));
    }

    #[test]
    fn test_is_greeting() {
        assert!(is_greeting("GM"));
        assert!(is_greeting("hey team"));
        assert!(!is_greeting("hello?? anyone know the apy"));
        assert!(!is_greeting("heya"));
    }
}
