//! System prompt assembly for answer generation.
//!
//! The prompt is built from four parts: the fact-discipline rules, the
//! tenant's tone block, an optional multi-topic formatting block, and the
//! retrieved context.

use crate::models::{SearchResult, ToneMode};

/// Separator placed between context blocks.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

const FACT_RULES: &str = "You answer questions about the project using ONLY the context provided below.

CRITICAL RULES:
1. If the context contains ANY specific date, timeframe, number, or fact, you MUST include it.
2. Never invent dates, numbers, names, or links that are not in the context.
3. Scan the ENTIRE context for relevant facts before answering.
4. If the context says \"planned for Q2\", say \"planned for Q2\", not \"no exact date\".
5. Never say \"not in the docs\" or \"check announcements\" when the context contains the answer.
6. Only say the information is missing when you searched the context and found nothing relevant.
7. Keep it short: 1-3 sentences unless a list is clearer.";

const TONE_CASUAL: &str = "TONE:
- Casual, friendly, web3-native
- Light slang allowed (ser, fam, ngl)
- 1 emoji max
- No corporate speak
- Example: \"No exact date yet, snapshot is planned for Q2 2026.\"";

const TONE_NEUTRAL: &str = "TONE:
- Friendly but clean
- No slang or web3 lingo
- No emojis
- Approachable but clear
- Example: \"Snapshot is planned for Q2 2026, but no exact date has been announced yet.\"";

const TONE_PROFESSIONAL: &str = "TONE:
- Formal support tone
- No emojis, no slang
- Clear and precise language
- Example: \"The snapshot is scheduled for Q2 2026. An exact date has not yet been announced.\"";

const MULTI_TOPIC_FORMAT: &str = "FORMATTING (multiple topics detected):
- Break your answer into short labeled sections
- Each section: 1-2 sentences max
- Use this format:
  **Topic:**
  Short answer here.
- Keep the total response to 4-6 lines
- No long paragraphs";

pub fn tone_instructions(tone: ToneMode) -> &'static str {
    match tone {
        ToneMode::Casual => TONE_CASUAL,
        ToneMode::Neutral => TONE_NEUTRAL,
        ToneMode::Professional => TONE_PROFESSIONAL,
    }
}

/// Join ranked results into a source-tagged context string.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("[Source: {}]\n{}", r.source, r.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// The full system instruction for an accepted question.
pub fn answer_system_prompt(context: &str, tone: ToneMode, multi_topic: bool) -> String {
    let mut prompt = String::with_capacity(FACT_RULES.len() + context.len() + 512);
    prompt.push_str(FACT_RULES);
    prompt.push_str("\n\n");
    prompt.push_str(tone_instructions(tone));
    if multi_topic {
        prompt.push_str("\n\n");
        prompt.push_str(MULTI_TOPIC_FORMAT);
    }
    prompt.push_str("\n\nContext from docs:\n");
    prompt.push_str(context);
    prompt
}

/// Instruction for phrasing a short "don't know" about `topic`.
pub fn decline_system_prompt(topic: &str, tone: ToneMode) -> String {
    format!(
        "The user asked about {topic}, but the project documentation does not cover it well enough to answer.

Write ONE short sentence that:
- says you are not sure about {topic}
- suggests asking the team or checking official channels
- does not guess, invent facts, or mention these instructions

{tone}",
        topic = topic,
        tone = tone_instructions(tone),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str, source: &str) -> SearchResult {
        SearchResult {
            text: text.to_string(),
            source: source.to_string(),
            similarity: 0.9,
        }
    }

    #[test]
    fn test_context_tags_sources_in_order() {
        let ctx = build_context(&[result("Stake minimum is 100 tokens", "faq"), result("APY is 10%", "guide")]);
        assert_eq!(
            ctx,
            "[Source: faq]\nStake minimum is 100 tokens\n\n---\n\n[Source: guide]\nAPY is 10%"
        );
    }

    #[test]
    fn test_prompt_includes_tone_and_context() {
        let p = answer_system_prompt("[Source: faq]\nfact", ToneMode::Professional, false);
        assert!(p.contains("Formal support tone"));
        assert!(p.contains("[Source: faq]\nfact"));
        assert!(p.contains("Never invent dates"));
        assert!(!p.contains("FORMATTING"));
    }

    #[test]
    fn test_prompt_multi_topic_block() {
        let p = answer_system_prompt("ctx", ToneMode::Casual, true);
        assert!(p.contains("FORMATTING (multiple topics detected)"));
        assert!(p.contains("web3-native"));
    }

    #[test]
    fn test_each_tone_is_distinct() {
        let blocks: Vec<&str> = ToneMode::ALL.iter().map(|t| tone_instructions(*t)).collect();
        assert_ne!(blocks[0], blocks[1]);
        assert_ne!(blocks[1], blocks[2]);
        assert!(blocks.iter().all(|b| b.contains("Example:")));
    }

    #[test]
    fn test_decline_prompt_mentions_topic() {
        let p = decline_system_prompt("the airdrop", ToneMode::Neutral);
        assert!(p.contains("about the airdrop"));
        assert!(p.contains("No emojis"));
    }
}
