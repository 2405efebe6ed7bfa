use tracing::{error, info};

use crate::llm::LlmProvider;
use reelreply_core::text::strip_wrapping_quotes;

/// Substrings counted towards the funny score.
pub const FUNNY_MARKERS: [&str; 6] = ["haha", "lol", "funny", "lmao", "😂", "🤣"];
/// Presence of this emoji alone classifies a sample as funny.
pub const LAUGH_EMOJI: &str = "😂";
pub const FALLBACK_REPLY: &str = "Nice reel!";

const FUNNY_THRESHOLD: usize = 2;

const STYLE_EXAMPLES: [&str; 3] = [
    "Thanks for the love, everyone! Guess my reel’s so good, it’s even appealing to the chronically single AND those terrified of sentient porcelain. 😂❤️",
    "Wow, the range of reactions! From “single and loving it” to “send help, the dolls are alive!” Thanks for the ❤️s and 😂s, you guys are wild.",
    "My reel: a rollercoaster of emotions! Thanks for the laughs, loves, and existential dread over creepy dolls. 😂❤️",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDecision {
    Suppressed,
    Reply(String),
}

/// Total non-overlapping marker occurrences in the lower-cased, space-joined
/// sample.
pub fn funny_score(comments: &[String]) -> usize {
    let text = comments.join(" ").to_lowercase();
    FUNNY_MARKERS
        .iter()
        .map(|marker| text.matches(marker).count())
        .sum()
}

pub fn is_funny(comments: &[String]) -> bool {
    funny_score(comments) > FUNNY_THRESHOLD
        || comments.iter().any(|c| c.contains(LAUGH_EMOJI))
}

pub fn build_prompt(comments: &[String]) -> String {
    let examples = STYLE_EXAMPLES
        .iter()
        .map(|e| format!("'{e}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Generate a reply for a funny Instagram reel based on these comments: {comments:?}. \
         Use a playfully teasing or self-deprecating tone. Mention laughs and emojis like 😂. \
         Keep it concise and engaging, similar to these examples: {examples}"
    )
}

/// Clean up raw model output: trim, fall back when empty, unwrap quotes.
pub fn finalize_reply(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FALLBACK_REPLY.to_string();
    }
    strip_wrapping_quotes(trimmed).to_string()
}

/// Classify `comments` and, when funny, draft a reply with `llm`.
///
/// Non-funny samples never reach the model. Generation failures are logged
/// and suppress the reply.
pub async fn decide(llm: &dyn LlmProvider, comments: &[String]) -> ReplyDecision {
    if !is_funny(comments) {
        info!(
            "Comments not funny enough (score {}), skipping reply",
            funny_score(comments)
        );
        return ReplyDecision::Suppressed;
    }

    match llm.send_message(&build_prompt(comments)).await {
        Ok(raw) => ReplyDecision::Reply(finalize_reply(&raw)),
        Err(e) => {
            error!("Error generating reply: {e}");
            ReplyDecision::Suppressed
        }
    }
}
