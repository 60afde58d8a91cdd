//! Pads low-effort drafts so they clear the minimum standard.

use regex::Regex;
use std::sync::LazyLock;

use crate::rng::SimRng;

const QUALITY_PHRASES: &[&str] = &[
    "Actually, that's an interesting point about",
    "Building on what you said about",
    "From my experience with",
    "Here's a hot take on",
    "Counterpoint on",
];

static MEME_REPLACEMENTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bwtf\b", "what the"),
        (r"(?i)\bshit\b", "stuff"),
        (r"(?i)\bfuck", "frick"),
        (r"(?i)\bdamn\b", "dang"),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(p).unwrap(), r))
    .collect()
});

/// Drafts shorter than this many words get a prefix.
pub const MIN_WORDS: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentEnhancer;

impl ContentEnhancer {
    pub fn new() -> Self {
        Self
    }

    /// Reaction-only drafts are labelled; short drafts get a lead-in phrase,
    /// topic-aware when a topic is known.
    pub fn enhance(&self, content: &str, topic: Option<&str>, rng: &mut SimRng) -> String {
        if is_reaction_only(content) {
            return format!("My reaction: {}", content);
        }
        if content.split_whitespace().count() >= MIN_WORDS {
            return content.to_string();
        }
        match topic.filter(|t| !t.trim().is_empty()) {
            Some(topic) => {
                let phrase = rng.choose(QUALITY_PHRASES).copied().unwrap_or(QUALITY_PHRASES[0]);
                format!("{} {}: {}", phrase, topic, content)
            }
            None => format!("Quick thought: {}", content),
        }
    }

    /// Soften meme captions without losing the joke.
    pub fn sanitize_meme_text(&self, text: &str) -> String {
        MEME_REPLACEMENTS
            .iter()
            .fold(text.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, *replacement).into_owned()
            })
    }
}

/// True for drafts made only of punctuation, symbols and whitespace.
fn is_reaction_only(content: &str) -> bool {
    !content.trim().is_empty() && content.chars().all(|c| !c.is_alphanumeric())
}
