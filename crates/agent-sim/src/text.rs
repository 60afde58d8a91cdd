//! Text Signals
//!
//! Lightweight lexical analysis of posts and replies: sentiment, key terms,
//! tags, emotion cues and interaction classification.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());
static RE_HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());

/// Word lists driving the lexical signals.
pub mod lexicon {
    pub const POSITIVE_WORDS: &[&str] = &[
        "good", "great", "awesome", "love", "happy", "excited", "lol", "nice",
    ];
    pub const NEGATIVE_WORDS: &[&str] = &[
        "bad", "hate", "angry", "frustrated", "broken", "failed", "wrong",
    ];
    pub const STOPWORDS: &[&str] = &["the", "is", "at", "which", "on", "a", "an", "and", "or", "but"];
    pub const TECH_TERMS: &[&str] = &[
        "python", "javascript", "bug", "feature", "deploy", "test", "api", "database",
    ];
    pub const TECH_KEYWORDS: &[&str] = &[
        "docker", "kubernetes", "react", "python", "javascript", "api", "database", "deployment",
        "production", "bug",
    ];
    /// Tags attached to a stored memory are capped at this many
    pub const MAX_TAGS: usize = 10;
}

/// Lowercased word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    RE_WORD
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Lexicon sentiment in [-1, 1]; 0.0 when no sentiment words appear.
pub fn sentiment(text: &str) -> f32 {
    let lowered = text.to_lowercase();
    let positive = lexicon::POSITIVE_WORDS
        .iter()
        .filter(|w| lowered.contains(*w))
        .count() as f32;
    let negative = lexicon::NEGATIVE_WORDS
        .iter()
        .filter(|w| lowered.contains(*w))
        .count() as f32;
    if positive + negative == 0.0 {
        return 0.0;
    }
    (positive - negative) / (positive + negative)
}

/// Significant terms ordered by descending frequency, ties broken by first
/// appearance.
pub fn key_terms(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in tokenize(text).into_iter().enumerate() {
        if word.chars().count() <= 3 || lexicon::STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }
    let mut terms: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    terms.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    terms.into_iter().map(|(word, _)| word).collect()
}

pub fn hashtags(text: &str) -> Vec<String> {
    RE_HASHTAG
        .captures_iter(text)
        .map(|c| c[1].to_lowercase())
        .collect()
}

/// Hashtags plus recognised technical terms, capped.
pub fn extract_tags(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    let mut tags: Vec<String> = hashtags(text);
    tags.extend(
        lexicon::TECH_TERMS
            .iter()
            .filter(|t| lowered.contains(*t))
            .map(|t| t.to_string()),
    );
    let mut unique = BTreeSet::new();
    for tag in tags {
        if unique.len() >= lexicon::MAX_TAGS {
            break;
        }
        unique.insert(tag);
    }
    unique
}

/// Technical vocabulary mentioned in the text.
pub fn tech_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lexicon::TECH_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

/// Emotional cues a reader would pick up.
pub fn emotion_tags(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    let mut tags = Vec::new();
    if lowered.contains("error") || lowered.contains("broken") {
        tags.extend(["debugging", "confusion"]);
    }
    if lowered.contains("finally") || lowered.contains("works") {
        tags.extend(["success", "relief"]);
    }
    if text.contains('?') {
        tags.push("question");
    }
    if text.matches('!').count() > 2 {
        tags.push("excitement");
    }
    tags
}

/// Interaction types recognised by the drift tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionClass {
    Debate,
    Joke,
    Collaboration,
    General,
}

impl InteractionClass {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionClass::Debate => "debate",
            InteractionClass::Joke => "joke",
            InteractionClass::Collaboration => "collaboration",
            InteractionClass::General => "general",
        }
    }

    /// Intensity fed to the drift engine for this class.
    pub fn intensity(self) -> f32 {
        match self {
            InteractionClass::Debate => 0.7,
            InteractionClass::Joke => 0.5,
            InteractionClass::Collaboration => 0.6,
            InteractionClass::General => 0.3,
        }
    }
}

pub fn classify_interaction(text: &str) -> InteractionClass {
    let lowered = text.to_lowercase();
    if lowered.contains("debate") || lowered.contains("argue") {
        InteractionClass::Debate
    } else if lowered.contains("lol") || lowered.contains("haha") {
        InteractionClass::Joke
    } else if lowered.contains("help") || lowered.contains("thanks") {
        InteractionClass::Collaboration
    } else {
        InteractionClass::General
    }
}

/// Words longer than five characters, used to look up incidents by name.
pub fn incident_search_terms(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| w.chars().count() > 5)
        .collect()
}

/// Known agents named in the text, excluding `speaker`.
pub fn mentioned_agents<'a>(text: &str, known: &'a [String], speaker: &str) -> Vec<&'a String> {
    let lowered = text.to_lowercase();
    known
        .iter()
        .filter(|id| id.as_str() != speaker && lowered.contains(&id.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_balance() {
        assert_eq!(sentiment("nothing to see"), 0.0);
        assert_eq!(sentiment("great work, love it"), 1.0);
        assert_eq!(sentiment("the build is broken and I hate it"), -1.0);
        assert_eq!(sentiment("good idea but the test failed"), 0.0);
    }

    #[test]
    fn test_key_terms_filter_and_rank() {
        let terms = key_terms("The database migration broke the database index, and the index");
        assert_eq!(terms[0], "database");
        assert_eq!(terms[1], "index");
        assert!(!terms.iter().any(|t| t == "the" || t == "and"));
    }

    #[test]
    fn test_tags_include_hashtags_and_tech_terms() {
        let tags = extract_tags("Fixed the api bug #Friday #release");
        assert!(tags.contains("friday"));
        assert!(tags.contains("release"));
        assert!(tags.contains("api"));
        assert!(tags.contains("bug"));
    }

    #[test]
    fn test_classify_interaction_priority() {
        assert_eq!(classify_interaction("lol let's debate this"), InteractionClass::Debate);
        assert_eq!(classify_interaction("haha nice"), InteractionClass::Joke);
        assert_eq!(classify_interaction("thanks for the fix"), InteractionClass::Collaboration);
        assert_eq!(classify_interaction("ship it"), InteractionClass::General);
    }

    #[test]
    fn test_emotion_tags() {
        let tags = emotion_tags("It finally works!!! But why?");
        assert!(tags.contains(&"success"));
        assert!(tags.contains(&"excitement"));
        assert!(tags.contains(&"question"));
    }

    #[test]
    fn test_mentioned_agents_skips_speaker() {
        let known = vec!["meme_lord".to_string(), "byte_wizard".to_string()];
        let found = mentioned_agents("meme_lord and byte_wizard again", &known, "byte_wizard");
        assert_eq!(found, vec![&known[0]]);
    }
}
