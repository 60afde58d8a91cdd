//! Pattern tables and per-message chaos / quality scoring.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::config::ModerationConfig;
use crate::error::ConfigError;

static RE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"def\s+\w+|function\s+\w+|class\s+\w+").unwrap());

/// Scoring constants not exposed through configuration.
pub mod score_constants {
    /// Uppercase share above which shouting adds chaos
    pub const CAPS_RATIO_THRESHOLD: f32 = 0.3;
    pub const CAPS_WEIGHT: f32 = 30.0;
    /// `!` and `?` beyond this count add chaos
    pub const PUNCTUATION_THRESHOLD: usize = 5;
    pub const PUNCTUATION_CAP: f32 = 30.0;
    /// Emoticons beyond this count add chaos
    pub const EMOTICON_THRESHOLD: usize = 3;
    pub const EMOTICON_CAP: f32 = 20.0;
    pub const PER_SYMBOL: f32 = 5.0;
    pub const QUALITY_BASE: f32 = 50.0;
    pub const CODE_BONUS: f32 = 20.0;
    pub const LOW_EFFORT_PENALTY: f32 = 30.0;
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// Compiled, case-insensitive pattern tables.
#[derive(Debug, Clone)]
pub struct PatternSet {
    blocked: Vec<Regex>,
    substitutions: Vec<(Regex, String)>,
    chaos: Vec<Regex>,
    quality: Vec<Regex>,
    low_effort: Vec<String>,
    emoticons: Vec<String>,
    chaos_weight: f32,
    quality_weight: f32,
}

impl PatternSet {
    pub fn compile(config: &ModerationConfig) -> Result<Self, ConfigError> {
        let substitutions = config
            .substitutions
            .iter()
            .map(|s| Ok((compile(&s.pattern)?, s.replacement.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            blocked: compile_all(&config.blocked_patterns)?,
            substitutions,
            chaos: compile_all(&config.chaos_patterns)?,
            quality: compile_all(&config.quality_patterns)?,
            low_effort: config.low_effort_replies.iter().map(|s| s.to_lowercase()).collect(),
            emoticons: config.emoticons.clone(),
            chaos_weight: config.chaos_pattern_weight,
            quality_weight: config.quality_pattern_weight,
        })
    }

    /// The first hard-blocked pattern the content matches.
    pub fn blocked_match(&self, content: &str) -> Option<&str> {
        self.blocked
            .iter()
            .find(|re| re.is_match(content))
            .map(|re| re.as_str())
    }

    /// Rewrite mild profanity. Returns the rewritten text and the patterns
    /// that fired, or `None` when nothing matched.
    pub fn soften(&self, content: &str) -> Option<(String, Vec<String>)> {
        let mut text = content.to_string();
        let mut fired = Vec::new();
        for (re, replacement) in &self.substitutions {
            if re.is_match(&text) {
                text = re.replace_all(&text, replacement.as_str()).into_owned();
                fired.push(re.as_str().to_string());
            }
        }
        (!fired.is_empty()).then_some((text, fired))
    }

    /// Chaos sample in [0, 100].
    pub fn chaos_score(&self, content: &str) -> f32 {
        use score_constants::*;

        let mut score = self.chaos.iter().filter(|re| re.is_match(content)).count() as f32
            * self.chaos_weight;

        let total = content.chars().count().max(1) as f32;
        let caps = content.chars().filter(|c| c.is_uppercase()).count() as f32;
        let caps_ratio = caps / total;
        if caps_ratio > CAPS_RATIO_THRESHOLD {
            score += caps_ratio * CAPS_WEIGHT;
        }

        let punctuation = content.chars().filter(|c| matches!(c, '!' | '?')).count();
        if punctuation > PUNCTUATION_THRESHOLD {
            score += (punctuation as f32 * PER_SYMBOL).min(PUNCTUATION_CAP);
        }

        let emoticons: usize = self.emoticons.iter().map(|e| content.matches(e.as_str()).count()).sum();
        if emoticons > EMOTICON_THRESHOLD {
            score += (emoticons as f32 * PER_SYMBOL).min(EMOTICON_CAP);
        }

        score.min(100.0)
    }

    /// Quality sample in [0, 100].
    pub fn quality_score(&self, content: &str) -> f32 {
        use score_constants::*;

        let mut score = QUALITY_BASE
            + self.quality.iter().filter(|re| re.is_match(content)).count() as f32
                * self.quality_weight;

        let words = content.split_whitespace().count();
        if words > 10 && words < 100 {
            score += 10.0;
        } else if words > 200 {
            score += 5.0;
        } else if words < 5 {
            score -= 20.0;
        }

        if content.contains("```") || RE_CODE.is_match(content) {
            score += CODE_BONUS;
        }

        let trimmed = content.trim().to_lowercase();
        if self.low_effort.iter().any(|l| *l == trimmed) {
            score -= LOW_EFFORT_PENALTY;
        }

        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> PatternSet {
        PatternSet::compile(&ModerationConfig::default()).unwrap()
    }

    #[test]
    fn test_blocked_patterns() {
        let p = patterns();
        assert!(p.blocked_match("rm -rf / please").is_some());
        assert!(p.blocked_match("just FORMAT C: and start over").is_some());
        assert!(p.blocked_match("hey @everyone look").is_some());
        assert!(p.blocked_match("how to hack into the mainframe").is_some());
        assert!(p.blocked_match("rm -rf ./build is fine").is_none());
        assert!(p.blocked_match("the exploitation of labor").is_none());
    }

    #[test]
    fn test_soften_rewrites_case_insensitively() {
        let p = patterns();
        let (text, fired) = p.soften("WTF is this damn build").unwrap();
        assert_eq!(text, "what the fork is this dang build");
        assert_eq!(fired.len(), 2);
        assert!(p.soften("hello there").is_none());
        assert!(p.soften("shell scripts").is_none());
    }

    #[test]
    fn test_soften_catches_inflected_forms() {
        let p = patterns();
        let (text, _) = p.soften("this fucking build and its Fucked cache").unwrap();
        assert_eq!(text, "this fricking build and its fricked cache");
        assert!(p.soften("snafu check").is_none());
    }

    #[test]
    fn test_chaos_components() {
        let p = patterns();
        assert_eq!(p.chaos_score("a calm note"), 0.0);
        assert_eq!(p.chaos_score("works on my machine"), 20.0);
        // 6 marks -> 30, capped at 30
        assert_eq!(p.chaos_score("why!!! ok???"), 30.0);
        // 4 emoticons -> 20
        assert_eq!(p.chaos_score("ok :) :) :) :)"), 20.0);
        assert!(p.chaos_score("YOLO TO PROD") > 40.0);
    }

    #[test]
    fn test_chaos_is_capped() {
        let p = patterns();
        let text = "YOLO PROD FRIDAY DEPLOY TEST PRODUCTION WHO NEEDS TESTS WORKS ON MY MACHINE!!!!!! :D :D :D :D";
        assert_eq!(p.chaos_score(text), 100.0);
    }

    #[test]
    fn test_quality_components() {
        let p = patterns();
        assert_eq!(p.quality_score("lol"), 0.0);
        assert_eq!(p.quality_score("ok sure"), 30.0);
        let thoughtful = "Good point, I learned something from this thread about connection pooling in the database layer";
        assert_eq!(p.quality_score(thoughtful), 90.0);
        assert_eq!(p.quality_score("see ```fn main() {}``` here now please"), 70.0);
    }
}
