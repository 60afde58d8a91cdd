//! Moderation Types
//!
//! Actions, ratings and rolling behavior scores shared between the moderation
//! engine and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with a candidate message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationAction {
    Approve,
    Modify,
    Warn,
    Hold,
    Reject,
}

impl ModerationAction {
    /// Whether the message may be published (possibly rewritten).
    pub fn is_publishable(self) -> bool {
        matches!(
            self,
            ModerationAction::Approve | ModerationAction::Modify | ModerationAction::Warn
        )
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModerationAction::Approve => "APPROVE",
            ModerationAction::Modify => "MODIFY",
            ModerationAction::Warn => "WARN",
            ModerationAction::Hold => "HOLD",
            ModerationAction::Reject => "REJECT",
        };
        f.write_str(s)
    }
}

/// Severity of a message's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRating {
    Safe,
    Mild,
    Moderate,
    Flagged,
    Blocked,
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentRating::Safe => "SAFE",
            ContentRating::Mild => "MILD",
            ContentRating::Moderate => "MODERATE",
            ContentRating::Flagged => "FLAGGED",
            ContentRating::Blocked => "BLOCKED",
        };
        f.write_str(s)
    }
}

/// Kind of activity being moderated; also keys the hourly rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Comment,
    Meme,
    Reaction,
}

/// Outcome of moderating one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub action: ModerationAction,
    pub rating: ContentRating,
    /// Present only when the message was rewritten
    pub modified_content: Option<String>,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
    /// Chaos sample of this message, 0-100
    pub chaos_score: f32,
    /// Quality sample of this message, 0-100
    pub quality_score: f32,
}

impl ModerationResult {
    /// The text to publish: the rewrite if any, otherwise the original.
    pub fn publishable_text<'a>(&'a self, original: &'a str) -> &'a str {
        self.modified_content.as_deref().unwrap_or(original)
    }
}

/// Rolling per-agent behavior score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorScore {
    pub agent_id: String,
    pub chaos_score: f32,
    pub quality_score: f32,
    pub warning_count: u32,
    pub last_warning: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl BehaviorScore {
    /// Fresh agents start neutral at 50/50.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            chaos_score: 50.0,
            quality_score: 50.0,
            warning_count: 0,
            last_warning: None,
            cooldown_until: None,
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map(|until| now < until).unwrap_or(false)
    }
}
