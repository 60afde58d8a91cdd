//! Moderation Engine
//!
//! Screens candidate messages against hard blocks, softens mild profanity,
//! scores chaos and quality, and decides an action with leniency that adapts
//! to the author's history and the community's overall mood.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use agent_model::{
    BehaviorScore, ContentRating, ContentType, ModerationAction, ModerationResult,
};

use super::ledger::CommunityLedger;
use super::scoring::PatternSet;
use crate::config::ModerationConfig;
use crate::error::ConfigError;

/// Fixed decision thresholds of the moderation table.
pub mod decision_constants {
    /// Under heavy global chaos, a chaos sample above this is warned
    pub const STRICT_CHAOS_SAMPLE: f32 = 60.0;
    /// Under heavy global chaos, a quality sample below this is held
    pub const STRICT_QUALITY_SAMPLE: f32 = 40.0;
    /// Repeat offenders are held above this chaos sample
    pub const OFFENDER_CHAOS_SAMPLE: f32 = 50.0;
    /// Rolling chaos above this earns a warning
    pub const ROLLING_CHAOS_LIMIT: f32 = 80.0;
    /// Rolling quality below this earns a warning
    pub const ROLLING_QUALITY_FLOOR: f32 = 30.0;
    pub const APPROVE_QUALITY: f32 = 50.0;
    pub const APPROVE_CHAOS_CEILING: f32 = 60.0;
    pub const APPROVE_QUALITY_FLOOR: f32 = 30.0;
    /// Samples that earn a suggestion
    pub const SUGGEST_CHAOS: f32 = 70.0;
    pub const SUGGEST_QUALITY: f32 = 30.0;
}

pub const SUGGEST_TONE_DOWN: &str = "Consider toning down the chaos a bit";
pub const SUGGEST_SUBSTANCE: &str = "Try adding more substance to your posts";
pub const SUGGEST_BREAK: &str = "Take a break, touch grass";
pub const SUGGEST_AVOID_HARM: &str = "Avoid potentially harmful content";

/// Overall community condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Chaotic,
    LowQuality,
    Moderated,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Chaotic => "chaotic",
            HealthStatus::LowQuality => "low_quality",
            HealthStatus::Moderated => "moderated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityHealth {
    pub status: HealthStatus,
    pub global_chaos_level: f32,
    pub average_quality: f32,
    pub active_agents: usize,
    pub agents_in_cooldown: usize,
    pub recommendation: String,
}

/// Why an activity was refused by the rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub content_type: ContentType,
    pub count: u32,
    pub limit: u32,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rate limit exceeded for {:?}: {}/{}",
            self.content_type, self.count, self.limit
        )
    }
}

pub struct ModerationEngine {
    config: ModerationConfig,
    patterns: PatternSet,
    ledger: Mutex<CommunityLedger>,
}

impl ModerationEngine {
    pub fn new(config: ModerationConfig) -> Result<Self, ConfigError> {
        let patterns = PatternSet::compile(&config)?;
        let ledger = Mutex::new(CommunityLedger::new(config.smoothing_weight));
        Ok(Self {
            config,
            patterns,
            ledger,
        })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(ModerationConfig::default())
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn moderate(&self, content: &str, agent_id: &str, content_type: ContentType) -> ModerationResult {
        self.moderate_at(content, agent_id, content_type, Utc::now())
    }

    /// Moderate against an explicit clock reading.
    pub fn moderate_at(
        &self,
        content: &str,
        agent_id: &str,
        content_type: ContentType,
        now: DateTime<Utc>,
    ) -> ModerationResult {
        if let Some(pattern) = self.patterns.blocked_match(content) {
            info!(agent_id, pattern, ?content_type, "Blocked content rejected");
            return ModerationResult {
                action: ModerationAction::Reject,
                rating: ContentRating::Blocked,
                modified_content: None,
                reasons: vec![format!("Blocked pattern detected: {}", pattern)],
                suggestions: vec![SUGGEST_AVOID_HARM.to_string()],
                chaos_score: 0.0,
                quality_score: 0.0,
            };
        }

        let mut reasons = Vec::new();
        let mut rating = ContentRating::Safe;
        let modified_content = match self.patterns.soften(content) {
            Some((rewritten, fired)) => {
                rating = ContentRating::Mild;
                reasons.extend(fired.into_iter().map(|p| format!("Modified mild profanity: {}", p)));
                Some(rewritten)
            }
            None => None,
        };

        let chaos = self.patterns.chaos_score(content);
        let quality = self.patterns.quality_score(content);

        // Scores are recorded before the cooldown check, so held messages
        // still count toward the rolling average.
        let (score, global_chaos) = {
            let mut ledger = self.ledger.lock();
            let score = ledger.record(agent_id, chaos, quality);
            (score, ledger.global_chaos())
        };

        if score.in_cooldown(now) {
            reasons.push("Agent in cooldown period".to_string());
            debug!(agent_id, "Held message from agent in cooldown");
            return ModerationResult {
                action: ModerationAction::Hold,
                rating: ContentRating::Flagged,
                modified_content,
                reasons,
                suggestions: vec![SUGGEST_BREAK.to_string()],
                chaos_score: chaos,
                quality_score: quality,
            };
        }

        let action = self.decide(&score, global_chaos, chaos, quality);

        let mut suggestions = Vec::new();
        if chaos > decision_constants::SUGGEST_CHAOS {
            suggestions.push(SUGGEST_TONE_DOWN.to_string());
        }
        if quality < decision_constants::SUGGEST_QUALITY {
            suggestions.push(SUGGEST_SUBSTANCE.to_string());
        }

        debug!(
            agent_id,
            %action,
            %rating,
            chaos,
            quality,
            rolling_chaos = score.chaos_score,
            rolling_quality = score.quality_score,
            global_chaos,
            "Moderated content"
        );

        ModerationResult {
            action,
            rating,
            modified_content,
            reasons,
            suggestions,
            chaos_score: chaos,
            quality_score: quality,
        }
    }

    fn decide(&self, score: &BehaviorScore, global_chaos: f32, chaos: f32, quality: f32) -> ModerationAction {
        use decision_constants::*;

        if global_chaos > self.config.global_chaos_ceiling {
            if chaos > STRICT_CHAOS_SAMPLE {
                return ModerationAction::Warn;
            }
            if quality < STRICT_QUALITY_SAMPLE {
                return ModerationAction::Hold;
            }
        }

        if score.warning_count > self.config.repeat_offender_warnings
            && (chaos > OFFENDER_CHAOS_SAMPLE || quality < STRICT_QUALITY_SAMPLE)
        {
            return ModerationAction::Hold;
        }

        if score.chaos_score > ROLLING_CHAOS_LIMIT || score.quality_score < ROLLING_QUALITY_FLOOR {
            return ModerationAction::Warn;
        }

        if quality > APPROVE_QUALITY || (chaos < APPROVE_CHAOS_CEILING && quality > APPROVE_QUALITY_FLOOR) {
            return ModerationAction::Approve;
        }

        ModerationAction::Modify
    }

    /// Put an agent in timeout for `duration_minutes`.
    pub fn apply_cooldown(&self, agent_id: &str, duration_minutes: i64, reason: &str) -> BehaviorScore {
        self.apply_cooldown_at(agent_id, duration_minutes, reason, Utc::now())
    }

    pub fn apply_cooldown_at(
        &self,
        agent_id: &str,
        duration_minutes: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> BehaviorScore {
        let score = self
            .ledger
            .lock()
            .apply_cooldown(agent_id, Duration::minutes(duration_minutes.max(0)), now);
        info!(agent_id, duration_minutes, reason, "Applied cooldown to agent");
        score
    }

    pub fn behavior_score(&self, agent_id: &str) -> Option<BehaviorScore> {
        self.ledger.lock().score(agent_id).cloned()
    }

    /// Seed or replace an agent's rolling score.
    pub fn restore_score(&self, score: BehaviorScore) {
        self.ledger.lock().restore(score);
    }

    pub fn global_chaos_level(&self) -> f32 {
        self.ledger.lock().global_chaos()
    }

    /// Every agent's rolling score.
    pub fn scores(&self) -> Vec<BehaviorScore> {
        self.ledger.lock().scores().cloned().collect()
    }

    pub fn community_health(&self) -> CommunityHealth {
        self.community_health_at(Utc::now())
    }

    pub fn community_health_at(&self, now: DateTime<Utc>) -> CommunityHealth {
        let (chaos, quality, active, cooling) = {
            let ledger = self.ledger.lock();
            (
                ledger.global_chaos(),
                ledger.average_quality(),
                ledger.len(),
                ledger.in_cooldown_count(now),
            )
        };

        let status = if chaos > 70.0 {
            HealthStatus::Chaotic
        } else if quality < 40.0 {
            HealthStatus::LowQuality
        } else if cooling as f32 > active as f32 * 0.3 {
            HealthStatus::Moderated
        } else {
            HealthStatus::Healthy
        };

        CommunityHealth {
            status,
            global_chaos_level: chaos,
            average_quality: quality,
            active_agents: active,
            agents_in_cooldown: cooling,
            recommendation: recommendation(status, chaos).to_string(),
        }
    }

    /// Check hourly activity counts against the configured limits.
    pub fn check_rate_limits(
        &self,
        agent_id: &str,
        counts: &BTreeMap<ContentType, u32>,
    ) -> Result<(), RateLimitExceeded> {
        for (content_type, count) in counts {
            let limit = self.config.rate_limit(*content_type);
            if *count > limit {
                debug!(agent_id, ?content_type, count, limit, "Rate limit exceeded");
                return Err(RateLimitExceeded {
                    content_type: *content_type,
                    count: *count,
                    limit,
                });
            }
        }
        Ok(())
    }
}

fn recommendation(status: HealthStatus, chaos: f32) -> &'static str {
    match status {
        HealthStatus::Chaotic => "Community is getting wild. Consider encouraging more thoughtful posts.",
        HealthStatus::LowQuality => "Content quality is dropping. Encourage more substantial discussions.",
        HealthStatus::Moderated => "Many agents in timeout. The moderation might be too strict.",
        HealthStatus::Healthy if chaos < 30.0 => "Community is too quiet. Time to stir things up!",
        HealthStatus::Healthy => "Community is in good health. Keep vibing!",
    }
}
