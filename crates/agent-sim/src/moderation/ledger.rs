//! Community Ledger
//!
//! Rolling behavior scores for every agent and the global chaos level
//! derived from them. All mutation goes through [`CommunityLedger::record`]
//! or [`CommunityLedger::apply_cooldown`] so the global level is always the
//! mean of the per-agent chaos scores.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use agent_model::BehaviorScore;

/// Starting point for rolling scores and the global chaos level.
pub const NEUTRAL_SCORE: f32 = 50.0;

#[derive(Debug, Clone)]
pub struct CommunityLedger {
    scores: BTreeMap<String, BehaviorScore>,
    global_chaos: f32,
    smoothing_weight: f32,
}

impl CommunityLedger {
    /// `smoothing_weight` is the share of the previous score kept on each
    /// update.
    pub fn new(smoothing_weight: f32) -> Self {
        Self {
            scores: BTreeMap::new(),
            global_chaos: NEUTRAL_SCORE,
            smoothing_weight: smoothing_weight.clamp(0.0, 1.0),
        }
    }

    pub fn global_chaos(&self) -> f32 {
        self.global_chaos
    }

    pub fn score(&self, agent_id: &str) -> Option<&BehaviorScore> {
        self.scores.get(agent_id)
    }

    pub fn scores(&self) -> impl Iterator<Item = &BehaviorScore> {
        self.scores.values()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Blend a new sample into the agent's rolling score and recompute the
    /// global chaos level. Returns the updated score.
    pub fn record(&mut self, agent_id: &str, chaos: f32, quality: f32) -> BehaviorScore {
        let keep = self.smoothing_weight;
        let score = self
            .scores
            .entry(agent_id.to_string())
            .or_insert_with(|| BehaviorScore::new(agent_id));
        score.chaos_score = score.chaos_score * keep + chaos * (1.0 - keep);
        score.quality_score = score.quality_score * keep + quality * (1.0 - keep);
        let updated = score.clone();
        self.recompute_global();
        updated
    }

    /// Put an agent in timeout. Counts as a warning.
    pub fn apply_cooldown(&mut self, agent_id: &str, duration: Duration, now: DateTime<Utc>) -> BehaviorScore {
        let score = self
            .scores
            .entry(agent_id.to_string())
            .or_insert_with(|| BehaviorScore::new(agent_id));
        score.cooldown_until = Some(now + duration);
        score.warning_count += 1;
        score.last_warning = Some(now);
        let updated = score.clone();
        self.recompute_global();
        updated
    }

    /// Replace an agent's score wholesale, e.g. when restoring a snapshot.
    pub fn restore(&mut self, score: BehaviorScore) {
        self.scores.insert(score.agent_id.clone(), score);
        self.recompute_global();
    }

    pub fn in_cooldown_count(&self, now: DateTime<Utc>) -> usize {
        self.scores.values().filter(|s| s.in_cooldown(now)).count()
    }

    pub fn average_quality(&self) -> f32 {
        if self.scores.is_empty() {
            return NEUTRAL_SCORE;
        }
        self.scores.values().map(|s| s.quality_score).sum::<f32>() / self.scores.len() as f32
    }

    fn recompute_global(&mut self) {
        if self.scores.is_empty() {
            self.global_chaos = NEUTRAL_SCORE;
            return;
        }
        let total: f32 = self.scores.values().map(|s| s.chaos_score).sum();
        self.global_chaos = total / self.scores.len() as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_blends_from_neutral() {
        let mut ledger = CommunityLedger::new(0.7);
        let score = ledger.record("a", 100.0, 0.0);
        assert!((score.chaos_score - 65.0).abs() < 1e-4);
        assert!((score.quality_score - 35.0).abs() < 1e-4);
    }

    #[test]
    fn test_global_chaos_is_mean_of_agents() {
        let mut ledger = CommunityLedger::new(0.7);
        assert_eq!(ledger.global_chaos(), NEUTRAL_SCORE);
        ledger.record("a", 100.0, 50.0);
        ledger.record("b", 0.0, 50.0);
        // (65 + 35) / 2
        assert!((ledger.global_chaos() - 50.0).abs() < 1e-4);
        ledger.record("a", 100.0, 50.0);
        // a: 65*0.7+30 = 75.5
        assert!((ledger.global_chaos() - 55.25).abs() < 1e-4);
    }

    #[test]
    fn test_cooldown_counts_warning() {
        let mut ledger = CommunityLedger::new(0.7);
        let now = Utc::now();
        let score = ledger.apply_cooldown("a", Duration::minutes(30), now);
        assert_eq!(score.warning_count, 1);
        assert!(score.in_cooldown(now + Duration::minutes(29)));
        assert!(!score.in_cooldown(now + Duration::minutes(30)));
        assert_eq!(ledger.in_cooldown_count(now), 1);
    }
}
