//! Personality Drift Engine
//!
//! Applies interaction, incident, relationship and time-based influences to
//! an agent's personality and persists the result.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use agent_model::{DriftInfluence, DriftKind, PersonalityState, TraitId};

use super::store::TraitStore;
use super::tables;
use crate::clock::{Clock, SystemClock};
use crate::config::DriftConfig;
use crate::error::StoreError;
use crate::rng::SharedRng;

/// Traits that receive random jitter during time drift.
const JITTER_TRAITS: [TraitId; 2] = [TraitId::HumorTendency, TraitId::AnalyticalDepth];

/// Traits whose single-step movement can flag a major shift.
const SHIFT_TRAITS: [TraitId; 3] = [TraitId::ChaosTolerance, TraitId::Aggression, TraitId::TrustLevel];

pub struct DriftEngine {
    store: TraitStore,
    config: DriftConfig,
    rng: Arc<SharedRng>,
    clock: Arc<dyn Clock>,
    agent_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DriftEngine {
    pub fn new(store: TraitStore, config: DriftConfig, rng: Arc<SharedRng>) -> Self {
        Self {
            store,
            config,
            rng,
            clock: Arc::new(SystemClock),
            agent_locks: DashMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    fn lock_for(&self, agent_id: &str) -> Arc<Mutex<()>> {
        self.agent_locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Current personality. Agents never seen before start from their
    /// baseline, or neutral defaults when no baseline is stored.
    pub fn current_state(&self, agent_id: &str) -> PersonalityState {
        self.store
            .load_state(agent_id)
            .unwrap_or_else(|| self.fresh_state(agent_id))
    }

    fn fresh_state(&self, agent_id: &str) -> PersonalityState {
        let now = self.clock.now();
        match self.store.load_baseline(agent_id) {
            Some(mut baseline) => {
                baseline.last_updated = now;
                baseline.total_interactions = 0;
                baseline.last_major_shift = None;
                baseline.drift_velocity = 0.0;
                baseline
            }
            None => PersonalityState::new(agent_id, now),
        }
    }

    /// Personality that time drift reverts toward.
    pub fn baseline(&self, agent_id: &str) -> PersonalityState {
        self.store
            .load_baseline(agent_id)
            .unwrap_or_else(|| PersonalityState::new(agent_id, self.clock.now()))
    }

    pub fn set_baseline(&self, baseline: &PersonalityState) -> Result<(), StoreError> {
        let mut baseline = baseline.clone();
        baseline.normalize();
        self.store.save_baseline(&baseline)
    }

    /// Store a baseline built from trait overrides unless one already exists.
    /// Returns whether a baseline was written.
    pub fn seed_baseline(
        &self,
        agent_id: &str,
        overrides: &BTreeMap<TraitId, f32>,
    ) -> Result<bool, StoreError> {
        if self.store.load_baseline(agent_id).is_some() {
            return Ok(false);
        }
        let mut baseline = PersonalityState::new(agent_id, self.clock.now());
        for (id, value) in overrides {
            baseline.set(*id, *value);
        }
        self.store.save_baseline(&baseline)?;
        debug!(agent_id, traits = overrides.len(), "Seeded personality baseline");
        Ok(true)
    }

    /// Discard all drift and return to the baseline.
    pub fn reset_to_baseline(&self, agent_id: &str) -> Result<PersonalityState, StoreError> {
        let lock = self.lock_for(agent_id);
        let _guard = lock.lock();

        let before = self.current_state(agent_id);
        let mut state = self.baseline(agent_id);
        state.agent_id = agent_id.to_string();
        state.last_updated = self.clock.now();
        state.total_interactions = before.total_interactions;
        state.last_major_shift = before.last_major_shift;
        state.drift_velocity = 0.0;

        self.store.save_state(&state)?;
        self.store.append_history(&state, "reset")?;
        info!(agent_id, "Personality reset to baseline");
        Ok(state)
    }

    pub fn apply_interaction(
        &self,
        agent_id: &str,
        interaction_type: &str,
        other_agent: Option<&str>,
        sentiment: f32,
        intensity: f32,
    ) -> PersonalityState {
        let sentiment = clamp_input(sentiment, -1.0, 1.0);
        let intensity = clamp_input(intensity, 0.0, 1.0);
        let influence = tables::interaction_influence(
            interaction_type,
            other_agent,
            sentiment,
            intensity,
            self.clock.now(),
        );
        self.apply_influence(agent_id, influence, true)
    }

    pub fn apply_incident(&self, agent_id: &str, incident_type: &str, impact: f32) -> PersonalityState {
        let impact = clamp_input(impact, 0.0, 1.0);
        let influence = tables::incident_influence(incident_type, impact, self.clock.now());
        let state = self.apply_influence(agent_id, influence, true);
        info!(agent_id, incident = incident_type, impact, "Applied incident influence");
        state
    }

    /// Long-lived relationships slowly shape personality. Pairs with too few
    /// interactions leave the state untouched.
    pub fn apply_relationship_influence(
        &self,
        agent_id: &str,
        other_agent: Option<&str>,
        relationship_quality: f32,
        interaction_count: u64,
    ) -> PersonalityState {
        if interaction_count <= self.config.relationship_influence_min_interactions {
            return self.current_state(agent_id);
        }
        let quality = clamp_input(relationship_quality, -1.0, 1.0);
        let avoidance = self.current_state(agent_id).conflict_avoidance;
        let influence = tables::relationship_influence(other_agent, quality, avoidance, self.clock.now());
        if influence.is_empty() {
            return self.current_state(agent_id);
        }
        self.apply_influence(agent_id, influence, false)
    }

    /// Pull every trait toward the baseline in proportion to the hours
    /// elapsed, then add a little bounded jitter.
    pub fn apply_time_drift(&self, agent_id: &str, hours_passed: f32) -> PersonalityState {
        if hours_passed.is_nan() || hours_passed <= 0.0 {
            return self.current_state(agent_id);
        }
        let lock = self.lock_for(agent_id);
        let _guard = lock.lock();

        let now = self.clock.now();
        let before = self.current_state(agent_id);
        let baseline = self.baseline(agent_id);
        let rate = (self.config.reversion_rate * hours_passed).clamp(0.0, 1.0);
        let sigma = self.config.jitter_per_hour * hours_passed;

        let mut after = before.clone();
        for id in TraitId::ALL {
            let current = after.get(id);
            after.set(id, current + (baseline.get(id) - current) * rate);
        }
        self.rng.with(|rng| {
            for id in JITTER_TRAITS {
                after.adjust(id, rng.gaussian(sigma));
            }
        });

        let mut influence = DriftInfluence::new(DriftKind::TimeDecay, "time", hours_passed, now);
        for id in TraitId::ALL {
            let change = after.get(id) - before.get(id);
            if change != 0.0 {
                influence = influence.with_delta(id, change);
            }
        }

        after.last_updated = now;
        self.commit(before, after, &influence, false)
    }

    fn apply_influence(
        &self,
        agent_id: &str,
        influence: DriftInfluence,
        counts_as_interaction: bool,
    ) -> PersonalityState {
        let lock = self.lock_for(agent_id);
        let _guard = lock.lock();

        let before = self.current_state(agent_id);
        let scale = match influence.kind {
            DriftKind::Relationship => 1.0,
            kind => kind.multiplier() * self.config.stability_damping(),
        };

        let mut after = before.clone();
        for (id, delta) in &influence.deltas {
            after.adjust(*id, delta * scale);
        }
        after.last_updated = influence.timestamp;
        self.commit(before, after, &influence, counts_as_interaction)
    }

    /// Finish an update: metadata, shift detection and persistence.
    fn commit(
        &self,
        before: PersonalityState,
        mut after: PersonalityState,
        influence: &DriftInfluence,
        counts_as_interaction: bool,
    ) -> PersonalityState {
        if counts_as_interaction {
            after.total_interactions += 1;
        }
        after.drift_velocity = drift_velocity(&before, &after);

        let trigger = format!("{}:{}", kind_label(influence.kind), influence.label);
        if self.is_major_shift(&before, &after) {
            after.last_major_shift = Some(after.last_updated);
            info!(
                agent_id = %after.agent_id,
                trigger = %trigger,
                velocity = after.drift_velocity,
                "Major personality shift"
            );
            if let Err(e) = self.store.append_major_shift(&before, &after, &trigger) {
                warn!(agent_id = %after.agent_id, error = %e, "Failed to record major shift");
            }
        }

        if let Err(e) = self.store.save_state(&after) {
            warn!(agent_id = %after.agent_id, error = %e, "Failed to persist personality state");
        }
        if let Err(e) = self.store.append_history(&after, &trigger) {
            warn!(agent_id = %after.agent_id, error = %e, "Failed to append personality history");
        }
        if let Err(e) = self.store.append_influence(&after.agent_id, influence) {
            warn!(agent_id = %after.agent_id, error = %e, "Failed to record drift influence");
        }

        debug!(
            agent_id = %after.agent_id,
            trigger = %trigger,
            velocity = after.drift_velocity,
            "Applied drift"
        );
        after
    }

    fn is_major_shift(&self, before: &PersonalityState, after: &PersonalityState) -> bool {
        let threshold = self.config.major_shift_threshold;
        SHIFT_TRAITS
            .iter()
            .any(|id| (after.get(*id) - before.get(*id)).abs() > threshold)
            || after.drift_velocity > self.config.major_shift_velocity
    }

    /// Agents with a persisted state.
    pub fn known_agents(&self) -> Vec<String> {
        self.store.known_agents()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Mean absolute change across every trait.
pub fn drift_velocity(before: &PersonalityState, after: &PersonalityState) -> f32 {
    let total: f32 = TraitId::ALL
        .iter()
        .map(|id| (after.get(*id) - before.get(*id)).abs())
        .sum();
    total / TraitId::ALL.len() as f32
}

fn kind_label(kind: DriftKind) -> &'static str {
    match kind {
        DriftKind::Interaction => "interaction",
        DriftKind::Incident => "incident",
        DriftKind::TimeDecay => "time",
        DriftKind::Relationship => "relationship",
    }
}

fn clamp_input(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use tempfile::tempdir;

    fn engine(root: &std::path::Path) -> DriftEngine {
        DriftEngine::new(
            TraitStore::new(root),
            DriftConfig::default(),
            Arc::new(SharedRng::seeded(42)),
        )
    }

    #[test]
    fn test_collaboration_raises_social_traits() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let before = engine.current_state("agent_a");

        let after = engine.apply_interaction("agent_a", "collaboration", Some("agent_b"), 0.8, 0.7);

        assert!(after.supportiveness > before.supportiveness);
        assert!(after.trust_level > before.trust_level);
        assert!(after.positivity > before.positivity);
        assert_eq!(after.total_interactions, before.total_interactions + 1);
        // 0.7 * 0.1 * 0.525
        assert!((after.supportiveness - 0.03675).abs() < 1e-5);
    }

    #[test]
    fn test_state_is_persisted_between_calls() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        engine.apply_interaction("agent_a", "joke", None, 1.0, 1.0);
        engine.apply_interaction("agent_a", "joke", None, 1.0, 1.0);

        let reopened = DriftEngine::new(
            TraitStore::new(dir.path()),
            DriftConfig::default(),
            Arc::new(SharedRng::seeded(1)),
        );
        assert_eq!(reopened.current_state("agent_a").total_interactions, 2);
    }

    #[test]
    fn test_incident_is_doubled() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let after = engine.apply_incident("agent_a", "system_crash", 1.0);
        // 0.5 + 0.2 * 2.0 * 0.525
        assert!((after.chaos_tolerance - 0.71).abs() < 1e-5);
        assert!(after.last_major_shift.is_some());
    }

    #[test]
    fn test_small_interaction_is_not_a_major_shift() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let after = engine.apply_interaction("agent_a", "debate", None, 0.0, 0.2);
        assert!(after.last_major_shift.is_none());
        assert!(after.drift_velocity > 0.0);
    }

    #[test]
    fn test_traits_stay_in_range_under_repeated_pressure() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        for _ in 0..200 {
            engine.apply_interaction("agent_a", "argument", None, 1.0, 1.0);
            engine.apply_incident("agent_a", "heated_debate", 1.0);
        }
        let state = engine.current_state("agent_a");
        for (id, value) in state.traits() {
            assert!(value >= id.range().min() && value <= id.range().max(), "{} = {}", id, value);
        }
        assert_eq!(state.aggression, 1.0);
    }

    #[test]
    fn test_zero_hours_is_a_no_op() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let before = engine.apply_interaction("agent_a", "joke", None, 1.0, 1.0);
        let after = engine.apply_time_drift("agent_a", 0.0);
        for id in TraitId::ALL {
            assert_eq!(before.get(id), after.get(id));
        }
        assert_eq!(after.total_interactions, before.total_interactions);
    }

    #[test]
    fn test_zero_hours_leaves_stored_state_untouched() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        engine.apply_interaction("agent_a", "debate", None, 0.5, 0.5);
        let path = dir.path().join("states").join("agent_a.json");
        let bytes = std::fs::read(&path).unwrap();
        let before = engine.current_state("agent_a");

        engine.apply_time_drift("agent_a", 0.0);
        engine.apply_time_drift("agent_a", -3.0);
        engine.apply_time_drift("agent_a", f32::NAN);

        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(engine.current_state("agent_a"), before);
    }

    #[test]
    fn test_hourly_jitter_is_bounded_and_limited_to_humor_and_analysis() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let config = DriftConfig::default();
        let baseline = engine.baseline("agent_a");
        let bound = 3.0 * config.jitter_per_hour + 1e-6;
        let mut jittered = 0;

        for _ in 0..200 {
            let prev = engine.current_state("agent_a");
            let after = engine.apply_time_drift("agent_a", 1.0);
            for id in TraitId::ALL {
                let reverted = prev.get(id) + (baseline.get(id) - prev.get(id)) * config.reversion_rate;
                let noise = after.get(id) - reverted;
                if JITTER_TRAITS.contains(&id) {
                    assert!(noise.abs() <= bound, "{:?} moved {} in one hour", id, noise);
                    if noise.abs() > 1e-7 {
                        jittered += 1;
                    }
                } else {
                    assert_eq!(after.get(id), baseline.get(id), "{:?} should not jitter", id);
                }
            }
        }
        assert!(jittered > 0);
    }

    #[test]
    fn test_path_like_agent_id_writes_nothing_outside_the_store() {
        fn file_names(dir: &std::path::Path, out: &mut Vec<String>) {
            for entry in std::fs::read_dir(dir).unwrap().flatten() {
                let path = entry.path();
                if path.is_dir() {
                    file_names(&path, out);
                } else {
                    out.push(path.file_name().unwrap().to_string_lossy().into_owned());
                }
            }
        }

        let dir = tempdir().unwrap();
        let engine = engine(&dir.path().join("personality"));
        engine.apply_interaction("../escaped", "joke", None, 1.0, 1.0);
        engine.apply_time_drift("../escaped", 5.0);

        let mut names = Vec::new();
        file_names(dir.path(), &mut names);
        assert!(names.iter().all(|n| !n.contains("escaped")), "{:?}", names);
        assert!(engine.known_agents().is_empty());
    }

    #[test]
    fn test_time_drift_reverts_toward_baseline() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        for _ in 0..5 {
            engine.apply_interaction("agent_a", "collaboration", None, 1.0, 1.0);
        }
        let before = engine.current_state("agent_a");
        let after = engine.apply_time_drift("agent_a", 500.0);

        assert!(after.trust_level < before.trust_level);
        assert!(after.trust_level > 0.5);
        assert_eq!(after.total_interactions, before.total_interactions);
    }

    #[test]
    fn test_relationship_influence_requires_history() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let untouched = engine.apply_relationship_influence("agent_a", Some("agent_b"), 0.9, 10);
        assert_eq!(untouched.trust_level, 0.5);

        let warmed = engine.apply_relationship_influence("agent_a", Some("agent_b"), 0.9, 11);
        assert!((warmed.trust_level - 0.52).abs() < 1e-6);
        assert!((warmed.supportiveness - 0.01).abs() < 1e-6);
        assert_eq!(warmed.total_interactions, 0);
    }

    #[test]
    fn test_seeded_baseline_shapes_new_agents_and_reset() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let engine = engine(dir.path()).with_clock(clock);
        let overrides = BTreeMap::from([(TraitId::HumorTendency, 0.7)]);

        assert!(engine.seed_baseline("agent_a", &overrides).unwrap());
        assert!(!engine.seed_baseline("agent_a", &overrides).unwrap());
        assert_eq!(engine.current_state("agent_a").humor_tendency, 0.7);

        engine.apply_incident("agent_a", "system_crash", 1.0);
        let reset = engine.reset_to_baseline("agent_a").unwrap();
        assert_eq!(reset.chaos_tolerance, 0.5);
        assert_eq!(reset.humor_tendency, 0.7);
        assert_eq!(reset.total_interactions, 1);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let a = engine.apply_interaction("agent_a", "joke", None, 5.0, 3.0);
        let b = engine.apply_interaction("agent_b", "joke", None, 1.0, 1.0);
        assert_eq!(a.humor_tendency, b.humor_tendency);
    }

    #[test]
    fn test_explicit_baseline_replaces_seeded_one() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let now = engine.now();
        engine
            .set_baseline(&PersonalityState::new("agent_a", now).with_trait(TraitId::Formality, 0.9))
            .unwrap();

        let seeded = engine
            .seed_baseline("agent_a", &BTreeMap::from([(TraitId::Formality, 0.1)]))
            .unwrap();
        assert!(!seeded);
        assert_eq!(engine.baseline("agent_a").formality, 0.9);
    }
}
