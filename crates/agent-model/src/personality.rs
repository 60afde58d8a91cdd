//! Personality State
//!
//! The twelve drifting personality traits of an agent, plus the identifiers
//! used to address them without string lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value range a trait is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitRange {
    /// Bounded to [0, 1]
    Unit,
    /// Bounded to [-1, 1]
    Bipolar,
}

impl TraitRange {
    pub fn min(self) -> f32 {
        match self {
            TraitRange::Unit => 0.0,
            TraitRange::Bipolar => -1.0,
        }
    }

    pub fn max(self) -> f32 {
        1.0
    }

    /// Value a freshly created agent starts with.
    pub fn neutral(self) -> f32 {
        match self {
            TraitRange::Unit => 0.5,
            TraitRange::Bipolar => 0.0,
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.clamp(self.min(), self.max())
    }
}

/// Identifier for every drifting personality trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitId {
    EnergyLevel,
    Formality,
    Verbosity,
    ChaosTolerance,
    Positivity,
    Extroversion,
    TrustLevel,
    ConflictAvoidance,
    Aggression,
    Supportiveness,
    HumorTendency,
    AnalyticalDepth,
}

impl TraitId {
    /// All traits in storage order.
    pub const ALL: [TraitId; 12] = [
        TraitId::EnergyLevel,
        TraitId::Formality,
        TraitId::Verbosity,
        TraitId::ChaosTolerance,
        TraitId::Positivity,
        TraitId::Extroversion,
        TraitId::TrustLevel,
        TraitId::ConflictAvoidance,
        TraitId::Aggression,
        TraitId::Supportiveness,
        TraitId::HumorTendency,
        TraitId::AnalyticalDepth,
    ];

    pub fn range(self) -> TraitRange {
        match self {
            TraitId::Aggression
            | TraitId::Supportiveness
            | TraitId::HumorTendency
            | TraitId::AnalyticalDepth => TraitRange::Bipolar,
            _ => TraitRange::Unit,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TraitId::EnergyLevel => "energy_level",
            TraitId::Formality => "formality",
            TraitId::Verbosity => "verbosity",
            TraitId::ChaosTolerance => "chaos_tolerance",
            TraitId::Positivity => "positivity",
            TraitId::Extroversion => "extroversion",
            TraitId::TrustLevel => "trust_level",
            TraitId::ConflictAvoidance => "conflict_avoidance",
            TraitId::Aggression => "aggression",
            TraitId::Supportiveness => "supportiveness",
            TraitId::HumorTendency => "humor_tendency",
            TraitId::AnalyticalDepth => "analytical_depth",
        }
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a trait name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTrait(pub String);

impl fmt::Display for UnknownTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown personality trait: {}", self.0)
    }
}

impl std::error::Error for UnknownTrait {}

impl FromStr for TraitId {
    type Err = UnknownTrait;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraitId::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTrait(s.to_string()))
    }
}

/// Current personality of one agent.
///
/// Trait values are always within their [`TraitRange`]; use [`PersonalityState::set`]
/// or [`PersonalityState::adjust`] rather than writing fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityState {
    pub agent_id: String,
    pub energy_level: f32,
    pub formality: f32,
    pub verbosity: f32,
    pub chaos_tolerance: f32,
    pub positivity: f32,
    pub extroversion: f32,
    pub trust_level: f32,
    pub conflict_avoidance: f32,
    pub aggression: f32,
    pub supportiveness: f32,
    pub humor_tendency: f32,
    pub analytical_depth: f32,
    pub last_updated: DateTime<Utc>,
    pub total_interactions: u64,
    pub last_major_shift: Option<DateTime<Utc>>,
    pub drift_velocity: f32,
}

impl PersonalityState {
    /// Neutral personality: unit traits at 0.5, bipolar traits at 0.0.
    pub fn new(agent_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            agent_id: agent_id.into(),
            energy_level: 0.5,
            formality: 0.5,
            verbosity: 0.5,
            chaos_tolerance: 0.5,
            positivity: 0.5,
            extroversion: 0.5,
            trust_level: 0.5,
            conflict_avoidance: 0.5,
            aggression: 0.0,
            supportiveness: 0.0,
            humor_tendency: 0.0,
            analytical_depth: 0.0,
            last_updated: now,
            total_interactions: 0,
            last_major_shift: None,
            drift_velocity: 0.0,
        }
    }

    /// Builder: set a trait while constructing.
    pub fn with_trait(mut self, id: TraitId, value: f32) -> Self {
        self.set(id, value);
        self
    }

    pub fn get(&self, id: TraitId) -> f32 {
        match id {
            TraitId::EnergyLevel => self.energy_level,
            TraitId::Formality => self.formality,
            TraitId::Verbosity => self.verbosity,
            TraitId::ChaosTolerance => self.chaos_tolerance,
            TraitId::Positivity => self.positivity,
            TraitId::Extroversion => self.extroversion,
            TraitId::TrustLevel => self.trust_level,
            TraitId::ConflictAvoidance => self.conflict_avoidance,
            TraitId::Aggression => self.aggression,
            TraitId::Supportiveness => self.supportiveness,
            TraitId::HumorTendency => self.humor_tendency,
            TraitId::AnalyticalDepth => self.analytical_depth,
        }
    }

    fn slot_mut(&mut self, id: TraitId) -> &mut f32 {
        match id {
            TraitId::EnergyLevel => &mut self.energy_level,
            TraitId::Formality => &mut self.formality,
            TraitId::Verbosity => &mut self.verbosity,
            TraitId::ChaosTolerance => &mut self.chaos_tolerance,
            TraitId::Positivity => &mut self.positivity,
            TraitId::Extroversion => &mut self.extroversion,
            TraitId::TrustLevel => &mut self.trust_level,
            TraitId::ConflictAvoidance => &mut self.conflict_avoidance,
            TraitId::Aggression => &mut self.aggression,
            TraitId::Supportiveness => &mut self.supportiveness,
            TraitId::HumorTendency => &mut self.humor_tendency,
            TraitId::AnalyticalDepth => &mut self.analytical_depth,
        }
    }

    /// Set a trait, clamped to its range. Returns the stored value.
    pub fn set(&mut self, id: TraitId, value: f32) -> f32 {
        let clamped = if value.is_finite() {
            id.range().clamp(value)
        } else {
            id.range().neutral()
        };
        *self.slot_mut(id) = clamped;
        clamped
    }

    /// Add a delta to a trait, clamped. Returns the applied change.
    pub fn adjust(&mut self, id: TraitId, delta: f32) -> f32 {
        let before = self.get(id);
        let after = self.set(id, before + delta);
        after - before
    }

    /// Re-clamp every trait; used after loading a record from disk.
    pub fn normalize(&mut self) {
        for id in TraitId::ALL {
            let value = self.get(id);
            self.set(id, value);
        }
    }

    /// Every trait with its current value, in storage order.
    pub fn traits(&self) -> impl Iterator<Item = (TraitId, f32)> + '_ {
        TraitId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_by_range() {
        let state = PersonalityState::new("agent_a", Utc::now());
        for (id, value) in state.traits() {
            assert_eq!(value, id.range().neutral(), "{} default", id);
        }
    }

    #[test]
    fn test_set_clamps_to_range() {
        let mut state = PersonalityState::new("agent_a", Utc::now());
        assert_eq!(state.set(TraitId::Positivity, 1.7), 1.0);
        assert_eq!(state.set(TraitId::Positivity, -0.2), 0.0);
        assert_eq!(state.set(TraitId::Aggression, -3.0), -1.0);
        assert_eq!(state.set(TraitId::Aggression, f32::NAN), 0.0);
    }

    #[test]
    fn test_adjust_reports_applied_change() {
        let mut state = PersonalityState::new("agent_a", Utc::now()).with_trait(TraitId::TrustLevel, 0.95);
        let applied = state.adjust(TraitId::TrustLevel, 0.2);
        assert!((applied - 0.05).abs() < 1e-6);
        assert_eq!(state.trust_level, 1.0);
    }

    #[test]
    fn test_trait_name_round_trip() {
        for id in TraitId::ALL {
            assert_eq!(id.name().parse::<TraitId>().unwrap(), id);
        }
        assert!("charisma".parse::<TraitId>().is_err());
    }
}
