//! Drift lookup tables.
//!
//! Map an interaction or incident type to the trait deltas it causes, before
//! stability damping.

use chrono::{DateTime, Utc};

use agent_model::{DriftInfluence, DriftKind, TraitId};

/// Deltas for an interaction. Unknown types fall back to a generic mood nudge.
pub fn interaction_influence(
    interaction_type: &str,
    other_agent: Option<&str>,
    sentiment: f32,
    intensity: f32,
    at: DateTime<Utc>,
) -> DriftInfluence {
    let (s, i) = (sentiment, intensity);
    let base = DriftInfluence::new(DriftKind::Interaction, interaction_type, intensity, at)
        .with_source(other_agent.map(String::from));

    match interaction_type {
        "argument" => base
            .with_delta(TraitId::Aggression, s * i * 0.1)
            .with_delta(TraitId::TrustLevel, -s.abs() * i * 0.05)
            .with_delta(TraitId::ConflictAvoidance, s.abs() * i * 0.05),
        "collaboration" => base
            .with_delta(TraitId::Supportiveness, i * 0.1)
            .with_delta(TraitId::TrustLevel, i * 0.05)
            .with_delta(TraitId::Positivity, s * i * 0.05),
        "joke" => base
            .with_delta(TraitId::HumorTendency, i * 0.1)
            .with_delta(TraitId::Positivity, s * i * 0.05)
            .with_delta(TraitId::EnergyLevel, i * 0.02),
        "debate" => base
            .with_delta(TraitId::AnalyticalDepth, i * 0.1)
            .with_delta(TraitId::Verbosity, i * 0.05)
            .with_delta(TraitId::Formality, i * 0.02),
        _ => base
            .with_delta(TraitId::EnergyLevel, s * i * 0.02)
            .with_delta(TraitId::Positivity, s * i * 0.05),
    }
}

/// Deltas for a community incident.
pub fn incident_influence(incident_type: &str, impact: f32, at: DateTime<Utc>) -> DriftInfluence {
    let m = impact;
    let base = DriftInfluence::new(DriftKind::Incident, incident_type, impact, at);

    match incident_type {
        "system_crash" => base
            .with_delta(TraitId::ChaosTolerance, m * 0.2)
            .with_delta(TraitId::TrustLevel, -m * 0.1)
            .with_delta(TraitId::AnalyticalDepth, m * 0.1),
        "successful_collaboration" => base
            .with_delta(TraitId::Supportiveness, m * 0.2)
            .with_delta(TraitId::Positivity, m * 0.15)
            .with_delta(TraitId::TrustLevel, m * 0.1),
        "heated_debate" => base
            .with_delta(TraitId::Aggression, m * 0.15)
            .with_delta(TraitId::AnalyticalDepth, m * 0.1)
            .with_delta(TraitId::ConflictAvoidance, -m * 0.1),
        "meme_viral" => base
            .with_delta(TraitId::HumorTendency, m * 0.2)
            .with_delta(TraitId::Extroversion, m * 0.1)
            .with_delta(TraitId::EnergyLevel, m * 0.1),
        _ => base
            .with_delta(TraitId::ChaosTolerance, m * 0.1)
            .with_delta(TraitId::EnergyLevel, m * 0.05),
    }
}

/// Deltas from a long-running relationship. `conflict_avoidance` is the
/// agent's current value, which decides how it copes with a bad one.
pub fn relationship_influence(
    other_agent: Option<&str>,
    quality: f32,
    conflict_avoidance: f32,
    at: DateTime<Utc>,
) -> DriftInfluence {
    let base = DriftInfluence::new(DriftKind::Relationship, "relationship", quality.abs(), at)
        .with_source(other_agent.map(String::from));

    if quality > 0.5 {
        base.with_delta(TraitId::TrustLevel, 0.02)
            .with_delta(TraitId::Supportiveness, 0.01)
            .with_delta(TraitId::Positivity, 0.01)
    } else if quality < -0.5 {
        if conflict_avoidance > 0.5 {
            base.with_delta(TraitId::ConflictAvoidance, 0.02)
        } else {
            base.with_delta(TraitId::Aggression, 0.01)
        }
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_deltas() {
        let inf = interaction_influence("argument", Some("b"), -0.5, 0.8, Utc::now());
        assert!((inf.deltas[&TraitId::Aggression] - -0.04).abs() < 1e-6);
        assert!((inf.deltas[&TraitId::TrustLevel] - -0.02).abs() < 1e-6);
        assert!((inf.deltas[&TraitId::ConflictAvoidance] - 0.02).abs() < 1e-6);
        assert_eq!(inf.source_agent.as_deref(), Some("b"));
    }

    #[test]
    fn test_unknown_interaction_uses_generic_table() {
        let inf = interaction_influence("smalltalk", None, 1.0, 1.0, Utc::now());
        assert_eq!(inf.deltas.len(), 2);
        assert!(inf.deltas.contains_key(&TraitId::EnergyLevel));
        assert!(inf.deltas.contains_key(&TraitId::Positivity));
    }

    #[test]
    fn test_incident_kind() {
        let inf = incident_influence("meme_viral", 0.5, Utc::now());
        assert_eq!(inf.kind, DriftKind::Incident);
        assert!((inf.deltas[&TraitId::HumorTendency] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_relationship_branches() {
        let now = Utc::now();
        assert!(relationship_influence(None, 0.0, 0.5, now).is_empty());
        let avoidant = relationship_influence(None, -0.8, 0.7, now);
        assert!(avoidant.deltas.contains_key(&TraitId::ConflictAvoidance));
        let hostile = relationship_influence(None, -0.8, 0.3, now);
        assert!(hostile.deltas.contains_key(&TraitId::Aggression));
    }
}
