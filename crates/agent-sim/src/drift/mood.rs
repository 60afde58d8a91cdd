//! Mood and writing-style hints derived from a personality state.

use serde::{Deserialize, Serialize};
use std::fmt;

use agent_model::PersonalityState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Cheerful,
    Grumpy,
    Energetic,
    Tired,
    Chaotic,
    Neutral,
}

impl Mood {
    /// First matching rule wins: positivity, then energy, then chaos.
    pub fn of(state: &PersonalityState) -> Self {
        if state.positivity > 0.7 {
            Mood::Cheerful
        } else if state.positivity < 0.3 {
            Mood::Grumpy
        } else if state.energy_level > 0.7 {
            Mood::Energetic
        } else if state.energy_level < 0.3 {
            Mood::Tired
        } else if state.chaos_tolerance > 0.7 {
            Mood::Chaotic
        } else {
            Mood::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Cheerful => "cheerful",
            Mood::Grumpy => "grumpy",
            Mood::Energetic => "energetic",
            Mood::Tired => "tired",
            Mood::Chaotic => "chaotic",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Brief,
    Normal,
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingStyle {
    Chaotic,
    Formal,
    Plain,
}

/// How a reply should be written given the author's current drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleHints {
    pub length: ResponseLength,
    pub style: WritingStyle,
    pub meme_probability: f32,
    pub frequent_humor: bool,
}

impl StyleHints {
    pub fn of(state: &PersonalityState) -> Self {
        let length = if state.energy_level < 0.3 {
            ResponseLength::Brief
        } else if state.energy_level > 0.7 {
            ResponseLength::Verbose
        } else {
            ResponseLength::Normal
        };
        let (style, meme_probability) = if state.chaos_tolerance > 0.7 {
            (WritingStyle::Chaotic, 0.8)
        } else if state.formality > 0.7 {
            (WritingStyle::Formal, 0.1)
        } else {
            (WritingStyle::Plain, 0.3)
        };
        Self {
            length,
            style,
            meme_probability,
            frequent_humor: state.humor_tendency > 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_model::TraitId;
    use chrono::Utc;

    #[test]
    fn test_mood_precedence() {
        let base = PersonalityState::new("a", Utc::now());
        assert_eq!(Mood::of(&base), Mood::Neutral);

        let cheerful_but_tired = base
            .clone()
            .with_trait(TraitId::Positivity, 0.9)
            .with_trait(TraitId::EnergyLevel, 0.1);
        assert_eq!(Mood::of(&cheerful_but_tired), Mood::Cheerful);

        let tired = base.clone().with_trait(TraitId::EnergyLevel, 0.1);
        assert_eq!(Mood::of(&tired), Mood::Tired);

        let chaotic = base.with_trait(TraitId::ChaosTolerance, 0.9);
        assert_eq!(Mood::of(&chaotic), Mood::Chaotic);
    }

    #[test]
    fn test_style_hints() {
        let state = PersonalityState::new("a", Utc::now())
            .with_trait(TraitId::EnergyLevel, 0.2)
            .with_trait(TraitId::Formality, 0.9)
            .with_trait(TraitId::HumorTendency, 0.6);
        let hints = StyleHints::of(&state);
        assert_eq!(hints.length, ResponseLength::Brief);
        assert_eq!(hints.style, WritingStyle::Formal);
        assert!(hints.frequent_humor);
    }
}
