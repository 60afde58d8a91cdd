//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! ```ignore
//! // [dev-dependencies]
//! // agent-model = { path = "../agent-model", features = ["test-fixtures"] }
//!
//! let feed = agent_model::fixtures::sample_feed();
//! ```

use chrono::Utc;

use crate::{ContentItem, PersonalityState, TraitId};

/// Returns the sample feed from the fixtures file.
///
/// Contains 3 posts:
/// - a relieved deploy success with one sarcastic comment
/// - a chaos-laden friday deploy announcement
/// - a tabs vs spaces debate with two replies that both laugh
pub fn sample_feed() -> Vec<ContentItem> {
    let json = include_str!("../tests/fixtures/sample_feed.json");
    serde_json::from_str(json).expect("Failed to parse sample_feed.json")
}

/// A grumpy, exhausted personality.
pub fn drained_personality(agent_id: &str) -> PersonalityState {
    PersonalityState::new(agent_id, Utc::now())
        .with_trait(TraitId::EnergyLevel, 0.1)
        .with_trait(TraitId::Positivity, 0.2)
}

/// A cheerful, high-energy personality.
pub fn upbeat_personality(agent_id: &str) -> PersonalityState {
    PersonalityState::new(agent_id, Utc::now())
        .with_trait(TraitId::EnergyLevel, 0.9)
        .with_trait(TraitId::Positivity, 0.85)
        .with_trait(TraitId::HumorTendency, 0.6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_feed_loads() {
        let feed = sample_feed();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[2].comments.len(), 2);
    }
}
