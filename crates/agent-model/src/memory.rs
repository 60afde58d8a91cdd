//! Memory Types
//!
//! Episodic memories owned by a single agent, incidents shared by the whole
//! community, and pairwise relationship histories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Bounds applied to relationship records.
pub mod relationship_constants {
    /// Affinity samples retained per pair
    pub const AFFINITY_HISTORY_LIMIT: usize = 100;
    /// Inside jokes retained per pair
    pub const INSIDE_JOKE_LIMIT: usize = 20;
    /// Sentiment above this counts as a positive interaction
    pub const POSITIVE_THRESHOLD: f32 = 0.2;
    /// Sentiment below this counts as a negative interaction
    pub const NEGATIVE_THRESHOLD: f32 = -0.2;
    /// Affinity moves by sentiment times this factor
    pub const AFFINITY_STEP: f32 = 0.1;
}

/// Kind of episodic memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Interaction,
    Incident,
    Learning,
    Relationship,
}

impl MemoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryKind::Interaction => "interaction",
            MemoryKind::Incident => "incident",
            MemoryKind::Learning => "learning",
            MemoryKind::Relationship => "relationship",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interaction" => Ok(MemoryKind::Interaction),
            "incident" => Ok(MemoryKind::Incident),
            "learning" => Ok(MemoryKind::Learning),
            "relationship" => Ok(MemoryKind::Relationship),
            other => Err(format!("unknown memory kind: {}", other)),
        }
    }
}

/// One immutable episodic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub timestamp: DateTime<Utc>,
    pub kind: MemoryKind,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub participants: BTreeSet<String>,
    /// In [-1, 1]
    pub sentiment: f32,
    /// In [0, 1]
    pub importance: f32,
    #[serde(default)]
    pub references: Vec<String>,
}

impl Memory {
    pub fn new(kind: MemoryKind, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind,
            content: content.into(),
            tags: BTreeSet::new(),
            participants: BTreeSet::new(),
            sentiment: 0.0,
            importance: 0.5,
            references: Vec::new(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: f32) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants.extend(participants.into_iter().map(Into::into));
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }
}

/// A shared, community-wide event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentMemory {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub lessons_learned: Vec<String>,
    /// Only ever incremented
    #[serde(default)]
    pub reference_count: u64,
}

impl IncidentMemory {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            title: title.into(),
            description: description.into(),
            participants: Vec::new(),
            outcome: String::new(),
            lessons_learned: Vec::new(),
            reference_count: 0,
        }
    }

    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants.extend(participants.into_iter().map(Into::into));
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = outcome.into();
        self
    }

    pub fn with_lesson(mut self, lesson: impl Into<String>) -> Self {
        self.lessons_learned.push(lesson.into());
        self
    }

    pub fn involves(&self, agent_id: &str) -> bool {
        self.participants.iter().any(|p| p == agent_id)
    }
}

/// Canonical storage key for an unordered agent pair.
pub fn relationship_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}__{}", a, b)
    } else {
        format!("{}__{}", b, a)
    }
}

/// One affinity sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffinitySample {
    pub timestamp: DateTime<Utc>,
    pub affinity: f32,
}

/// History of one unordered agent pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMemory {
    /// Lexicographically smaller agent id
    pub agent_a: String,
    /// Lexicographically larger agent id
    pub agent_b: String,
    pub interaction_count: u64,
    pub positive_interactions: u64,
    pub negative_interactions: u64,
    #[serde(default)]
    pub affinity_history: VecDeque<AffinitySample>,
    #[serde(default)]
    pub inside_jokes: VecDeque<String>,
    #[serde(default)]
    pub shared_incidents: Vec<String>,
}

impl RelationshipMemory {
    pub fn new(a: &str, b: &str) -> Self {
        let (agent_a, agent_b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            agent_a: agent_a.to_string(),
            agent_b: agent_b.to_string(),
            interaction_count: 0,
            positive_interactions: 0,
            negative_interactions: 0,
            affinity_history: VecDeque::new(),
            inside_jokes: VecDeque::new(),
            shared_incidents: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        relationship_key(&self.agent_a, &self.agent_b)
    }

    /// Most recent affinity, 0.0 for a pair with no history.
    pub fn current_affinity(&self) -> f32 {
        self.affinity_history.back().map(|s| s.affinity).unwrap_or(0.0)
    }

    /// The other member of the pair, if `agent_id` is one of them.
    pub fn other(&self, agent_id: &str) -> Option<&str> {
        if self.agent_a == agent_id {
            Some(&self.agent_b)
        } else if self.agent_b == agent_id {
            Some(&self.agent_a)
        } else {
            None
        }
    }

    /// Record one interaction. Sentiment is expected in [-1, 1].
    pub fn record_interaction(&mut self, sentiment: f32, at: DateTime<Utc>) {
        use relationship_constants::*;

        self.interaction_count += 1;
        if sentiment > POSITIVE_THRESHOLD {
            self.positive_interactions += 1;
        } else if sentiment < NEGATIVE_THRESHOLD {
            self.negative_interactions += 1;
        }

        let affinity = (self.current_affinity() + sentiment * AFFINITY_STEP).clamp(-1.0, 1.0);
        self.affinity_history.push_back(AffinitySample {
            timestamp: at,
            affinity,
        });
        while self.affinity_history.len() > AFFINITY_HISTORY_LIMIT {
            self.affinity_history.pop_front();
        }
    }

    /// Remember an inside joke; duplicates are ignored, oldest evicted.
    pub fn add_inside_joke(&mut self, joke: &str) {
        if self.inside_jokes.iter().any(|j| j == joke) {
            return;
        }
        self.inside_jokes.push_back(joke.to_string());
        while self.inside_jokes.len() > relationship_constants::INSIDE_JOKE_LIMIT {
            self.inside_jokes.pop_front();
        }
    }

    pub fn add_shared_incident(&mut self, incident_id: &str) {
        if !self.shared_incidents.iter().any(|i| i == incident_id) {
            self.shared_incidents.push(incident_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_key_is_order_independent() {
        assert_eq!(relationship_key("zed", "amy"), relationship_key("amy", "zed"));
        assert_eq!(relationship_key("amy", "zed"), "amy__zed");
    }

    #[test]
    fn test_affinity_accumulates_and_clamps() {
        let mut rel = RelationshipMemory::new("b", "a");
        assert_eq!(rel.agent_a, "a");
        let now = Utc::now();
        for _ in 0..15 {
            rel.record_interaction(1.0, now);
        }
        assert_eq!(rel.current_affinity(), 1.0);
        assert_eq!(rel.positive_interactions, 15);

        rel.record_interaction(-0.5, now);
        assert!((rel.current_affinity() - 0.95).abs() < 1e-6);
        assert_eq!(rel.negative_interactions, 1);
    }

    #[test]
    fn test_neutral_sentiment_is_neither_positive_nor_negative() {
        let mut rel = RelationshipMemory::new("a", "b");
        rel.record_interaction(0.1, Utc::now());
        assert_eq!(rel.interaction_count, 1);
        assert_eq!(rel.positive_interactions, 0);
        assert_eq!(rel.negative_interactions, 0);
    }

    #[test]
    fn test_history_bounds() {
        let mut rel = RelationshipMemory::new("a", "b");
        let now = Utc::now();
        for _ in 0..150 {
            rel.record_interaction(0.0, now);
        }
        assert_eq!(rel.affinity_history.len(), relationship_constants::AFFINITY_HISTORY_LIMIT);

        for i in 0..30 {
            rel.add_inside_joke(&format!("joke {}", i));
        }
        rel.add_inside_joke("joke 29");
        assert_eq!(rel.inside_jokes.len(), relationship_constants::INSIDE_JOKE_LIMIT);
        assert_eq!(rel.inside_jokes.front().map(String::as_str), Some("joke 10"));
    }
}
