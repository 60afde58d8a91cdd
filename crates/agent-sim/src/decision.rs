//! Response Decision
//!
//! Decides whether an agent replies to a piece of content. The base
//! probability from the agent's profile is scaled by interest, relationship
//! and time-of-day modifiers, then optionally adjusted by what the agent
//! remembers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use agent_model::{ContentItem, IncidentMemory, Memory, PersonalityState, RelationshipMemory, TraitId};

use crate::config::DecisionConfig;
use crate::rng::{SharedRng, SimRng};
use crate::text;

/// Modifier constants.
pub mod modifier_constants {
    pub const TOPIC_WEIGHT_SCALE: f32 = 0.5;
    pub const STRONG_KEYWORD: f32 = 1.5;
    pub const MODERATE_KEYWORD: f32 = 1.2;
    pub const AVOID_KEYWORD: f32 = 0.5;
    pub const PEAK_HOUR: f32 = 1.3;
    pub const NEAR_PEAK: f32 = 1.1;
    pub const OFF_PEAK: f32 = 0.8;
    /// Hours either side of the first peak hour that count as near it
    pub const NEAR_PEAK_WINDOW: u32 = 2;
    /// Base probability of a synthesized profile
    pub const DEFAULT_RESPONSE_PROBABILITY: f32 = 0.5;
    /// Chance a reply picks up one of the agent's speech patterns
    pub const SPEECH_PATTERN_PROBABILITY: f32 = 0.3;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerKeywords {
    pub strong: Vec<String>,
    pub moderate: Vec<String>,
    pub avoid: Vec<String>,
}

/// Static, configured description of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    pub agent_id: String,
    pub display_name: String,
    /// Base reply probability in [0, 1]
    pub response_probability: f32,
    /// Hours of the day (0-23) the agent is most active
    pub peak_hours: Vec<u32>,
    /// Topic -> interest weight
    pub primary_topics: BTreeMap<String, f32>,
    pub trigger_keywords: TriggerKeywords,
    /// Author id -> multiplier applied when replying to that author
    pub response_modifiers: BTreeMap<String, f32>,
    pub speech_patterns: Vec<String>,
    /// Trait name -> starting value for the personality baseline
    pub baseline: BTreeMap<String, f32>,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            display_name: String::new(),
            response_probability: modifier_constants::DEFAULT_RESPONSE_PROBABILITY,
            peak_hours: Vec::new(),
            primary_topics: BTreeMap::new(),
            trigger_keywords: TriggerKeywords::default(),
            response_modifiers: BTreeMap::new(),
            speech_patterns: Vec::new(),
            baseline: BTreeMap::new(),
        }
    }
}

impl AgentProfile {
    pub fn new(agent_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Profile used for agents with no configuration.
    pub fn fallback(agent_id: &str) -> Self {
        Self::new(agent_id, agent_id)
    }

    pub fn with_response_probability(mut self, probability: f32) -> Self {
        self.response_probability = probability;
        self
    }

    pub fn with_peak_hours(mut self, hours: Vec<u32>) -> Self {
        self.peak_hours = hours;
        self
    }

    pub fn with_topic(mut self, topic: &str, weight: f32) -> Self {
        self.primary_topics.insert(topic.to_string(), weight);
        self
    }

    pub fn with_keywords(mut self, keywords: TriggerKeywords) -> Self {
        self.trigger_keywords = keywords;
        self
    }

    pub fn with_response_modifier(mut self, author_id: &str, modifier: f32) -> Self {
        self.response_modifiers.insert(author_id.to_string(), modifier);
        self
    }

    pub fn with_speech_pattern(mut self, pattern: &str) -> Self {
        self.speech_patterns.push(pattern.to_string());
        self
    }

    pub fn with_baseline(mut self, id: TraitId, value: f32) -> Self {
        self.baseline.insert(id.name().to_string(), value);
        self
    }

    /// Baseline trait overrides. Unknown trait names are logged and skipped.
    pub fn baseline_overrides(&self) -> BTreeMap<TraitId, f32> {
        self.baseline
            .iter()
            .filter_map(|(name, value)| match name.parse::<TraitId>() {
                Ok(id) => Some((id, *value)),
                Err(e) => {
                    warn!(agent_id = %self.agent_id, error = %e, "Ignoring baseline override");
                    None
                }
            })
            .collect()
    }

    /// Sometimes work one of the agent's speech patterns into `text`, as a
    /// prefix or a suffix. `{topic}` in a pattern is filled with a word from
    /// the text past its first two.
    pub fn apply_speech_patterns(&self, text: &str, rng: &mut SimRng) -> String {
        if self.speech_patterns.is_empty() || !rng.gen_bool(modifier_constants::SPEECH_PATTERN_PROBABILITY) {
            return text.to_string();
        }
        let Some(pattern) = rng.choose(&self.speech_patterns) else {
            return text.to_string();
        };
        let pattern = if pattern.contains("{topic}") {
            let words: Vec<&str> = text.split_whitespace().skip(2).collect();
            let topic = rng.choose(&words).copied().unwrap_or("this");
            pattern.replace("{topic}", topic)
        } else {
            pattern.clone()
        };
        if rng.gen_bool(0.5) {
            format!("{} {}", pattern, text)
        } else {
            format!("{} {}", text, pattern)
        }
    }

    /// The topic this agent cares most about, if any.
    pub fn favorite_topic(&self) -> Option<&str> {
        self.primary_topics
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(topic, _)| topic.as_str())
    }

    pub fn interest_modifier(&self, context: &ResponseContext) -> f32 {
        use modifier_constants::*;

        let mut modifier = 1.0;
        for topic in &context.topics {
            if let Some(weight) = self.primary_topics.get(topic) {
                modifier *= 1.0 + weight * TOPIC_WEIGHT_SCALE;
            }
        }
        let keywords = &self.trigger_keywords;
        for keyword in &context.keywords {
            if keywords.strong.contains(keyword) {
                modifier *= STRONG_KEYWORD;
            } else if keywords.moderate.contains(keyword) {
                modifier *= MODERATE_KEYWORD;
            } else if keywords.avoid.contains(keyword) {
                modifier *= AVOID_KEYWORD;
            }
        }
        modifier
    }

    pub fn relationship_modifier(&self, context: &ResponseContext) -> f32 {
        context
            .author_id
            .as_ref()
            .and_then(|author| self.response_modifiers.get(author))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn time_modifier(&self, hour: u32) -> f32 {
        use modifier_constants::*;

        let Some(&first_peak) = self.peak_hours.first() else {
            return 1.0;
        };
        if self.peak_hours.contains(&hour) {
            PEAK_HOUR
        } else if circular_hour_distance(hour, first_peak) <= NEAR_PEAK_WINDOW {
            NEAR_PEAK
        } else {
            OFF_PEAK
        }
    }
}

/// Distance between two hours on a 24-hour clock.
fn circular_hour_distance(a: u32, b: u32) -> u32 {
    let diff = (a % 24).abs_diff(b % 24);
    diff.min(24 - diff)
}

/// What an agent notices about a piece of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContext {
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    pub emotions: Vec<String>,
    pub author_id: Option<String>,
    pub current_hour: u32,
}

impl ResponseContext {
    /// Number of significant words promoted to topics.
    const TOPIC_TERMS: usize = 5;

    pub fn from_content(item: &ContentItem, current_hour: u32) -> Self {
        let text = item.full_text();
        let mut topics = text::hashtags(&text);
        for term in text::key_terms(&text).into_iter().take(Self::TOPIC_TERMS) {
            if !topics.contains(&term) {
                topics.push(term);
            }
        }
        Self {
            keywords: text::tech_keywords(&text),
            topics,
            emotions: text::emotion_tags(&text).into_iter().map(String::from).collect(),
            author_id: Some(item.author_id.clone()),
            current_hour,
        }
    }
}

/// What an agent recalls when looking at a piece of content.
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    pub similar_memories: Vec<Memory>,
    pub incident: Option<IncidentMemory>,
    /// Relationships with agents mentioned in the content
    pub relationships: Vec<RelationshipMemory>,
}

/// Adjust a response probability by memories, relationships and energy.
pub fn memory_adjusted_probability(
    base: f32,
    agent_id: &str,
    memory: &MemoryContext,
    personality: &PersonalityState,
    config: &DecisionConfig,
) -> f32 {
    let mut probability = base + config.similar_memory_boost * memory.similar_memories.len() as f32;

    if memory.incident.as_ref().is_some_and(|i| i.involves(agent_id)) {
        probability += config.shared_incident_boost;
    }

    for relationship in &memory.relationships {
        if relationship.affinity_history.is_empty() {
            continue;
        }
        let affinity = relationship.current_affinity();
        if affinity > config.affinity_threshold {
            probability += config.affinity_boost;
        } else if affinity < -config.affinity_threshold {
            probability -= config.affinity_boost;
        }
    }

    if personality.energy_level < config.low_energy_threshold {
        probability *= config.low_energy_damping;
    }
    probability.clamp(0.0, 1.0)
}

pub struct ResponseDecider {
    profiles: BTreeMap<String, AgentProfile>,
    rng: Arc<SharedRng>,
}

impl ResponseDecider {
    pub fn new(profiles: &[AgentProfile], rng: Arc<SharedRng>) -> Self {
        Self {
            profiles: profiles
                .iter()
                .map(|p| (p.agent_id.clone(), p.clone()))
                .collect(),
            rng,
        }
    }

    /// Configured profile, or a synthesized default for unknown agents.
    pub fn profile(&self, agent_id: &str) -> AgentProfile {
        self.profiles
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| AgentProfile::fallback(agent_id))
    }

    /// Probability in [0, 1] that the agent replies. Pure.
    pub fn response_probability(&self, agent_id: &str, context: &ResponseContext) -> f32 {
        let profile = self.profile(agent_id);
        let probability = profile.response_probability
            * profile.interest_modifier(context)
            * profile.relationship_modifier(context)
            * profile.time_modifier(context.current_hour);
        if probability.is_nan() {
            return 0.0;
        }
        probability.clamp(0.0, 1.0)
    }

    /// One weighted coin flip on the shared random source.
    pub fn should_respond(&self, agent_id: &str, context: &ResponseContext) -> (bool, f32) {
        let probability = self.response_probability(agent_id, context);
        let respond = self.decide(probability);
        debug!(agent_id, probability, respond, "Response decision");
        (respond, probability)
    }

    /// Flip once on an already computed probability.
    pub fn decide(&self, probability: f32) -> bool {
        self.rng.gen_bool(probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_model::{AffinitySample, MemoryKind};
    use chrono::Utc;

    fn context(keywords: &[&str], topics: &[&str], hour: u32) -> ResponseContext {
        ResponseContext {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
            emotions: Vec::new(),
            author_id: Some("someone".into()),
            current_hour: hour,
        }
    }

    #[test]
    fn test_speech_patterns_are_applied_sometimes_at_either_end() {
        let profile = AgentProfile::new("a", "A").with_speech_pattern("Have you checked the {topic}?");
        let text = "we should rotate the deploy keys";
        let mut rng = SimRng::seeded(11);
        let (mut prefixed, mut suffixed, mut untouched) = (0, 0, 0);
        for _ in 0..500 {
            let out = profile.apply_speech_patterns(text, &mut rng);
            assert!(!out.contains("{topic}"));
            if out == text {
                untouched += 1;
            } else if out.starts_with("Have you checked the ") {
                assert!(out.ends_with(text));
                prefixed += 1;
            } else {
                assert!(out.starts_with(text));
                let topic = out.trim_start_matches(text).trim_start_matches(" Have you checked the ");
                let topic = topic.trim_end_matches('?');
                assert!(["rotate", "the", "deploy", "keys"].contains(&topic), "{}", out);
                suffixed += 1;
            }
        }
        assert!(prefixed > 0 && suffixed > 0);
        assert!((250..450).contains(&untouched), "{}", untouched);
    }

    #[test]
    fn test_speech_patterns_fall_back_to_this_for_short_text() {
        let profile = AgentProfile::new("a", "A").with_speech_pattern("so much {topic}");
        let mut rng = SimRng::seeded(5);
        let applied = (0..200)
            .map(|_| profile.apply_speech_patterns("ok then", &mut rng))
            .find(|out| out != "ok then")
            .unwrap();
        assert!(applied.contains("so much this"));

        let plain = AgentProfile::new("b", "B");
        assert_eq!(plain.apply_speech_patterns("ok then", &mut rng), "ok then");
    }

    fn wizard() -> AgentProfile {
        AgentProfile::new("byte_wizard", "Byte Wizard")
            .with_response_probability(0.4)
            .with_peak_hours(vec![23, 10])
            .with_topic("devops", 1.0)
            .with_keywords(TriggerKeywords {
                strong: vec!["docker".into()],
                moderate: vec!["api".into()],
                avoid: vec!["react".into()],
            })
            .with_response_modifier("meme_lord", 0.5)
    }

    #[test]
    fn test_interest_modifier() {
        let profile = wizard();
        assert_eq!(profile.interest_modifier(&context(&[], &[], 12)), 1.0);
        assert!((profile.interest_modifier(&context(&["docker"], &["devops"], 12)) - 2.25).abs() < 1e-6);
        assert!((profile.interest_modifier(&context(&["api", "react"], &[], 12)) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_time_modifier_wraps_midnight() {
        let profile = wizard();
        assert_eq!(profile.time_modifier(10), 1.3);
        assert_eq!(profile.time_modifier(1), 1.1);
        assert_eq!(profile.time_modifier(21), 1.1);
        assert_eq!(profile.time_modifier(15), 0.8);
        assert_eq!(AgentProfile::fallback("x").time_modifier(15), 1.0);
    }

    #[test]
    fn test_relationship_modifier() {
        let profile = wizard();
        let mut ctx = context(&[], &[], 12);
        assert_eq!(profile.relationship_modifier(&ctx), 1.0);
        ctx.author_id = Some("meme_lord".into());
        assert_eq!(profile.relationship_modifier(&ctx), 0.5);
    }

    #[test]
    fn test_probability_is_clamped() {
        let profile = wizard().with_response_probability(0.9);
        let decider = ResponseDecider::new(&[profile], Arc::new(SharedRng::seeded(7)));
        let hot = context(&["docker", "docker", "docker"], &["devops"], 10);
        assert_eq!(decider.response_probability("byte_wizard", &hot), 1.0);
        let (respond, p) = decider.should_respond("byte_wizard", &hot);
        assert!(respond);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_unknown_agent_gets_default_profile() {
        let decider = ResponseDecider::new(&[], Arc::new(SharedRng::seeded(7)));
        let p = decider.response_probability("stranger", &context(&[], &[], 3));
        assert_eq!(p, modifier_constants::DEFAULT_RESPONSE_PROBABILITY);
    }

    #[test]
    fn test_same_seed_same_decisions() {
        let ctx = context(&["api"], &[], 15);
        let run = |seed| {
            let decider = ResponseDecider::new(&[wizard()], Arc::new(SharedRng::seeded(seed)));
            (0..20)
                .map(|_| decider.should_respond("byte_wizard", &ctx).0)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_baseline_overrides_skip_unknown_traits() {
        let mut profile = wizard().with_baseline(TraitId::Formality, 0.6);
        profile.baseline.insert("charisma".into(), 1.0);
        let overrides = profile.baseline_overrides();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[&TraitId::Formality], 0.6);
    }

    #[test]
    fn test_context_from_content() {
        let item = ContentItem::new(
            "p1",
            "chaos_gremlin",
            "Docker broke production",
            "Why is the deployment broken? #devops",
            Utc::now(),
        );
        let ctx = ResponseContext::from_content(&item, 9);
        assert!(ctx.keywords.contains(&"docker".to_string()));
        assert!(ctx.keywords.contains(&"production".to_string()));
        assert!(ctx.topics.contains(&"devops".to_string()));
        assert!(ctx.emotions.contains(&"question".to_string()));
        assert!(ctx.emotions.contains(&"debugging".to_string()));
        assert_eq!(ctx.author_id.as_deref(), Some("chaos_gremlin"));
    }

    #[test]
    fn test_memory_adjustment() {
        let config = DecisionConfig::default();
        let now = Utc::now();
        let rested = PersonalityState::new("a", now).with_trait(TraitId::EnergyLevel, 0.8);
        let tired = PersonalityState::new("a", now).with_trait(TraitId::EnergyLevel, 0.1);

        let mut friend = RelationshipMemory::new("a", "b");
        friend.affinity_history.push_back(AffinitySample { timestamp: now, affinity: 0.7 });
        let memory = MemoryContext {
            similar_memories: vec![Memory::new(MemoryKind::Interaction, "x", now)],
            incident: Some(IncidentMemory::new("i", "t", "d", now).with_participants(["a"])),
            relationships: vec![friend],
        };

        let boosted = memory_adjusted_probability(0.2, "a", &memory, &rested, &config);
        assert!((boosted - 0.8).abs() < 1e-6);
        let damped = memory_adjusted_probability(0.2, "a", &memory, &tired, &config);
        assert!((damped - 0.4).abs() < 1e-6);
        let empty = memory_adjusted_probability(0.9, "a", &MemoryContext::default(), &rested, &config);
        assert!((empty - 0.9).abs() < 1e-6);
    }
}
