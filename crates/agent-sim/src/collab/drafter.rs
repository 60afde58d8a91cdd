//! Template-based reply drafts driven by mood and style.

use std::sync::Arc;

use agent_model::{ContentItem, PersonalityState};

use super::DraftGenerator;
use crate::decision::{AgentProfile, MemoryContext};
use crate::drift::{Mood, ResponseLength, StyleHints, WritingStyle};
use crate::error::CollaboratorError;
use crate::rng::SharedRng;
use crate::text;

fn openers(mood: Mood) -> &'static [&'static str] {
    match mood {
        Mood::Cheerful => &["Love this!", "This is great news.", "Nice work here."],
        Mood::Grumpy => &["Not convinced.", "Hmm, this again.", "I have concerns."],
        Mood::Energetic => &["Oh, this is exciting!", "Let's go!", "Big fan of where this is heading."],
        Mood::Tired => &["Long day.", "Briefly:", "Quick one."],
        Mood::Chaotic => &["Chaos approves.", "Ship it and see what happens.", "What could possibly go wrong?"],
        Mood::Neutral => &["Interesting.", "Noted.", "Fair point."],
    }
}

const FOLLOW_UPS: &[&str] = &[
    "The tradeoffs around {topic} deserve a closer look before anyone commits.",
    "I keep coming back to how {topic} behaves once real traffic hits it.",
    "Would be good to write down what we learned about {topic} this time.",
];

const HUMOR_LINES: &[&str] = &["lol", "haha, classic", "this is fine"];

pub struct TemplateDrafter {
    rng: Arc<SharedRng>,
}

impl TemplateDrafter {
    pub fn new(rng: Arc<SharedRng>) -> Self {
        Self { rng }
    }
}

impl DraftGenerator for TemplateDrafter {
    fn generate_draft(
        &self,
        profile: &AgentProfile,
        personality: &PersonalityState,
        content: &ContentItem,
        memory: &MemoryContext,
    ) -> Result<String, CollaboratorError> {
        let mood = Mood::of(personality);
        let hints = StyleHints::of(personality);
        let topic = text::key_terms(&content.full_text())
            .into_iter()
            .next()
            .or_else(|| profile.favorite_topic().map(String::from))
            .ok_or_else(|| CollaboratorError::Draft(format!("nothing to say about {}", content.id)))?;

        let mut parts: Vec<String> = Vec::new();
        self.rng.with(|rng| {
            if let Some(opener) = rng.choose(openers(mood)) {
                parts.push(opener.to_string());
            }
            if hints.length != ResponseLength::Brief {
                if let Some(line) = rng.choose(FOLLOW_UPS) {
                    parts.push(line.replace("{topic}", &topic));
                }
            }
            if hints.length == ResponseLength::Verbose {
                if let Some(similar) = memory.similar_memories.first() {
                    parts.push(format!("Reminds me of when {}", similar.content));
                }
            }
            if hints.frequent_humor && rng.gen_bool(0.5) {
                if let Some(line) = rng.choose(HUMOR_LINES) {
                    parts.push(line.to_string());
                }
            }
        });

        let draft = parts.join(" ");
        Ok(match hints.style {
            WritingStyle::Chaotic => format!("{}!!", draft.trim_end_matches('.')),
            WritingStyle::Formal => draft.replace("lol", "Amusing."),
            WritingStyle::Plain => draft,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_model::fixtures::{drained_personality, sample_feed, upbeat_personality};
    use agent_model::{Memory, MemoryKind};
    use chrono::Utc;

    fn drafter() -> TemplateDrafter {
        TemplateDrafter::new(Arc::new(SharedRng::seeded(3)))
    }

    #[test]
    fn test_tired_agents_write_brief_drafts() {
        let profile = AgentProfile::new("deep_thinker", "Deep Thinker");
        let item = &sample_feed()[2];
        let draft = drafter()
            .generate_draft(&profile, &drained_personality("deep_thinker"), item, &MemoryContext::default())
            .unwrap();
        assert!(!draft.is_empty());
        assert!(draft.split_whitespace().count() < 12);
    }

    #[test]
    fn test_verbose_drafts_use_memories() {
        let profile = AgentProfile::new("byte_wizard", "Byte Wizard").with_speech_pattern("Have you checked the logs?");
        let memory = MemoryContext {
            similar_memories: vec![Memory::new(MemoryKind::Interaction, "the docker build broke", Utc::now())],
            ..MemoryContext::default()
        };
        let item = &sample_feed()[0];
        let draft = drafter()
            .generate_draft(&profile, &upbeat_personality("byte_wizard"), item, &memory)
            .unwrap();
        assert!(draft.contains("Reminds me of when the docker build broke"));
        // Speech patterns are applied after drafting, not by the drafter.
        assert!(!draft.contains("Have you checked the logs?"));
    }

    #[test]
    fn test_empty_content_without_topics_fails() {
        let profile = AgentProfile::new("x", "X");
        let item = ContentItem::new("empty", "y", "", "", Utc::now());
        let result = drafter().generate_draft(
            &profile,
            &PersonalityState::new("x", Utc::now()),
            &item,
            &MemoryContext::default(),
        );
        assert!(matches!(result, Err(CollaboratorError::Draft(_))));
    }
}
