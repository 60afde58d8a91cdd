//! Memory Store
//!
//! Episodic memories per agent, shared incidents, and pairwise
//! relationships, all persisted as plain text under one root.

pub mod episodic;
pub mod incidents;
pub mod index;
pub mod relationships;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use agent_model::{IncidentMemory, Memory, MemoryKind, RelationshipMemory};

use crate::clock::{Clock, SystemClock};
use crate::config::MemoryConfig;
use crate::error::StoreError;
use crate::text::key_terms;

pub use episodic::EpisodicLog;
pub use incidents::IncidentStore;
pub use index::{IndexedMemory, KeywordIndex};
pub use relationships::{RelationshipStore, RelationshipUpdate};

pub struct MemoryStore {
    root: PathBuf,
    config: MemoryConfig,
    episodes: EpisodicLog,
    incidents: IncidentStore,
    relationships: RelationshipStore,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>, config: MemoryConfig) -> Self {
        let root = root.into();
        Self {
            episodes: EpisodicLog::new(root.join("agents")),
            incidents: IncidentStore::new(root.join("incidents")),
            relationships: RelationshipStore::new(root.join("relationships")),
            root,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn store(&self, agent_id: &str, memory: &Memory) -> Result<(), StoreError> {
        self.episodes.append(agent_id, memory)
    }

    /// Memories matching every query token, newest first.
    pub fn search(
        &self,
        agent_id: &str,
        query: &str,
        kind: Option<MemoryKind>,
        days_back: i64,
    ) -> Vec<Memory> {
        self.episodes
            .search(agent_id, query, kind, days_back, self.clock.now())
    }

    /// The agent's most recent memories within the window.
    pub fn recent(&self, agent_id: &str, days_back: i64, limit: usize) -> Vec<Memory> {
        let mut memories = self.search(agent_id, "", None, days_back);
        memories.truncate(limit);
        memories
    }

    pub fn known_agents(&self) -> Vec<String> {
        self.episodes.known_agents()
    }

    pub fn store_incident(&self, incident: &IncidentMemory) -> Result<(), StoreError> {
        self.incidents.store(incident)
    }

    pub fn find_incident(&self, id_or_query: &str) -> Option<IncidentMemory> {
        self.incidents.find(id_or_query)
    }

    /// Bump an incident's reference count. `Ok(None)` when it does not exist.
    pub fn reference_incident(&self, id: &str) -> Result<Option<IncidentMemory>, StoreError> {
        self.incidents.reference(id)
    }

    pub fn incidents(&self) -> Vec<IncidentMemory> {
        self.incidents.all()
    }

    pub fn update_relationship(
        &self,
        agent_a: &str,
        agent_b: &str,
        sentiment: f32,
        extras: RelationshipUpdate<'_>,
    ) -> Result<RelationshipMemory, StoreError> {
        self.relationships
            .update(agent_a, agent_b, sentiment, extras, self.clock.now())
    }

    pub fn get_relationship(&self, agent_a: &str, agent_b: &str) -> Option<RelationshipMemory> {
        self.relationships.get(agent_a, agent_b)
    }

    pub fn relationships_for(&self, agent_id: &str) -> Vec<RelationshipMemory> {
        self.relationships.for_agent(agent_id)
    }

    /// Past memories that share the most frequent terms of `context`,
    /// ranked by importance then recency.
    pub fn find_similar_situations(&self, agent_id: &str, context: &str, limit: usize) -> Vec<Memory> {
        let terms = key_terms(context);
        let mut best: BTreeMap<(DateTime<Utc>, &'static str), Memory> = BTreeMap::new();

        for term in terms.iter().take(self.config.similar_term_count) {
            for memory in self.search(agent_id, term, None, self.config.similar_days_back) {
                let key = (memory.timestamp, memory.kind.as_str());
                match best.get(&key) {
                    Some(kept) if kept.importance >= memory.importance => {}
                    _ => {
                        best.insert(key, memory);
                    }
                }
            }
        }

        let mut similar: Vec<Memory> = best.into_values().collect();
        similar.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        similar.truncate(limit);
        similar
    }

    /// Delete episodic day-files older than `days_to_keep` days.
    pub fn cleanup_old_memories(&self, days_to_keep: i64) -> usize {
        let removed = self.episodes.cleanup(days_to_keep, self.clock.now());
        if removed > 0 {
            info!(removed, days_to_keep, "Cleaned up old memories");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone};
    use std::fs;
    use tempfile::tempdir;

    fn store_at(root: &Path, now: DateTime<Utc>) -> MemoryStore {
        MemoryStore::new(root, MemoryConfig::default()).with_clock(Arc::new(FixedClock::new(now)))
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_store_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), noon());
        assert!(store.search("byte_wizard", "docker", None, 30).is_empty());
        assert!(store.find_incident("nonexistent").is_none());
        assert!(store.get_relationship("a", "b").is_none());
        assert!(store.find_similar_situations("byte_wizard", "docker networking", 3).is_empty());
    }

    #[test]
    fn test_store_writes_day_bucket_and_search_finds_it() {
        let dir = tempdir().unwrap();
        let now = noon();
        let store = store_at(dir.path(), now);

        let memory = Memory::new(MemoryKind::Interaction, "Fixed the Docker networking issue", now)
            .with_sentiment(0.6)
            .with_tags(["docker"]);
        store.store("byte_wizard", &memory).unwrap();

        assert!(dir.path().join("agents/byte_wizard/2024-03-15.jsonl").exists());
        assert_eq!(store.search("byte_wizard", "dock", None, 7), vec![memory.clone()]);
        assert_eq!(store.search("byte_wizard", "docker", Some(MemoryKind::Learning), 7), vec![]);
        assert_eq!(store.known_agents(), vec!["byte_wizard".to_string()]);
    }

    #[test]
    fn test_index_is_rebuilt_from_disk() {
        let dir = tempdir().unwrap();
        let now = noon();
        {
            let store = store_at(dir.path(), now);
            store
                .store("a", &Memory::new(MemoryKind::Learning, "Kubernetes taught me patience", now))
                .unwrap();
        }
        let reopened = store_at(dir.path(), now);
        assert_eq!(reopened.search("a", "patience", None, 1).len(), 1);
    }

    #[test]
    fn test_search_respects_days_back_and_orders_newest_first() {
        let dir = tempdir().unwrap();
        let now = noon();
        let store = store_at(dir.path(), now);
        for days in [0, 5, 40] {
            let at = now - Duration::days(days);
            store
                .store("a", &Memory::new(MemoryKind::Interaction, format!("rust talk {}", days), at))
                .unwrap();
        }
        let found = store.search("a", "rust", None, 10);
        let contents: Vec<&str> = found.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["rust talk 0", "rust talk 5"]);
        assert_eq!(store.recent("a", 90, 1)[0].content, "rust talk 0");
    }

    #[test]
    fn test_validation_failures() {
        let dir = tempdir().unwrap();
        let now = noon();
        let store = store_at(dir.path(), now);
        let bad_sentiment = Memory::new(MemoryKind::Interaction, "x", now).with_sentiment(1.5);
        let bad_importance = Memory::new(MemoryKind::Interaction, "x", now).with_importance(-0.1);
        assert!(store.store("a", &bad_sentiment).unwrap_err().is_validation());
        assert!(store.store("a", &bad_importance).unwrap_err().is_validation());
        let ok = Memory::new(MemoryKind::Interaction, "x", now);
        assert!(store.store("../etc", &ok).unwrap_err().is_validation());
    }

    #[test]
    fn test_similar_situations_ranked_by_importance() {
        let dir = tempdir().unwrap();
        let now = noon();
        let store = store_at(dir.path(), now);
        store
            .store(
                "a",
                &Memory::new(MemoryKind::Interaction, "docker networking again", now - Duration::hours(2))
                    .with_importance(0.9),
            )
            .unwrap();
        store
            .store(
                "a",
                &Memory::new(MemoryKind::Interaction, "docker compose is fine", now - Duration::hours(1))
                    .with_importance(0.3),
            )
            .unwrap();
        store
            .store("a", &Memory::new(MemoryKind::Interaction, "unrelated lunch", now))
            .unwrap();

        let similar = store.find_similar_situations("a", "docker docker networking problems", 3);
        let contents: Vec<&str> = similar.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["docker networking again", "docker compose is fine"]);
    }

    #[test]
    fn test_cleanup_removes_old_days_and_skips_junk() {
        let dir = tempdir().unwrap();
        let now = noon();
        let store = store_at(dir.path(), now);
        store
            .store("a", &Memory::new(MemoryKind::Interaction, "ancient docker", now - Duration::days(100)))
            .unwrap();
        store
            .store("a", &Memory::new(MemoryKind::Interaction, "fresh docker", now))
            .unwrap();
        fs::write(dir.path().join("agents/a/notes.jsonl"), "junk").unwrap();

        assert_eq!(store.search("a", "docker", None, 365).len(), 2);
        assert_eq!(store.cleanup_old_memories(90), 1);
        assert_eq!(store.search("a", "docker", None, 365).len(), 1);
        assert!(dir.path().join("agents/a/notes.jsonl").exists());
    }

    #[test]
    fn test_relationship_is_symmetric() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path(), noon());
        store
            .update_relationship("byte_wizard", "meme_lord", 0.5, RelationshipUpdate::default())
            .unwrap();
        assert_eq!(
            store.get_relationship("byte_wizard", "meme_lord"),
            store.get_relationship("meme_lord", "byte_wizard")
        );
        assert_eq!(store.relationships_for("meme_lord").len(), 1);
    }
}
