//! Pairwise relationship records, one JSON file per unordered pair.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use agent_model::{relationship_key, RelationshipMemory};

use crate::persist::validate_id;
use crate::error::StoreError;
use crate::persist::{read_json, read_json_lenient, write_json_atomic};

/// Optional extras recorded alongside one interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipUpdate<'a> {
    pub shared_incident: Option<&'a str>,
    pub inside_joke: Option<&'a str>,
}

pub struct RelationshipStore {
    root: PathBuf,
    pair_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RelationshipStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pair_locks: DashMap::new(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read-modify-write of one pair's record under that pair's lock.
    pub fn update(
        &self,
        agent_a: &str,
        agent_b: &str,
        sentiment: f32,
        extras: RelationshipUpdate<'_>,
        at: DateTime<Utc>,
    ) -> Result<RelationshipMemory, StoreError> {
        validate_id("agent id", agent_a)?;
        validate_id("agent id", agent_b)?;
        if agent_a == agent_b {
            return Err(StoreError::Validation(format!(
                "relationship requires two distinct agents, got {} twice",
                agent_a
            )));
        }
        if !(-1.0..=1.0).contains(&sentiment) {
            return Err(StoreError::Validation(format!(
                "sentiment {} outside [-1, 1]",
                sentiment
            )));
        }

        let key = relationship_key(agent_a, agent_b);
        let lock = self.lock_for(&key);
        let _guard = lock.lock();

        let path = self.path(&key);
        let mut relationship =
            read_json::<RelationshipMemory>(&path)?.unwrap_or_else(|| RelationshipMemory::new(agent_a, agent_b));
        relationship.record_interaction(sentiment, at);
        if let Some(incident) = extras.shared_incident {
            relationship.add_shared_incident(incident);
        }
        if let Some(joke) = extras.inside_joke {
            relationship.add_inside_joke(joke);
        }
        write_json_atomic(&path, &relationship)?;

        debug!(
            pair = %key,
            affinity = relationship.current_affinity(),
            interactions = relationship.interaction_count,
            "Updated relationship"
        );
        Ok(relationship)
    }

    pub fn get(&self, agent_a: &str, agent_b: &str) -> Option<RelationshipMemory> {
        if validate_id("agent id", agent_a).is_err() || validate_id("agent id", agent_b).is_err() {
            return None;
        }
        read_json_lenient(&self.path(&relationship_key(agent_a, agent_b)))
    }

    /// Every stored relationship involving `agent_id`.
    pub fn for_agent(&self, agent_id: &str) -> Vec<RelationshipMemory> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut found: Vec<RelationshipMemory> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| read_json_lenient::<RelationshipMemory>(&p))
            .filter(|r| r.other(agent_id).is_some())
            .collect();
        found.sort_by(|a, b| a.key().cmp(&b.key()));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pair_is_order_independent() {
        let dir = tempdir().unwrap();
        let store = RelationshipStore::new(dir.path());
        let now = Utc::now();
        store.update("meme_lord", "byte_wizard", 0.8, RelationshipUpdate::default(), now).unwrap();
        let rel = store.update("byte_wizard", "meme_lord", 0.8, RelationshipUpdate::default(), now).unwrap();

        assert_eq!(rel.interaction_count, 2);
        assert_eq!(rel.positive_interactions, 2);
        assert!((rel.current_affinity() - 0.16).abs() < 1e-6);
        assert!(dir.path().join("byte_wizard__meme_lord.json").exists());
        assert_eq!(store.get("meme_lord", "byte_wizard"), Some(rel));
    }

    #[test]
    fn test_pair_separator_in_ids_is_rejected() {
        let dir = tempdir().unwrap();
        let store = RelationshipStore::new(dir.path());
        let now = Utc::now();
        let err = store.update("a__b", "c", 0.5, RelationshipUpdate::default(), now).unwrap_err();
        assert!(err.is_validation());
        store.update("a", "b__c", 0.5, RelationshipUpdate::default(), now).unwrap_err();
        assert!(!dir.path().join("a__b__c.json").exists());
        assert!(store.get("a__b", "c").is_none());
    }

    #[test]
    fn test_extras_are_recorded() {
        let dir = tempdir().unwrap();
        let store = RelationshipStore::new(dir.path());
        let extras = RelationshipUpdate {
            shared_incident: Some("outage_1"),
            inside_joke: Some("That thing from March 3"),
        };
        store.update("a", "b", 0.0, extras, Utc::now()).unwrap();
        let rel = store.update("a", "b", 0.0, extras, Utc::now()).unwrap();
        assert_eq!(rel.shared_incidents, vec!["outage_1".to_string()]);
        assert_eq!(rel.inside_jokes.len(), 1);
    }

    #[test]
    fn test_validation() {
        let dir = tempdir().unwrap();
        let store = RelationshipStore::new(dir.path());
        let now = Utc::now();
        assert!(store.update("a", "a", 0.0, RelationshipUpdate::default(), now).unwrap_err().is_validation());
        assert!(store.update("a", "b", 1.5, RelationshipUpdate::default(), now).unwrap_err().is_validation());
        assert!(store.get("a", "b").is_none());
    }

    #[test]
    fn test_for_agent() {
        let dir = tempdir().unwrap();
        let store = RelationshipStore::new(dir.path());
        let now = Utc::now();
        store.update("a", "b", 0.5, RelationshipUpdate::default(), now).unwrap();
        store.update("c", "a", 0.5, RelationshipUpdate::default(), now).unwrap();
        store.update("b", "c", 0.5, RelationshipUpdate::default(), now).unwrap();
        let keys: Vec<String> = store.for_agent("a").iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["a__b".to_string(), "a__c".to_string()]);
    }
}
