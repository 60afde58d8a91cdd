//! Trait State Store
//!
//! One current and one baseline record per agent, plus append-only
//! history, influence and major-shift logs.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use agent_model::{DriftInfluence, PersonalityState, TraitId};

use crate::error::StoreError;
use crate::persist::{append_text, read_json_lenient, validate_id, write_json_atomic};

pub struct TraitStore {
    root: PathBuf,
}

impl TraitStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self, agent_id: &str) -> Result<PathBuf, StoreError> {
        validate_id("agent id", agent_id)?;
        Ok(self.root.join("states").join(format!("{}.json", agent_id)))
    }

    fn baseline_path(&self, agent_id: &str) -> Result<PathBuf, StoreError> {
        validate_id("agent id", agent_id)?;
        Ok(self.root.join("baselines").join(format!("{}.json", agent_id)))
    }

    fn history_path(&self, agent_id: &str, at: DateTime<Utc>) -> Result<PathBuf, StoreError> {
        validate_id("agent id", agent_id)?;
        Ok(self
            .root
            .join("history")
            .join(format!("{}_{}.md", agent_id, at.format("%Y-%m-%d"))))
    }

    fn influence_path(&self, agent_id: &str, at: DateTime<Utc>) -> Result<PathBuf, StoreError> {
        validate_id("agent id", agent_id)?;
        Ok(self
            .root
            .join("influences")
            .join(format!("{}_{}.jsonl", agent_id, at.format("%Y-%m-%d"))))
    }

    fn shifts_path(&self) -> PathBuf {
        self.root.join("major_shifts.md")
    }

    /// Current state, or `None` if the agent has never been stored, the
    /// record is unreadable, or the id is not a valid file name.
    pub fn load_state(&self, agent_id: &str) -> Option<PersonalityState> {
        read_record(&self.state_path(agent_id).ok()?)
    }

    pub fn load_baseline(&self, agent_id: &str) -> Option<PersonalityState> {
        read_record(&self.baseline_path(agent_id).ok()?)
    }

    pub fn save_state(&self, state: &PersonalityState) -> Result<(), StoreError> {
        write_json_atomic(&self.state_path(&state.agent_id)?, state)
    }

    pub fn save_baseline(&self, state: &PersonalityState) -> Result<(), StoreError> {
        write_json_atomic(&self.baseline_path(&state.agent_id)?, state)
    }

    /// Agents with a stored current state.
    pub fn known_agents(&self) -> Vec<String> {
        let dir = self.root.join("states");
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut agents: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                if path.extension()? != "json" {
                    return None;
                }
                path.file_stem()?.to_str().map(String::from)
            })
            .collect();
        agents.sort();
        agents
    }

    /// Append a human-readable snapshot to the agent's daily history.
    pub fn append_history(&self, state: &PersonalityState, cause: &str) -> Result<(), StoreError> {
        let path = self.history_path(&state.agent_id, state.last_updated)?;
        let mut entry = format!("\n## {} ({})\n\n", state.last_updated.to_rfc3339(), cause);
        entry.push_str("### Traits\n");
        for (id, value) in state.traits() {
            entry.push_str(&format!("- {}: {:+.3}\n", id, value));
        }
        entry.push_str("\n### Metadata\n");
        entry.push_str(&format!("- Total Interactions: {}\n", state.total_interactions));
        entry.push_str(&format!("- Drift Velocity: {:.4}\n", state.drift_velocity));
        if let Some(shift) = state.last_major_shift {
            entry.push_str(&format!("- Last Major Shift: {}\n", shift.to_rfc3339()));
        }
        entry.push_str("\n---\n");
        append_text(&path, &entry)
    }

    /// Append an influence to the agent's daily JSONL audit log.
    pub fn append_influence(&self, agent_id: &str, influence: &DriftInfluence) -> Result<(), StoreError> {
        let path = self.influence_path(agent_id, influence.timestamp)?;
        let json = serde_json::to_string(influence).map_err(|e| StoreError::serialization(&path, e))?;
        append_text(&path, &format!("{}\n", json))
    }

    /// Record a major shift with the traits that moved.
    pub fn append_major_shift(
        &self,
        before: &PersonalityState,
        after: &PersonalityState,
        trigger: &str,
    ) -> Result<(), StoreError> {
        validate_id("agent id", &after.agent_id)?;
        let mut entry = format!("\n## Major Shift: {}\n", after.agent_id);
        entry.push_str(&format!("**Timestamp**: {}\n", after.last_updated.to_rfc3339()));
        entry.push_str(&format!("**Triggered by**: {}\n\n### Changes\n", trigger));
        for id in TraitId::ALL {
            let (old, new) = (before.get(id), after.get(id));
            if (new - old).abs() > 0.05 {
                entry.push_str(&format!("- {}: {:.3} -> {:.3} ({:+.3})\n", id, old, new, new - old));
            }
        }
        entry.push_str("\n---\n");
        append_text(&self.shifts_path(), &entry)
    }
}

fn read_record(path: &Path) -> Option<PersonalityState> {
    let mut state: PersonalityState = read_json_lenient(path)?;
    state.normalize();
    Some(state)
}
