//! Episodic Log
//!
//! Per-agent, per-day append-only JSONL files with a lazily built keyword
//! index per agent.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use agent_model::{Memory, MemoryKind};

use super::index::KeywordIndex;
use crate::persist::validate_id;
use crate::persist::ensure_parent;
use crate::error::StoreError;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct EpisodicLog {
    root: PathBuf,
    indexes: DashMap<String, Arc<Mutex<Option<KeywordIndex>>>>,
}

impl EpisodicLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            indexes: DashMap::new(),
        }
    }

    fn agent_dir(&self, agent_id: &str) -> PathBuf {
        self.root.join(agent_id)
    }

    fn day_path(&self, agent_id: &str, day: NaiveDate) -> PathBuf {
        self.agent_dir(agent_id)
            .join(format!("{}.jsonl", day.format(DAY_FORMAT)))
    }

    fn slot(&self, agent_id: &str) -> Arc<Mutex<Option<KeywordIndex>>> {
        self.indexes
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    pub fn append(&self, agent_id: &str, memory: &Memory) -> Result<(), StoreError> {
        validate_id("agent id", agent_id)?;
        if !(-1.0..=1.0).contains(&memory.sentiment) {
            return Err(StoreError::Validation(format!(
                "sentiment {} outside [-1, 1]",
                memory.sentiment
            )));
        }
        if !(0.0..=1.0).contains(&memory.importance) {
            return Err(StoreError::Validation(format!(
                "importance {} outside [0, 1]",
                memory.importance
            )));
        }

        let day = memory.timestamp.date_naive();
        let path = self.day_path(agent_id, day);
        let line = serde_json::to_string(memory).map_err(|e| StoreError::serialization(&path, e))?;

        let slot = self.slot(agent_id);
        let mut index = slot.lock();
        ensure_parent(&path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| StoreError::io(&path, e))?;

        if let Some(index) = index.as_mut() {
            index.insert(day, memory.clone());
        }
        debug!(agent_id, kind = %memory.kind, "Stored memory");
        Ok(())
    }

    /// Run `f` against the agent's index, loading it from disk on first use.
    fn with_index<R>(&self, agent_id: &str, f: impl FnOnce(&KeywordIndex) -> R) -> R {
        let slot = self.slot(agent_id);
        let mut guard = slot.lock();
        let index = guard.get_or_insert_with(|| self.load_index(agent_id));
        f(index)
    }

    fn load_index(&self, agent_id: &str) -> KeywordIndex {
        let mut index = KeywordIndex::new();
        for (day, path) in self.day_files(agent_id) {
            for memory in read_day(&path) {
                index.insert(day, memory);
            }
        }
        debug!(agent_id, memories = index.len(), "Built memory index");
        index
    }

    /// Day-files for an agent, oldest first. Malformed names are skipped.
    fn day_files(&self, agent_id: &str) -> Vec<(NaiveDate, PathBuf)> {
        let dir = self.agent_dir(agent_id);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut files: Vec<(NaiveDate, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .filter_map(|p| {
                let day = NaiveDate::parse_from_str(p.file_stem()?.to_str()?, DAY_FORMAT).ok()?;
                Some((day, p))
            })
            .collect();
        files.sort();
        files
    }

    /// Memories matching `query` from day buckets within `days_back` of
    /// `now`, newest first.
    pub fn search(
        &self,
        agent_id: &str,
        query: &str,
        kind: Option<MemoryKind>,
        days_back: i64,
        now: DateTime<Utc>,
    ) -> Vec<Memory> {
        if validate_id("agent id", agent_id).is_err() {
            return Vec::new();
        }
        let cutoff = (now - Duration::days(days_back.max(0))).date_naive();
        let mut found: Vec<Memory> = self.with_index(agent_id, |index| {
            index
                .query(query)
                .into_iter()
                .filter(|e| e.day >= cutoff)
                .filter(|e| kind.map_or(true, |k| e.memory.kind == k))
                .map(|e| e.memory.clone())
                .collect()
        });
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        found
    }

    /// Agents that have a memory directory.
    pub fn known_agents(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut agents: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(String::from))
            .collect();
        agents.sort();
        agents
    }

    /// Delete day-files older than the cutoff. Returns how many were removed.
    pub fn cleanup(&self, days_to_keep: i64, now: DateTime<Utc>) -> usize {
        let cutoff = (now - Duration::days(days_to_keep.max(0))).date_naive();
        let mut removed = 0;
        for agent_id in self.known_agents() {
            let slot = self.slot(&agent_id);
            let mut index = slot.lock();
            let mut touched = false;
            for (day, path) in self.day_files(&agent_id) {
                if day >= cutoff {
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        removed += 1;
                        touched = true;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old memories"),
                }
            }
            if touched {
                *index = None;
            }
        }
        removed
    }
}

/// Parse one day-file, skipping lines that fail to decode.
fn read_day(path: &Path) -> Vec<Memory> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open memory log");
            return Vec::new();
        }
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<Memory>(&line) {
            Ok(memory) => Some(memory),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping corrupt memory line");
                None
            }
        })
        .collect()
}
