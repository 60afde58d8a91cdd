//! Community incident records: one JSON file per incident plus an
//! `index.json` summary.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use agent_model::IncidentMemory;

use crate::error::StoreError;
use crate::persist::{read_json, read_json_lenient, write_json_atomic};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    title: String,
    timestamp: DateTime<Utc>,
    participants: Vec<String>,
    reference_count: u64,
}

impl From<&IncidentMemory> for IndexEntry {
    fn from(incident: &IncidentMemory) -> Self {
        Self {
            title: incident.title.clone(),
            timestamp: incident.timestamp,
            participants: incident.participants.clone(),
            reference_count: incident.reference_count,
        }
    }
}

pub struct IncidentStore {
    root: PathBuf,
    /// Serializes writers of incident files and the index
    write_lock: Mutex<()>,
}

impl IncidentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn incident_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn load_index(&self) -> BTreeMap<String, IndexEntry> {
        read_json_lenient(&self.index_path()).unwrap_or_default()
    }

    fn write(&self, incident: &IncidentMemory) -> Result<(), StoreError> {
        write_json_atomic(&self.incident_path(&incident.id), incident)?;
        let mut index = self.load_index();
        index.insert(incident.id.clone(), IndexEntry::from(incident));
        write_json_atomic(&self.index_path(), &index)
    }

    /// Persist an incident, replacing any record with the same id.
    pub fn store(&self, incident: &IncidentMemory) -> Result<(), StoreError> {
        validate_incident_id(&incident.id)?;
        let _guard = self.write_lock.lock();
        self.write(incident)?;
        debug!(id = %incident.id, title = %incident.title, "Stored incident");
        Ok(())
    }

    fn load(&self, id: &str) -> Option<IncidentMemory> {
        match read_json::<IncidentMemory>(&self.incident_path(id)) {
            Ok(found) => found,
            Err(e) => {
                warn!(id, error = %e, "Failed to read incident");
                None
            }
        }
    }

    /// All readable incident records, most recent first.
    pub fn all(&self) -> Vec<IncidentMemory> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut incidents: Vec<IncidentMemory> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_incident_file(p))
            .filter_map(|p| read_json_lenient(&p))
            .collect();
        incidents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        incidents
    }

    /// Exact id lookup, falling back to a case-insensitive text match that
    /// returns the most recent hit.
    pub fn find(&self, query: &str) -> Option<IncidentMemory> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if validate_incident_id(query).is_ok() && self.load_index().contains_key(query) {
            if let Some(incident) = self.load(query) {
                return Some(incident);
            }
        }

        let needle = query.to_lowercase();
        self.all().into_iter().find(|incident| matches_text(incident, &needle))
    }

    /// Increment the reference count of a stored incident.
    pub fn reference(&self, id: &str) -> Result<Option<IncidentMemory>, StoreError> {
        validate_incident_id(id)?;
        let _guard = self.write_lock.lock();
        let Some(mut incident) = read_json::<IncidentMemory>(&self.incident_path(id))? else {
            return Ok(None);
        };
        incident.reference_count += 1;
        self.write(&incident)?;
        Ok(Some(incident))
    }
}

fn is_incident_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        && path.file_stem().is_some_and(|stem| stem != "index")
}

fn matches_text(incident: &IncidentMemory, needle: &str) -> bool {
    let contains = |s: &str| s.to_lowercase().contains(needle);
    contains(&incident.title)
        || contains(&incident.description)
        || contains(&incident.outcome)
        || incident.participants.iter().any(|p| contains(p))
        || incident.lessons_learned.iter().any(|l| contains(l))
}

/// Incident ids become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_incident_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id != "index"
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Validation(format!("invalid incident id {:?}", id)))
    }
}
