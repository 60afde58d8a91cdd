//! Drift Influence
//!
//! Ephemeral record of one personality change, written to the influence log
//! for auditing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::personality::TraitId;

/// What caused a drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    Interaction,
    Incident,
    TimeDecay,
    Relationship,
}

impl DriftKind {
    /// Incidents hit twice as hard as ordinary interactions.
    pub fn multiplier(self) -> f32 {
        match self {
            DriftKind::Incident => 2.0,
            _ => 1.0,
        }
    }
}

/// A set of signed trait deltas with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftInfluence {
    pub kind: DriftKind,
    /// Interaction or incident type that produced the deltas
    pub label: String,
    pub magnitude: f32,
    pub deltas: BTreeMap<TraitId, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DriftInfluence {
    pub fn new(kind: DriftKind, label: impl Into<String>, magnitude: f32, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            label: label.into(),
            magnitude,
            deltas: BTreeMap::new(),
            source_agent: None,
            timestamp,
        }
    }

    /// Builder: add a delta. Deltas for the same trait accumulate.
    pub fn with_delta(mut self, id: TraitId, delta: f32) -> Self {
        *self.deltas.entry(id).or_insert(0.0) += delta;
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source_agent = source;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.values().all(|d| *d == 0.0)
    }
}
