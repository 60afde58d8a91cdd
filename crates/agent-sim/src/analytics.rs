//! Analytics Collector
//!
//! Community, per-agent, sentiment and chaos reports built from the memory
//! logs and the moderation ledger. Every report is also written as pretty
//! JSON under the analytics root.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use agent_model::{Memory, MemoryKind};

use crate::clock::{Clock, SystemClock};
use crate::memory::MemoryStore;
use crate::moderation::ModerationEngine;
use crate::persist::write_json_atomic;

pub mod analytics_constants {
    /// Peak hours reported for the community
    pub const PEAK_HOURS: usize = 3;
    pub const TRENDING_TAGS: usize = 10;
    pub const FAVORITE_TAGS: usize = 5;
    /// Longest moving-average window
    pub const MAX_TREND_WINDOW: usize = 24;
    /// Most samples averaged at each end of the series to call a trend
    pub const TREND_EDGE: usize = 10;
    /// Difference between the two ends that counts as a trend
    pub const TREND_BAND: f32 = 0.1;
    /// Rolling chaos above this marks an agent as a chaos agent
    pub const CHAOS_AGENT_THRESHOLD: f32 = 60.0;
    pub const CHAOS_AGENTS: usize = 5;
    pub const CALM_BELOW: f32 = 20.0;
    pub const LIVELY_BELOW: f32 = 60.0;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityMetrics {
    pub timestamp: Option<DateTime<Utc>>,
    pub active_agents: usize,
    pub total_memories: usize,
    pub average_sentiment: f32,
    pub chaos_level: f32,
    pub peak_hours: Vec<u32>,
    pub trending_tags: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub agent_id: String,
    pub memory_count: usize,
    pub interactions: usize,
    pub average_sentiment: f32,
    pub favorite_tags: Vec<String>,
    /// Other agents by number of shared memories
    pub interaction_partners: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentTrend {
    pub timestamps: Vec<DateTime<Utc>>,
    pub sentiment_values: Vec<f32>,
    pub moving_average: Vec<f32>,
    /// Population standard deviation of the series
    pub volatility: f32,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosStatus {
    #[default]
    Calm,
    Lively,
    Chaotic,
}

impl ChaosStatus {
    pub fn of(score: f32) -> Self {
        use analytics_constants::*;
        if score < CALM_BELOW {
            ChaosStatus::Calm
        } else if score < LIVELY_BELOW {
            ChaosStatus::Lively
        } else {
            ChaosStatus::Chaotic
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChaosMetrics {
    pub timestamp: Option<DateTime<Utc>>,
    pub overall_chaos: f32,
    pub chaos_agents: Vec<String>,
    pub status: ChaosStatus,
}

pub struct AnalyticsCollector {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl AnalyticsCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist a report; failures are logged, never returned.
    fn write_report<T: Serialize>(&self, dir: &str, name: &str, report: &T) {
        let day = self.clock.now().format("%Y-%m-%d");
        let path = self.root.join(dir).join(format!("{}_{}.json", name, day));
        match write_json_atomic(&path, report) {
            Ok(()) => debug!(path = %path.display(), "Wrote analytics report"),
            Err(e) => warn!(error = %e, "Failed to write analytics report"),
        }
    }

    pub fn collect_community_metrics(
        &self,
        memory: &MemoryStore,
        moderation: &ModerationEngine,
        days_back: i64,
    ) -> CommunityMetrics {
        let agents = memory.known_agents();
        let all: Vec<Memory> = agents
            .iter()
            .flat_map(|agent| memory.recent(agent, days_back, usize::MAX))
            .collect();

        let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
        let mut tags: HashMap<&str, usize> = HashMap::new();
        for m in &all {
            *hours.entry(m.timestamp.hour()).or_default() += 1;
            for tag in &m.tags {
                *tags.entry(tag.as_str()).or_default() += 1;
            }
        }

        let metrics = CommunityMetrics {
            timestamp: Some(self.clock.now()),
            active_agents: agents.len(),
            total_memories: all.len(),
            average_sentiment: mean(all.iter().map(|m| m.sentiment)),
            chaos_level: moderation.global_chaos_level(),
            peak_hours: top_counts(hours, analytics_constants::PEAK_HOURS)
                .into_iter()
                .map(|(hour, _)| hour)
                .collect(),
            trending_tags: top_counts(tags, analytics_constants::TRENDING_TAGS)
                .into_iter()
                .map(|(tag, n)| (tag.to_string(), n))
                .collect(),
        };
        self.write_report("metrics", "community", &metrics);
        metrics
    }

    pub fn collect_agent_metrics(&self, memory: &MemoryStore, agent_id: &str, days_back: i64) -> AgentMetrics {
        let memories = memory.recent(agent_id, days_back, usize::MAX);

        let mut tags: HashMap<&str, usize> = HashMap::new();
        let mut partners: HashMap<&str, usize> = HashMap::new();
        for m in &memories {
            for tag in &m.tags {
                *tags.entry(tag.as_str()).or_default() += 1;
            }
            for p in m.participants.iter().filter(|p| p.as_str() != agent_id) {
                *partners.entry(p.as_str()).or_default() += 1;
            }
        }

        let metrics = AgentMetrics {
            agent_id: agent_id.to_string(),
            memory_count: memories.len(),
            interactions: memories
                .iter()
                .filter(|m| m.kind == MemoryKind::Interaction)
                .count(),
            average_sentiment: mean(memories.iter().map(|m| m.sentiment)),
            favorite_tags: top_counts(tags, analytics_constants::FAVORITE_TAGS)
                .into_iter()
                .map(|(tag, _)| tag.to_string())
                .collect(),
            interaction_partners: top_counts(partners, usize::MAX)
                .into_iter()
                .map(|(p, n)| (p.to_string(), n))
                .collect(),
        };
        self.write_report("metrics", &format!("agent_{}", agent_id), &metrics);
        metrics
    }

    pub fn analyze_sentiment_trends(&self, memory: &MemoryStore, days_back: i64) -> SentimentTrend {
        let mut samples: Vec<(DateTime<Utc>, f32)> = memory
            .known_agents()
            .iter()
            .flat_map(|agent| memory.recent(agent, days_back, usize::MAX))
            .map(|m| (m.timestamp, m.sentiment))
            .collect();
        if samples.is_empty() {
            return SentimentTrend::default();
        }
        samples.sort_by(|a, b| a.0.cmp(&b.0));

        let (timestamps, values): (Vec<_>, Vec<_>) = samples.into_iter().unzip();
        let window = (values.len() / 4).clamp(1, analytics_constants::MAX_TREND_WINDOW);
        let moving_average = moving_average(&values, window);
        let trend = SentimentTrend {
            direction: trend_direction(&moving_average),
            volatility: std_dev(&values),
            timestamps,
            sentiment_values: values,
            moving_average,
        };
        self.write_report("trends", "sentiment", &trend);
        trend
    }

    pub fn chaos_metrics(&self, moderation: &ModerationEngine) -> ChaosMetrics {
        let mut offenders: Vec<(String, f32)> = moderation
            .scores()
            .into_iter()
            .filter(|s| s.chaos_score > analytics_constants::CHAOS_AGENT_THRESHOLD)
            .map(|s| (s.agent_id, s.chaos_score))
            .collect();
        offenders.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let overall = moderation.global_chaos_level();
        let metrics = ChaosMetrics {
            timestamp: Some(self.clock.now()),
            overall_chaos: overall,
            chaos_agents: offenders
                .into_iter()
                .take(analytics_constants::CHAOS_AGENTS)
                .map(|(agent, _)| agent)
                .collect(),
            status: ChaosStatus::of(overall),
        };
        self.write_report("chaos", "chaos", &metrics);
        metrics
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values.iter().copied());
    mean(values.iter().map(|v| (v - m).powi(2))).sqrt()
}

fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    if window == 0 || values.len() < window {
        return values.to_vec();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f32>() / window as f32)
        .collect()
}

/// Compare the mean of the first and last few averages. Each end covers at
/// most half the series.
fn trend_direction(moving_average: &[f32]) -> TrendDirection {
    use analytics_constants::{TREND_BAND, TREND_EDGE};

    if moving_average.len() < 2 {
        return TrendDirection::Stable;
    }
    let edge = (moving_average.len() / 2).clamp(1, TREND_EDGE);
    let older = mean(moving_average[..edge].iter().copied());
    let recent = mean(moving_average[moving_average.len() - edge..].iter().copied());
    if recent > older + TREND_BAND {
        TrendDirection::Rising
    } else if recent < older - TREND_BAND {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

/// Highest counts first, ties broken by key.
fn top_counts<K: Ord>(counts: impl IntoIterator<Item = (K, usize)>, limit: usize) -> Vec<(K, usize)> {
    let mut sorted: Vec<(K, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(limit);
    sorted
}
