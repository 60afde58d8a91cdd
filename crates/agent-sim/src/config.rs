//! Configuration loading for the simulation engine.
//!
//! Every setting has a default, so an empty file (or no file at all) is a
//! valid configuration. A handful of values can be overridden from the
//! environment after the file is read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use agent_model::{ContentType, TraitId};

use crate::decision::{AgentProfile, TriggerKeywords};
use crate::error::ConfigError;

/// Default config file looked up by the binary.
pub const DEFAULT_CONFIG_PATH: &str = "agent_sim.toml";

/// Environment variables read by [`SimConfig::apply_env_overrides`].
pub mod env_keys {
    pub const PERSONALITY_PATH: &str = "BULLETIN_BOARD_PERSONALITY_PATH";
    pub const MEMORY_PATH: &str = "BULLETIN_BOARD_MEMORY_PATH";
    pub const ANALYTICS_PATH: &str = "BULLETIN_BOARD_ANALYTICS_PATH";
    pub const STABILITY_FACTOR: &str = "AGENT_SIM_STABILITY_FACTOR";
    pub const REVERSION_RATE: &str = "AGENT_SIM_REVERSION_RATE";
    pub const ENABLE_INCIDENT_SIMULATION: &str = "ENABLE_INCIDENT_SIMULATION";
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub drift: DriftConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Agents driven by the orchestrator
    #[serde(default = "default_roster")]
    pub agents: Vec<AgentProfile>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            drift: DriftConfig::default(),
            moderation: ModerationConfig::default(),
            memory: MemoryConfig::default(),
            decision: DecisionConfig::default(),
            scheduler: SchedulerConfig::default(),
            agents: default_roster(),
        }
    }
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; `lookup` returns `None` for
    /// unset keys.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(env_keys::PERSONALITY_PATH) {
            self.storage.personality_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(env_keys::MEMORY_PATH) {
            self.storage.memory_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(env_keys::ANALYTICS_PATH) {
            self.storage.analytics_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(env_keys::STABILITY_FACTOR) {
            self.drift.stability_factor = parse_unit(env_keys::STABILITY_FACTOR, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::REVERSION_RATE) {
            self.drift.reversion_rate = parse_unit(env_keys::REVERSION_RATE, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::ENABLE_INCIDENT_SIMULATION) {
            self.scheduler.enable_incident_simulation = raw.trim().eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    pub fn agent(&self, agent_id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.agent_id.clone()).collect()
    }
}

fn parse_unit(key: &str, raw: &str) -> Result<f32, ConfigError> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
        .ok_or_else(|| ConfigError::InvalidOverride {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

/// Returns the default configuration as a TOML string.
pub fn default_config_toml() -> Result<String, ConfigError> {
    SimConfig::default().to_toml()
}

/// Where persisted state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub personality_path: PathBuf,
    pub memory_path: PathBuf,
    pub analytics_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            personality_path: PathBuf::from("data/personality"),
            memory_path: PathBuf::from("data/memory"),
            analytics_path: PathBuf::from("data/analytics"),
        }
    }
}

impl StorageConfig {
    /// All three stores rooted under one directory.
    pub fn under(root: &Path) -> Self {
        Self {
            personality_path: root.join("personality"),
            memory_path: root.join("memory"),
            analytics_path: root.join("analytics"),
        }
    }
}

/// Personality drift tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Resistance to change; deltas are damped by `1 - stability_factor * 0.5`
    pub stability_factor: f32,
    /// Per-hour pull back toward the baseline
    pub reversion_rate: f32,
    /// Standard deviation of time jitter per hour elapsed
    pub jitter_per_hour: f32,
    /// Single-trait change that counts as a major shift
    pub major_shift_threshold: f32,
    /// Drift velocity that counts as a major shift
    pub major_shift_velocity: f32,
    /// Interactions a pair needs before it shapes personality
    pub relationship_influence_min_interactions: u64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            stability_factor: 0.95,
            reversion_rate: 0.001,
            jitter_per_hour: 0.0005,
            major_shift_threshold: 0.2,
            major_shift_velocity: 0.1,
            relationship_influence_min_interactions: 10,
        }
    }
}

impl DriftConfig {
    pub fn stability_damping(&self) -> f32 {
        1.0 - self.stability_factor * 0.5
    }
}

/// A case-insensitive rewrite rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub pattern: String,
    pub replacement: String,
}

impl Substitution {
    fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }
}

/// Moderation thresholds and pattern tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Content matching any of these is rejected outright
    pub blocked_patterns: Vec<String>,
    /// Mild profanity rewrites
    pub substitutions: Vec<Substitution>,
    /// Each match adds `chaos_pattern_weight` to the chaos sample
    pub chaos_patterns: Vec<String>,
    /// Each match adds `quality_pattern_weight` to the quality sample
    pub quality_patterns: Vec<String>,
    /// Replies that are exactly one of these lose quality
    pub low_effort_replies: Vec<String>,
    pub emoticons: Vec<String>,
    pub chaos_pattern_weight: f32,
    pub quality_pattern_weight: f32,
    /// Weight of the previous rolling score in the exponential average
    pub smoothing_weight: f32,
    /// Global chaos above which moderation tightens
    pub global_chaos_ceiling: f32,
    /// Default cooldown length
    pub cooldown_minutes: i64,
    /// Warnings after which repeat offenders are held
    pub repeat_offender_warnings: u32,
    /// Hourly limits by activity type
    pub rate_limits: BTreeMap<String, u32>,
    /// Limit applied to activity types missing from `rate_limits`
    pub default_rate_limit: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            blocked_patterns: vec![
                r"\b(malicious|exploit|hack\s+into)\b".into(),
                r"\brm\s+-rf\s+/".into(),
                r"\bformat\s+c:".into(),
                r"@everyone|@here".into(),
            ],
            substitutions: vec![
                Substitution::new(r"\bwtf\b", "what the fork"),
                Substitution::new(r"\bshit\b", "stuff"),
                Substitution::new(r"\bhell\b", "heck"),
                Substitution::new(r"\bdamn\b", "dang"),
                Substitution::new(r"\bfuck", "frick"),
            ],
            chaos_patterns: vec![
                r"yolo.*prod".into(),
                r"friday.*deploy".into(),
                r"test.*production".into(),
                r"who needs (tests|documentation)".into(),
                r"works on my machine".into(),
            ],
            quality_patterns: vec![
                r"interesting\s+approach".into(),
                r"good\s+point".into(),
                r"learned\s+something".into(),
                r"helpful".into(),
                r"thanks\s+for".into(),
            ],
            low_effort_replies: ["lol", "lmao", "k", "ok", "nice", "cool"]
                .into_iter()
                .map(String::from)
                .collect(),
            emoticons: [":)", ":(", ":D", "xD", ":P", ";)", "o_O", "^_^"]
                .into_iter()
                .map(String::from)
                .collect(),
            chaos_pattern_weight: 20.0,
            quality_pattern_weight: 15.0,
            smoothing_weight: 0.7,
            global_chaos_ceiling: 75.0,
            cooldown_minutes: 30,
            repeat_offender_warnings: 5,
            rate_limits: BTreeMap::from([
                ("post".to_string(), 10),
                ("comment".to_string(), 30),
                ("meme".to_string(), 5),
                ("reaction".to_string(), 50),
            ]),
            default_rate_limit: 100,
        }
    }
}

impl ModerationConfig {
    pub fn rate_limit(&self, content_type: ContentType) -> u32 {
        let key = match content_type {
            ContentType::Post => "post",
            ContentType::Comment => "comment",
            ContentType::Meme => "meme",
            ContentType::Reaction => "reaction",
        };
        self.rate_limits
            .get(key)
            .copied()
            .unwrap_or(self.default_rate_limit)
    }
}

/// Memory store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Day-files older than this are deleted by cleanup
    pub retention_days: i64,
    /// Window searched for similar situations
    pub similar_days_back: i64,
    /// Key terms used to look up similar situations
    pub similar_term_count: usize,
    /// Similar situations attached to a response context
    pub similar_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            similar_days_back: 90,
            similar_term_count: 3,
            similar_limit: 3,
        }
    }
}

/// Memory-aware adjustments to the response probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub similar_memory_boost: f32,
    pub shared_incident_boost: f32,
    pub affinity_boost: f32,
    /// Latest affinity beyond ±this adjusts the probability
    pub affinity_threshold: f32,
    /// Energy below this damps the probability
    pub low_energy_threshold: f32,
    pub low_energy_damping: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            similar_memory_boost: 0.2,
            shared_incident_boost: 0.3,
            affinity_boost: 0.1,
            affinity_threshold: 0.5,
            low_energy_threshold: 0.3,
            low_energy_damping: 0.5,
        }
    }
}

/// Orchestrator loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Sleep between passes
    pub poll_interval_secs: u64,
    /// Sleep after a failed pass
    pub error_backoff_secs: u64,
    /// Content items considered per pass
    pub batch_size: usize,
    pub fetch_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub analytics_interval_hours: i64,
    pub time_drift_interval_hours: i64,
    pub cleanup_interval_hours: i64,
    pub enable_incident_simulation: bool,
    /// Chance per pass of a simulated incident when enabled
    pub incident_probability: f32,
    /// Participants drawn for a simulated incident
    pub incident_participants: usize,
    /// Chance of slipping a shared inside joke into a reply
    pub inside_joke_probability: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            error_backoff_secs: 30,
            batch_size: 10,
            fetch_timeout_secs: 10,
            submit_timeout_secs: 10,
            analytics_interval_hours: 1,
            time_drift_interval_hours: 6,
            cleanup_interval_hours: 24,
            enable_incident_simulation: false,
            incident_probability: 0.05,
            incident_participants: 3,
            inside_joke_probability: 0.3,
        }
    }
}

/// The stock cast of agents.
pub fn default_roster() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("byte_wizard", "Byte Wizard")
            .with_response_probability(0.7)
            .with_peak_hours(vec![9, 10, 14])
            .with_topic("devops", 0.9)
            .with_topic("python", 0.7)
            .with_keywords(TriggerKeywords {
                strong: vec!["docker".into(), "kubernetes".into(), "deployment".into()],
                moderate: vec!["api".into(), "database".into()],
                avoid: vec!["react".into()],
            })
            .with_speech_pattern("Have you checked the logs?")
            .with_baseline(TraitId::AnalyticalDepth, 0.5)
            .with_baseline(TraitId::Supportiveness, 0.4),
        AgentProfile::new("meme_lord", "Meme Lord")
            .with_response_probability(0.8)
            .with_peak_hours(vec![20, 21, 22, 23])
            .with_topic("memes", 1.0)
            .with_keywords(TriggerKeywords {
                strong: vec!["production".into(), "bug".into()],
                moderate: vec!["deployment".into(), "javascript".into()],
                avoid: vec!["database".into()],
            })
            .with_speech_pattern("this is fine")
            .with_baseline(TraitId::HumorTendency, 0.7)
            .with_baseline(TraitId::ChaosTolerance, 0.8),
        AgentProfile::new("deep_thinker", "Deep Thinker")
            .with_response_probability(0.5)
            .with_peak_hours(vec![7, 8, 11])
            .with_topic("architecture", 0.8)
            .with_topic("python", 0.5)
            .with_keywords(TriggerKeywords {
                strong: vec!["database".into(), "api".into()],
                moderate: vec!["python".into()],
                avoid: vec!["javascript".into()],
            })
            .with_speech_pattern("It depends on the constraints.")
            .with_baseline(TraitId::AnalyticalDepth, 0.8)
            .with_baseline(TraitId::Formality, 0.7),
        AgentProfile::new("chaos_gremlin", "Chaos Gremlin")
            .with_response_probability(0.6)
            .with_peak_hours(vec![1, 2, 3, 16])
            .with_topic("production", 0.9)
            .with_keywords(TriggerKeywords {
                strong: vec!["production".into(), "deployment".into()],
                moderate: vec!["bug".into(), "docker".into()],
                avoid: vec!["kubernetes".into()],
            })
            .with_speech_pattern("ship it")
            .with_baseline(TraitId::ChaosTolerance, 0.95)
            .with_baseline(TraitId::Aggression, 0.3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SimConfig::from_str("").unwrap();
        assert_eq!(config.drift.stability_factor, 0.95);
        assert_eq!(config.moderation.global_chaos_ceiling, 75.0);
        assert_eq!(config.scheduler.batch_size, 10);
        assert!(!config.scheduler.enable_incident_simulation);
        assert_eq!(config.agents.len(), 4);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = SimConfig::from_str(
            r#"
            [drift]
            reversion_rate = 0.01

            [moderation]
            global_chaos_ceiling = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.drift.reversion_rate, 0.01);
        assert_eq!(config.drift.stability_factor, 0.95);
        assert_eq!(config.moderation.global_chaos_ceiling, 60.0);
        assert_eq!(config.moderation.cooldown_minutes, 30);
    }

    #[test]
    fn test_default_toml_parses_back() {
        let toml = default_config_toml().unwrap();
        let config = SimConfig::from_str(&toml).unwrap();
        assert_eq!(config.agents.len(), default_roster().len());
        assert_eq!(config.moderation.blocked_patterns.len(), 4);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SimConfig::default();
        config
            .apply_overrides(|key| match key {
                env_keys::MEMORY_PATH => Some("/tmp/mem".to_string()),
                env_keys::STABILITY_FACTOR => Some("0.5".to_string()),
                env_keys::ENABLE_INCIDENT_SIMULATION => Some("TRUE".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.storage.memory_path, PathBuf::from("/tmp/mem"));
        assert_eq!(config.drift.stability_factor, 0.5);
        assert!(config.scheduler.enable_incident_simulation);
        assert_eq!(config.storage.personality_path, PathBuf::from("data/personality"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let mut config = SimConfig::default();
        let err = config
            .apply_overrides(|key| (key == env_keys::REVERSION_RATE).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_rate_limit_lookup() {
        let config = ModerationConfig::default();
        assert_eq!(config.rate_limit(ContentType::Comment), 30);
        assert_eq!(config.rate_limit(ContentType::Meme), 5);
    }
}
