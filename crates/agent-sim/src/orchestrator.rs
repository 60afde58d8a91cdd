//! Behavior Orchestrator
//!
//! Drives the agents: each pass fetches recent content, lets every agent
//! decide whether to reply, pushes accepted replies through enhancement,
//! moderation and submission, and feeds the outcome back into memory,
//! relationships and personality drift. Periodic maintenance (analytics,
//! time drift, memory cleanup, simulated incidents) runs between passes.

use chrono::{DateTime, Duration, Timelike, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use agent_model::{
    ContentItem, ContentType, IncidentMemory, Memory, MemoryKind, ModerationAction, SubmittedComment,
};

use crate::analytics::AnalyticsCollector;
use crate::clock::Clock;
use crate::collab::{ContentSource, DraftGenerator};
use crate::config::SimConfig;
use crate::decision::{memory_adjusted_probability, MemoryContext, ResponseContext, ResponseDecider};
use crate::drift::{DriftEngine, TraitStore};
use crate::error::{CollaboratorError, ConfigError, EngineError};
use crate::memory::{MemoryStore, RelationshipUpdate};
use crate::moderation::{ContentEnhancer, ModerationEngine};
use crate::rng::SharedRng;
use crate::text;

/// Incidents the simulator can stage: (drift type, title, description).
const SIMULATED_INCIDENTS: [(&str, &str, &str); 4] = [
    ("system_crash", "The Great Database Meltdown", "Everything was on fire for 3 hours"),
    ("successful_collaboration", "The Epic Bug Hunt", "We found and fixed 47 bugs in one day"),
    ("meme_viral", "The Undefined Incident", "That meme broke the internet"),
    ("heated_debate", "Tabs vs Spaces War", "It got personal"),
];

const INCIDENT_LESSONS: [&str; 3] = ["Always have backups", "Communication is key", "Memes can be dangerous"];

const INCIDENT_REACTIONS: [&str; 3] = ["Good times.", "That was wild.", "Never forget."];

/// Content words that suggest a past incident is being referenced.
const INCIDENT_CUES: [&str; 2] = ["incident", "remember"];

/// Days of memories fed into periodic analytics.
const ANALYTICS_DAYS_BACK: i64 = 7;

/// Outcome of one pass over the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub items: usize,
    pub comments: usize,
}

/// Outcome of [`Orchestrator::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub failed_passes: u64,
    pub comments: usize,
}

#[derive(Debug, Clone, Copy)]
struct Schedule {
    last_analytics: DateTime<Utc>,
    last_time_drift: DateTime<Utc>,
    last_cleanup: DateTime<Utc>,
}

/// Per-agent activity counts within the current clock hour.
#[derive(Debug, Default)]
struct HourlyActivity {
    hour: Option<DateTime<Utc>>,
    counts: BTreeMap<ContentType, u32>,
}

pub struct Orchestrator {
    config: SimConfig,
    drift: DriftEngine,
    moderation: ModerationEngine,
    memory: MemoryStore,
    decider: ResponseDecider,
    analytics: AnalyticsCollector,
    enhancer: ContentEnhancer,
    source: Arc<dyn ContentSource>,
    drafter: Arc<dyn DraftGenerator>,
    rng: Arc<SharedRng>,
    clock: Arc<dyn Clock>,
    schedule: Mutex<Schedule>,
    activity: Mutex<BTreeMap<String, HourlyActivity>>,
}

impl Orchestrator {
    pub fn new(
        config: SimConfig,
        source: Arc<dyn ContentSource>,
        drafter: Arc<dyn DraftGenerator>,
        rng: Arc<SharedRng>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let storage = &config.storage;
        let drift = DriftEngine::new(
            TraitStore::new(&storage.personality_path),
            config.drift.clone(),
            rng.clone(),
        )
        .with_clock(clock.clone());
        let memory = MemoryStore::new(&storage.memory_path, config.memory.clone()).with_clock(clock.clone());
        let analytics = AnalyticsCollector::new(&storage.analytics_path).with_clock(clock.clone());
        let moderation = ModerationEngine::new(config.moderation.clone())?;
        let decider = ResponseDecider::new(&config.agents, rng.clone());

        for profile in &config.agents {
            if let Err(e) = drift.seed_baseline(&profile.agent_id, &profile.baseline_overrides()) {
                warn!(agent_id = %profile.agent_id, error = %e, "Failed to seed baseline");
            }
        }

        let now = clock.now();
        Ok(Self {
            config,
            drift,
            moderation,
            memory,
            decider,
            analytics,
            enhancer: ContentEnhancer::new(),
            source,
            drafter,
            rng,
            clock,
            schedule: Mutex::new(Schedule {
                last_analytics: now,
                last_time_drift: now,
                last_cleanup: now,
            }),
            activity: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn drift(&self) -> &DriftEngine {
        &self.drift
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn moderation(&self) -> &ModerationEngine {
        &self.moderation
    }

    pub fn analytics(&self) -> &AnalyticsCollector {
        &self.analytics
    }

    /// Loop until shutdown (Ctrl-C) or `max_passes` passes have run.
    /// Failed passes are logged and followed by a backoff.
    pub async fn run(&self, max_passes: Option<u64>) -> RunSummary {
        let scheduler = &self.config.scheduler;
        let mut summary = RunSummary::default();
        info!(agents = self.config.agents.len(), ?max_passes, "Orchestrator started");

        loop {
            let pause = match self.run_pass().await {
                Ok(pass) => {
                    info!(pass = summary.passes + 1, items = pass.items, comments = pass.comments, "Pass complete");
                    summary.comments += pass.comments;
                    scheduler.poll_interval_secs
                }
                Err(e) => {
                    error!(error = %e, "Pass failed");
                    summary.failed_passes += 1;
                    scheduler.error_backoff_secs
                }
            };
            summary.passes += 1;

            if max_passes.is_some_and(|max| summary.passes >= max) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_secs(pause)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        info!(passes = summary.passes, comments = summary.comments, "Orchestrator stopped");
        summary
    }

    /// Process one batch of recent content, then run any due maintenance.
    pub async fn run_pass(&self) -> Result<PassSummary, EngineError> {
        let scheduler = &self.config.scheduler;
        let timeout = std::time::Duration::from_secs(scheduler.fetch_timeout_secs);
        let mut items = tokio::time::timeout(timeout, self.source.fetch_recent_content())
            .await
            .map_err(|_| CollaboratorError::Timeout { operation: "fetch_recent_content" })??;
        items.truncate(scheduler.batch_size);

        let mut summary = PassSummary {
            items: items.len(),
            comments: 0,
        };
        for item in &items {
            summary.comments += self.process_item(item).await.len();
        }

        self.run_periodic_tasks();
        if scheduler.enable_incident_simulation && self.rng.gen_bool(scheduler.incident_probability) {
            self.simulate_incident();
        }
        Ok(summary)
    }

    /// Let every eligible agent react to one item concurrently, then update
    /// the relationships between everyone who replied.
    pub async fn process_item(&self, item: &ContentItem) -> Vec<SubmittedComment> {
        let agents: Vec<String> = self
            .config
            .agent_ids()
            .into_iter()
            .filter(|id| *id != item.author_id && !item.has_commented(id))
            .collect();

        let results = join_all(agents.iter().map(|agent_id| self.process_agent(item, agent_id))).await;
        let accepted: Vec<SubmittedComment> = results.into_iter().flatten().collect();

        self.update_relationships(&accepted);
        debug!(content_id = %item.id, candidates = agents.len(), replies = accepted.len(), "Item processed");
        accepted
    }

    async fn process_agent(&self, item: &ContentItem, agent_id: &str) -> Option<SubmittedComment> {
        let now = self.clock.now();
        let profile = self.decider.profile(agent_id);
        let personality = self.drift.current_state(agent_id);
        let recall = self.build_memory_context(agent_id, item);

        let context = ResponseContext::from_content(item, now.hour());
        let base = self.decider.response_probability(agent_id, &context);
        let probability =
            memory_adjusted_probability(base, agent_id, &recall, &personality, &self.config.decision);
        if !self.decider.decide(probability) {
            debug!(agent_id, content_id = %item.id, probability, "Agent passes");
            return None;
        }

        let draft = match self.drafter.generate_draft(&profile, &personality, item, &recall) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(agent_id, content_id = %item.id, error = %e, "Draft generation failed");
                return None;
            }
        };
        let topic = profile.favorite_topic();
        let mut body = self.rng.with(|rng| {
            let voiced = profile.apply_speech_patterns(&draft, rng);
            self.enhancer.enhance(&voiced, topic, rng)
        });
        self.decorate(agent_id, &mut body, &recall);

        if let Err(limit) = self.check_rate_limit(agent_id, now) {
            info!(agent_id, %limit, "Reply skipped");
            return None;
        }

        let verdict = self
            .moderation
            .moderate_at(&body, agent_id, ContentType::Comment, now);
        if !verdict.action.is_publishable() {
            info!(agent_id, content_id = %item.id, action = %verdict.action, reasons = ?verdict.reasons, "Reply withheld by moderation");
            if verdict.action == ModerationAction::Reject {
                let minutes = self.moderation.config().cooldown_minutes;
                self.moderation
                    .apply_cooldown_at(agent_id, minutes, "reply rejected by moderation", now);
            }
            return None;
        }
        if verdict.action == ModerationAction::Warn {
            warn!(agent_id, suggestions = ?verdict.suggestions, "Moderation warning");
        }
        let body = verdict.publishable_text(&body).to_string();

        let timeout = std::time::Duration::from_secs(self.config.scheduler.submit_timeout_secs);
        let comment = match tokio::time::timeout(timeout, self.source.submit_comment(&item.id, agent_id, &body, None)).await {
            Ok(Ok(comment)) => comment,
            Ok(Err(e)) => {
                warn!(agent_id, content_id = %item.id, error = %e, "Comment not accepted");
                return None;
            }
            Err(_) => {
                warn!(agent_id, content_id = %item.id, "Comment submission timed out");
                return None;
            }
        };
        self.record_activity(agent_id, now);

        self.remember_reply(agent_id, item, &comment);
        self.drift_from_reply(agent_id, &comment.body);
        info!(agent_id, content_id = %item.id, comment_id = %comment.id, "Replied");
        Some(comment)
    }

    /// Similar situations, a referenced incident, and relationships with the
    /// author and any agents mentioned in the content.
    fn build_memory_context(&self, agent_id: &str, item: &ContentItem) -> MemoryContext {
        let text = item.full_text();
        let similar_memories =
            self.memory
                .find_similar_situations(agent_id, &text, self.memory.config().similar_limit);

        let lowered = text.to_lowercase();
        let incident = if INCIDENT_CUES.iter().any(|cue| lowered.contains(cue)) {
            text::incident_search_terms(&text)
                .iter()
                .find_map(|term| self.memory.find_incident(term))
        } else {
            None
        };

        let known = self.config.agent_ids();
        let mut others: Vec<&String> = text::mentioned_agents(&text, &known, agent_id);
        if item.author_id != agent_id && !others.contains(&&item.author_id) {
            others.push(&item.author_id);
        }
        let relationships = others
            .into_iter()
            .filter_map(|other| self.memory.get_relationship(agent_id, other))
            .collect();

        MemoryContext {
            similar_memories,
            incident,
            relationships,
        }
    }

    /// Append an incident callback and, sometimes, a shared inside joke.
    fn decorate(&self, agent_id: &str, body: &mut String, recall: &MemoryContext) {
        if let Some(incident) = &recall.incident {
            let line = self.rng.with(|rng| {
                let reaction = rng.choose(&INCIDENT_REACTIONS).copied().unwrap_or("Never forget.");
                let templates = [
                    format!("Remember {}? {}", incident.title, reaction),
                    format!("This reminds me of {}...", incident.title),
                    format!("Like that time with {}, except...", incident.title),
                ];
                rng.choose(&templates).cloned().unwrap_or_default()
            });
            body.push_str("\n\n");
            body.push_str(&line);
            if let Err(e) = self.memory.reference_incident(&incident.id) {
                warn!(agent_id, incident = %incident.id, error = %e, "Failed to reference incident");
            }
        }

        let jokes: Vec<&String> = recall
            .relationships
            .iter()
            .flat_map(|r| r.inside_jokes.iter())
            .collect();
        let probability = self.config.scheduler.inside_joke_probability;
        let joke = self.rng.with(|rng| {
            if jokes.is_empty() || !rng.gen_bool(probability) {
                return None;
            }
            rng.choose(&jokes).map(|j| j.to_string())
        });
        if let Some(joke) = joke {
            body.push_str(&format!(" (Also: {})", joke));
        }
    }

    fn check_rate_limit(&self, agent_id: &str, now: DateTime<Utc>) -> Result<(), crate::moderation::RateLimitExceeded> {
        let mut counts = {
            let activity = self.activity.lock();
            activity
                .get(agent_id)
                .filter(|a| a.hour == hour_start(now))
                .map(|a| a.counts.clone())
                .unwrap_or_default()
        };
        *counts.entry(ContentType::Comment).or_default() += 1;
        self.moderation.check_rate_limits(agent_id, &counts)
    }

    fn record_activity(&self, agent_id: &str, now: DateTime<Utc>) {
        let mut activity = self.activity.lock();
        let entry = activity.entry(agent_id.to_string()).or_default();
        let hour = hour_start(now);
        if entry.hour != hour {
            entry.hour = hour;
            entry.counts.clear();
        }
        *entry.counts.entry(ContentType::Comment).or_default() += 1;
    }

    fn remember_reply(&self, agent_id: &str, item: &ContentItem, comment: &SubmittedComment) {
        let sentiment = text::sentiment(&comment.body);
        let known = self.config.agent_ids();
        let mentioned = text::mentioned_agents(&comment.body, &known, agent_id);

        let memory = Memory::new(
            MemoryKind::Interaction,
            format!(
                "Responded to post about: {}... with: {}...",
                truncate_chars(&item.title, 50),
                truncate_chars(&comment.body, 100)
            ),
            comment.created_at,
        )
        .with_sentiment(sentiment)
        .with_importance(reply_importance(&comment.body, sentiment))
        .with_tags(text::extract_tags(&format!("{} {}", item.full_text(), comment.body)))
        .with_participants(std::iter::once(agent_id).chain(mentioned.iter().map(|s| s.as_str())))
        .with_reference(item.id.clone());

        if let Err(e) = self.memory.store(agent_id, &memory) {
            warn!(agent_id, error = %e, "Failed to store interaction memory");
        }
    }

    fn drift_from_reply(&self, agent_id: &str, body: &str) {
        let class = text::classify_interaction(body);
        let known = self.config.agent_ids();
        let other = text::mentioned_agents(body, &known, agent_id)
            .into_iter()
            .next()
            .map(String::as_str);
        self.drift
            .apply_interaction(agent_id, class.as_str(), other, text::sentiment(body), class.intensity());
    }

    /// Pairwise relationship updates between everyone who replied to the
    /// same item.
    fn update_relationships(&self, comments: &[SubmittedComment]) {
        let now = self.clock.now();
        for (i, first) in comments.iter().enumerate() {
            for second in &comments[i + 1..] {
                if first.agent_id == second.agent_id {
                    continue;
                }
                let sentiment = (text::sentiment(&first.body) + text::sentiment(&second.body)) / 2.0;
                let laughed = |c: &SubmittedComment| c.body.to_lowercase().contains("lol");
                let joke = (laughed(first) && laughed(second))
                    .then(|| format!("That thing from {}", now.format("%B %d")));
                let extras = RelationshipUpdate {
                    shared_incident: None,
                    inside_joke: joke.as_deref(),
                };
                match self
                    .memory
                    .update_relationship(&first.agent_id, &second.agent_id, sentiment, extras)
                {
                    Ok(relationship) => {
                        let quality = relationship.current_affinity();
                        let count = relationship.interaction_count;
                        self.drift
                            .apply_relationship_influence(&first.agent_id, Some(&second.agent_id), quality, count);
                        self.drift
                            .apply_relationship_influence(&second.agent_id, Some(&first.agent_id), quality, count);
                    }
                    Err(e) => warn!(
                        a = %first.agent_id,
                        b = %second.agent_id,
                        error = %e,
                        "Failed to update relationship"
                    ),
                }
            }
        }
    }

    /// Run analytics, time drift and cleanup when their intervals have
    /// elapsed.
    pub fn run_periodic_tasks(&self) {
        let now = self.clock.now();
        let scheduler = &self.config.scheduler;
        let mut schedule = *self.schedule.lock();

        if now - schedule.last_analytics >= Duration::hours(scheduler.analytics_interval_hours) {
            self.run_analytics();
            schedule.last_analytics = now;
        }

        let since_drift = now - schedule.last_time_drift;
        if since_drift >= Duration::hours(scheduler.time_drift_interval_hours) {
            let hours = since_drift.num_seconds() as f32 / 3600.0;
            for agent_id in self.all_agents() {
                self.drift.apply_time_drift(&agent_id, hours);
            }
            info!(hours, "Applied time drift");
            schedule.last_time_drift = now;
        }

        if now - schedule.last_cleanup >= Duration::hours(scheduler.cleanup_interval_hours) {
            self.memory.cleanup_old_memories(self.config.memory.retention_days);
            schedule.last_cleanup = now;
        }

        *self.schedule.lock() = schedule;
    }

    fn run_analytics(&self) {
        let community = self
            .analytics
            .collect_community_metrics(&self.memory, &self.moderation, ANALYTICS_DAYS_BACK);
        let chaos = self.analytics.chaos_metrics(&self.moderation);
        let trend = self.analytics.analyze_sentiment_trends(&self.memory, ANALYTICS_DAYS_BACK);
        for agent_id in self.all_agents() {
            self.analytics
                .collect_agent_metrics(&self.memory, &agent_id, ANALYTICS_DAYS_BACK);
        }
        let health = self.moderation.community_health_at(self.clock.now());
        info!(
            memories = community.total_memories,
            chaos = chaos.overall_chaos,
            status = ?chaos.status,
            trend = ?trend.direction,
            health = ?health.status,
            "Analytics collected"
        );
    }

    /// Configured agents plus any that only exist in storage.
    fn all_agents(&self) -> Vec<String> {
        let mut agents = self.config.agent_ids();
        for agent in self.drift.known_agents() {
            if !agents.contains(&agent) {
                agents.push(agent);
            }
        }
        agents
    }

    /// Stage a community incident for a random handful of agents.
    pub fn simulate_incident(&self) -> Option<IncidentMemory> {
        let now = self.clock.now();
        let agents = self.config.agent_ids();
        let count = self.config.scheduler.incident_participants.min(agents.len());

        let (kind, title, description, participants, suffix) = self.rng.with(|rng| {
            let (kind, title, description) = *rng.choose(&SIMULATED_INCIDENTS)?;
            let participants: Vec<String> = rng.sample(&agents, count).into_iter().cloned().collect();
            let suffix = rng.gen_range(0.0, 1.0e6) as u32;
            Some((kind, title, description, participants, suffix))
        })?;

        let incident = IncidentMemory::new(
            format!("incident_{}_{:06}", now.format("%Y%m%d_%H%M%S"), suffix),
            title,
            description,
            now,
        )
        .with_participants(participants.iter().cloned())
        .with_outcome("Chaos ensued, lessons were learned");
        let incident = INCIDENT_LESSONS
            .iter()
            .fold(incident, |incident, lesson| incident.with_lesson(*lesson));

        if let Err(e) = self.memory.store_incident(&incident) {
            warn!(incident = %incident.id, error = %e, "Failed to store incident");
            return None;
        }

        for agent_id in &participants {
            let impact = self.rng.with(|rng| rng.gen_range(0.3, 0.8));
            self.drift.apply_incident(agent_id, kind, impact);

            let memory = Memory::new(MemoryKind::Incident, format!("{}: {}", title, description), now)
                .with_importance(0.8)
                .with_participants(participants.iter().cloned())
                .with_reference(incident.id.clone());
            if let Err(e) = self.memory.store(agent_id, &memory) {
                warn!(agent_id, error = %e, "Failed to store incident memory");
            }
        }
        for (i, first) in participants.iter().enumerate() {
            for second in &participants[i + 1..] {
                let extras = RelationshipUpdate {
                    shared_incident: Some(&incident.id),
                    inside_joke: None,
                };
                if let Err(e) = self.memory.update_relationship(first, second, 0.0, extras) {
                    warn!(a = %first, b = %second, error = %e, "Failed to record shared incident");
                }
            }
        }

        info!(incident = %incident.id, title, ?participants, "Simulated incident");
        Some(incident)
    }
}

fn hour_start(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    at.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

/// Emotional and long replies matter more.
fn reply_importance(body: &str, sentiment: f32) -> f32 {
    let mut importance = 0.5 + sentiment.abs() * 0.2;
    if body.chars().count() > 200 {
        importance += 0.1;
    }
    importance.min(1.0)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
