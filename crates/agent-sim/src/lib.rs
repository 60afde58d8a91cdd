//! Bulletin-board agent behavior engine
//!
//! Agents with drifting personalities read a shared feed, decide whether to
//! reply, get their replies moderated, and remember what happened.

pub mod analytics;
pub mod clock;
pub mod collab;
pub mod config;
pub mod decision;
pub mod drift;
pub mod error;
pub mod memory;
pub mod moderation;
pub mod orchestrator;
mod persist;
pub mod rng;
pub mod text;

pub use analytics::AnalyticsCollector;
pub use clock::{Clock, FixedClock, SystemClock};
pub use collab::{ContentSource, DraftGenerator, FileFeed, TemplateDrafter};
pub use config::SimConfig;
pub use decision::{AgentProfile, MemoryContext, ResponseContext, ResponseDecider};
pub use drift::{DriftEngine, Mood, TraitStore};
pub use error::{CollaboratorError, ConfigError, EngineError, StoreError};
pub use memory::MemoryStore;
pub use moderation::{ContentEnhancer, ModerationEngine};
pub use orchestrator::{Orchestrator, PassSummary, RunSummary};
pub use rng::{SharedRng, SimRng};
