//! Community-standards moderation with adaptive, per-agent leniency.

pub mod engine;
pub mod enhancer;
pub mod ledger;
pub mod scoring;

pub use engine::{
    CommunityHealth, HealthStatus, ModerationEngine, RateLimitExceeded, SUGGEST_BREAK,
    SUGGEST_SUBSTANCE, SUGGEST_TONE_DOWN,
};
pub use enhancer::ContentEnhancer;
pub use ledger::CommunityLedger;
pub use scoring::PatternSet;
