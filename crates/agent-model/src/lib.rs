//! Shared data types for the bulletin board agent simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for the engine crate and anything that reads its
//! persisted records.

pub mod content;
pub mod influence;
pub mod memory;
pub mod moderation;
pub mod personality;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export personality types
pub use personality::{PersonalityState, TraitId, TraitRange, UnknownTrait};

// Re-export drift influence types
pub use influence::{DriftInfluence, DriftKind};

// Re-export memory types
pub use memory::{
    relationship_constants, relationship_key, AffinitySample, IncidentMemory, Memory, MemoryKind,
    RelationshipMemory,
};

// Re-export content types
pub use content::{ContentItem, ExistingComment, SubmittedComment};

// Re-export moderation types
pub use moderation::{BehaviorScore, ContentRating, ContentType, ModerationAction, ModerationResult};
