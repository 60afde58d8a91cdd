//! Personality drift: storage, lookup tables, the engine and derived moods.

pub mod engine;
pub mod mood;
pub mod store;
pub mod tables;

pub use engine::{drift_velocity, DriftEngine};
pub use mood::{Mood, ResponseLength, StyleHints, WritingStyle};
pub use store::TraitStore;
