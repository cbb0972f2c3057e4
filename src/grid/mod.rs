//! Grid construction and per-level position state
//!
//! A grid is an ordered set of unique price levels. Each level owns at most
//! one open lot (shares + cost basis). Levels live in a sorted vector with
//! binary-search lookup; prices are never used as map keys.

pub mod builder;
pub mod crossing;
pub mod state;

pub use builder::{build_levels, round_to_tick, step_from_atr, GridSpec};
pub use crossing::{classify, Crossing};
pub use state::{GridStore, LevelSlot};
