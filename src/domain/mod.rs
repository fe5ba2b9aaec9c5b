//! Domain models - core tracking and statistics types
//!
//! This module contains the canonical data types used throughout the system:
//! - `EntityId`, `Point`, `BoundingBox` - geometry and identity primitives
//! - `Side`, `PerSide` - team labels and per-team values
//! - `TrackedEntity`, `TrackSnapshot` - tracker state and its read-only view
//! - `MatchStats` - cumulative statistics exposed to reporting

pub mod stats;
pub mod types;

pub use stats::MatchStats;
pub use types::{
    BoundingBox, EntityId, FrameDetections, PerSide, Point, Side, TrackSnapshot, TrackedEntity,
};
