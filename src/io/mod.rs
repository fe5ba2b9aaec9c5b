//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `detections` - JSONL detector output reader with confidence filtering
//! - `frames` - Frame image loading for kit color sampling
//! - `egress` - Stats snapshot output to file (JSONL format)

pub mod detections;
pub mod egress;
pub mod frames;

// Re-export commonly used types
pub use detections::{DetectionFilter, DetectionFrame, DetectionRecord, DetectionSource};
pub use egress::{StatsEgress, StatsRecord};
pub use frames::load_frame;
