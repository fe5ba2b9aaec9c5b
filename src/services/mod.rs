//! Services - tracking and statistics logic
//!
//! This module contains the core services:
//! - `assignment` - Track-to-detection matching strategies
//! - `side_classifier` - Kit color side classification
//! - `entity_tracker` - Stable entity identities across frames
//! - `match_analyzer` - Pass, possession and distance statistics
//! - `session` - Per-run orchestration of tracker and analyzer
//! - `pipeline` - Detections-to-egress run loop used by the CLI

pub mod assignment;
pub mod entity_tracker;
pub mod match_analyzer;
pub mod pipeline;
pub mod session;
pub mod side_classifier;

// Re-export commonly used types
pub use assignment::AssignmentStrategy;
pub use entity_tracker::EntityTracker;
pub use match_analyzer::MatchAnalyzer;
pub use pipeline::{run_detections, RunSummary};
pub use session::AnalysisSession;
pub use side_classifier::{HsvBandClassifier, SideClassifier};
