//! One analysis run: tracker and analyzer driven frame by frame

use crate::domain::stats::MatchStats;
use crate::domain::types::{FrameDetections, TrackSnapshot};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::entity_tracker::EntityTracker;
use crate::services::match_analyzer::MatchAnalyzer;
use crate::services::side_classifier::{HsvBandClassifier, SideClassifier};
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Owns the per-session tracking and statistics state
pub struct AnalysisSession<C = HsvBandClassifier> {
    session_id: String,
    tracker: EntityTracker<C>,
    analyzer: MatchAnalyzer,
    metrics: Arc<Metrics>,
    /// Tracker view after the most recent frame
    last_snapshot: TrackSnapshot,
    frames_processed: u64,
}

impl AnalysisSession<HsvBandClassifier> {
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Self {
        Self::new(EntityTracker::from_config(config), MatchAnalyzer::from_config(config), metrics)
    }
}

impl<C: SideClassifier> AnalysisSession<C> {
    /// Wire both components to the shared metrics
    pub fn new(tracker: EntityTracker<C>, analyzer: MatchAnalyzer, metrics: Arc<Metrics>) -> Self {
        let session_id = Uuid::now_v7().to_string();
        info!(
            session_id = %session_id,
            patience = %tracker.patience(),
            assignment = %tracker.strategy().as_str(),
            pass_threshold = %analyzer.pass_distance_threshold(),
            "session_started"
        );
        Self {
            session_id,
            tracker: tracker.with_metrics(metrics.clone()),
            analyzer: analyzer.with_metrics(metrics.clone()),
            metrics,
            last_snapshot: TrackSnapshot::default(),
            frames_processed: 0,
        }
    }

    /// Run one frame through the tracker, then the analyzer if a ball was seen
    pub fn process_frame(
        &mut self,
        frame_index: u64,
        detections: &FrameDetections,
        frame: &RgbImage,
    ) -> &MatchStats {
        let start = Instant::now();

        self.last_snapshot = self.tracker.update(&detections.entities, frame);
        if let Some(ball) = detections.ball_position() {
            self.analyzer.update(frame_index, ball, &self.last_snapshot);
        }
        self.frames_processed += 1;

        self.metrics.record_frame_processed(start.elapsed().as_micros() as u64);
        self.analyzer.get_stats()
    }

    pub fn stats(&self) -> &MatchStats {
        self.analyzer.get_stats()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn snapshot(&self) -> &TrackSnapshot {
        &self.last_snapshot
    }

    pub fn tracker(&self) -> &EntityTracker<C> {
        &self.tracker
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{BoundingBox, EntityId, PerSide, Point, Side};
    use approx::assert_abs_diff_eq;

    fn by_x(_: &RgbImage, p: Point) -> Side {
        if p.x < 100 {
            Side::A
        } else {
            Side::B
        }
    }

    fn create_test_session() -> AnalysisSession<impl SideClassifier> {
        AnalysisSession::new(
            EntityTracker::new(5, by_x),
            MatchAnalyzer::new(20.0),
            Arc::new(Metrics::new()),
        )
    }

    fn ball_at(x: i32, y: i32) -> Option<BoundingBox> {
        Some(BoundingBox::new(x - 3, y - 3, x + 3, y + 3))
    }

    #[test]
    fn test_session_id_is_uuid() {
        let session = create_test_session();
        assert!(Uuid::parse_str(session.session_id()).is_ok());
    }

    #[test]
    fn test_frame_without_ball_only_tracks() {
        let mut session = create_test_session();
        let frame = RgbImage::new(0, 0);
        let players = vec![BoundingBox::new(0, 0, 20, 20), BoundingBox::new(200, 0, 220, 20)];

        let stats = session.process_frame(1, &FrameDetections::new(players, None), &frame).clone();

        assert_eq!(stats, MatchStats::default());
        assert_eq!(session.snapshot().len(), 2);
        assert_eq!(session.snapshot().side(EntityId(1)), Some(Side::B));
        assert_eq!(session.frames_processed(), 1);
        assert_eq!(session.metrics().frames_total(), 1);
    }

    #[test]
    fn test_ball_hop_between_players_counts_passes() {
        let mut session = create_test_session();
        let frame = RgbImage::new(0, 0);
        let players = vec![BoundingBox::new(0, 0, 20, 20), BoundingBox::new(200, 0, 220, 20)];

        let balls = [ball_at(12, 12), ball_at(208, 12), ball_at(210, 12), ball_at(10, 10)];
        for (i, ball) in balls.into_iter().enumerate() {
            session.process_frame(i as u64 + 1, &FrameDetections::new(players.clone(), ball), &frame);
        }

        let stats = session.stats();
        assert_eq!(stats.passes, PerSide::new(1, 1));
        assert_abs_diff_eq!(stats.possession.a, 0.5);
        assert_abs_diff_eq!(stats.ball_distance, 196.0 + 2.0 + 200.0_f64.hypot(2.0));
        assert_eq!(session.metrics().pass_events(), 2);
    }

    #[test]
    fn test_ball_without_players_accrues_distance() {
        let mut session = create_test_session();
        let frame = RgbImage::new(0, 0);

        session.process_frame(1, &FrameDetections::new(vec![], ball_at(0, 0)), &frame);
        session.process_frame(2, &FrameDetections::new(vec![], ball_at(30, 40)), &frame);

        assert_abs_diff_eq!(session.stats().ball_distance, 50.0);
        assert_eq!(session.stats().total_passes(), 0);
    }
}
