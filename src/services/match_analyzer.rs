//! Match statistics from ball and entity trajectories
//!
//! Each update accrues ball and per-entity distance, then infers a pass
//! whenever the ball jumped further than the configured threshold since the
//! previous frame. The entity nearest to the new ball position credits its
//! side with the pass, and possession is each side's share of all passes.

use crate::domain::stats::MatchStats;
use crate::domain::types::{EntityId, PerSide, Point, Side, TrackSnapshot};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Cumulative pass, possession and distance accounting for one session
pub struct MatchAnalyzer {
    /// Ball movement (pixels) above which a pass is inferred
    pass_distance_threshold: f64,
    pass_counts: PerSide<u32>,
    ball_distance_total: f64,
    entity_distance_total: BTreeMap<EntityId, f64>,
    last_ball_position: Option<Point>,
    last_entity_positions: FxHashMap<EntityId, Point>,
    /// Side credited with the most recent pass
    side_in_possession: Option<Side>,
    stats: MatchStats,
    metrics: Option<Arc<Metrics>>,
}

impl MatchAnalyzer {
    pub fn new(pass_distance_threshold: f64) -> Self {
        Self {
            pass_distance_threshold,
            pass_counts: PerSide::default(),
            ball_distance_total: 0.0,
            entity_distance_total: BTreeMap::new(),
            last_ball_position: None,
            last_entity_positions: FxHashMap::default(),
            side_in_possession: None,
            stats: MatchStats::default(),
            metrics: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pass_distance_threshold())
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Advance the statistics by one frame
    ///
    /// `entities` must carry a side for every id that has a position.
    pub fn update(&mut self, frame_index: u64, ball_position: Point, entities: &TrackSnapshot) {
        if let Some(ref m) = self.metrics {
            m.record_ball_frame();
        }

        let ball_step = self.last_ball_position.map(|prev| prev.distance(&ball_position));
        if let Some(step) = ball_step {
            self.ball_distance_total += step;
        }

        for (id, position) in &entities.positions {
            if let Some(prev) = self.last_entity_positions.get(id) {
                *self.entity_distance_total.entry(*id).or_insert(0.0) += prev.distance(position);
            }
        }

        if let Some(step) = ball_step.filter(|&s| s > self.pass_distance_threshold) {
            self.infer_pass(frame_index, ball_position, step, entities);
        }

        self.stats = MatchStats::compile(
            self.pass_counts,
            self.ball_distance_total,
            self.entity_distance_total.clone(),
        );

        self.last_ball_position = Some(ball_position);
        self.last_entity_positions.clear();
        self.last_entity_positions
            .extend(entities.positions.iter().map(|(id, p)| (*id, *p)));
    }

    /// Credit the side of the entity nearest to the ball with a pass
    fn infer_pass(&mut self, frame_index: u64, ball: Point, step: f64, entities: &TrackSnapshot) {
        let Some((receiver, side)) = nearest_entity(ball, entities) else {
            return;
        };

        self.pass_counts[side] += 1;
        let previous = self.side_in_possession.replace(side);
        let changed = previous.is_some_and(|p| p != side);

        info!(
            frame = %frame_index,
            entity_id = %receiver,
            side = %side,
            ball_step = format!("{:.1}", step),
            "pass_detected"
        );
        if changed {
            info!(frame = %frame_index, from = ?previous, to = %side, "possession_changed");
        }
        if let Some(ref m) = self.metrics {
            m.record_pass(changed);
        }
    }

    /// Latest compiled statistics
    pub fn get_stats(&self) -> &MatchStats {
        &self.stats
    }

    pub fn pass_distance_threshold(&self) -> f64 {
        self.pass_distance_threshold
    }
}

/// Closest entity to `ball`, first in id order on equal distance
fn nearest_entity(ball: Point, entities: &TrackSnapshot) -> Option<(EntityId, Side)> {
    let mut best: Option<(EntityId, Side, f64)> = None;
    for (id, position) in &entities.positions {
        let Some(side) = entities.side(*id) else {
            continue;
        };
        let dist = position.distance(&ball);
        if best.map_or(true, |(_, _, d)| dist < d) {
            best = Some((*id, side, dist));
        }
    }
    best.map(|(id, side, _)| (id, side))
}
