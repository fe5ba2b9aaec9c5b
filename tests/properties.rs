//! Property tests for tracking and statistics invariants

use image::RgbImage;
use match_analytics::domain::{BoundingBox, EntityId, Point, Side, TrackSnapshot};
use match_analytics::services::assignment::{AssignmentStrategy, DistanceMatrix};
use match_analytics::services::{EntityTracker, MatchAnalyzer};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn by_parity(_: &RgbImage, p: Point) -> Side {
    if p.x % 2 == 0 {
        Side::A
    } else {
        Side::B
    }
}

fn box_at(p: (i32, i32)) -> BoundingBox {
    BoundingBox::new(p.0 - 10, p.1 - 10, p.0 + 10, p.1 + 10)
}

fn point() -> impl Strategy<Value = (i32, i32)> {
    (0i32..1000, 0i32..1000)
}

fn players() -> TrackSnapshot {
    let mut snapshot = TrackSnapshot::default();
    for (i, (x, side)) in [(100, Side::A), (500, Side::B), (900, Side::A)].into_iter().enumerate() {
        snapshot.positions.insert(EntityId(i as u64), Point::new(x, 300));
        snapshot.sides.insert(EntityId(i as u64), side);
    }
    snapshot
}

proptest! {
    #[test]
    fn test_identity_stable_for_lone_entity(
        start in point(),
        steps in prop::collection::vec((-5i32..=5, -5i32..=5), 1..200),
    ) {
        let frame = RgbImage::new(0, 0);
        let mut tracker = EntityTracker::new(10, by_parity);
        let (mut x, mut y) = start;

        for (dx, dy) in steps {
            x += dx;
            y += dy;
            let snapshot = tracker.update(&[box_at((x, y))], &frame);
            prop_assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec![EntityId(0)]);
        }
    }

    #[test]
    fn test_registration_policy_and_id_monotonicity(
        frames in prop::collection::vec(prop::collection::vec(point(), 0..6), 1..40),
        patience in 0u32..4,
    ) {
        let frame = RgbImage::new(0, 0);
        let mut tracker = EntityTracker::new(patience, by_parity);
        let mut retired: BTreeSet<EntityId> = BTreeSet::new();

        for points in frames {
            let boxes: Vec<BoundingBox> = points.iter().copied().map(box_at).collect();
            let before: BTreeSet<EntityId> = tracker.entities().map(|e| e.id).collect();
            let next_before = tracker.next_id();

            let snapshot = tracker.update(&boxes, &frame);
            let after: BTreeSet<EntityId> = snapshot.ids().collect();

            if before.len() > boxes.len() {
                prop_assert_eq!(tracker.next_id(), next_before);
            }
            if boxes.is_empty() {
                prop_assert!(after.is_subset(&before));
            }
            prop_assert!(after.len() <= before.len() + boxes.len());
            prop_assert!(after.iter().all(|id| !retired.contains(id)));
            prop_assert!(tracker.entities().all(|e| e.missed_count <= patience));

            retired.extend(before.difference(&after).copied());
        }
    }

    #[test]
    fn test_assignment_is_one_to_one(
        tracks in prop::collection::vec(point(), 0..8),
        detections in prop::collection::vec(point(), 0..8),
    ) {
        let tracks: Vec<Point> = tracks.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        let detections: Vec<Point> = detections.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        let distances = DistanceMatrix::between(&tracks, &detections);

        for strategy in [AssignmentStrategy::Greedy, AssignmentStrategy::Optimal] {
            let assignment = strategy.solve(&distances);
            let rows: BTreeSet<usize> = assignment.matches.iter().map(|m| m.0).collect();
            let cols: BTreeSet<usize> = assignment.matches.iter().map(|m| m.1).collect();

            prop_assert_eq!(rows.len(), assignment.matches.len());
            prop_assert_eq!(cols.len(), assignment.matches.len());
            prop_assert_eq!(rows.len() + assignment.unmatched_tracks.len(), tracks.len());
            prop_assert_eq!(cols.len() + assignment.unmatched_detections.len(), detections.len());
        }
    }

    #[test]
    fn test_pass_conservation_and_possession_normalization(
        balls in prop::collection::vec(point(), 1..100),
        threshold in 1.0f64..200.0,
    ) {
        let entities = players();
        let mut analyzer = MatchAnalyzer::new(threshold);
        let mut expected_passes = 0u32;
        let mut expected_distance = 0.0f64;
        let mut previous: Option<Point> = None;
        let mut last_total = 0.0f64;

        for (i, (x, y)) in balls.into_iter().enumerate() {
            let ball = Point::new(x, y);
            if let Some(prev) = previous {
                let step = prev.distance(&ball);
                expected_distance += step;
                if step > threshold {
                    expected_passes += 1;
                }
            }
            previous = Some(ball);

            analyzer.update(i as u64, ball, &entities);
            let stats = analyzer.get_stats();

            prop_assert_eq!(stats.total_passes(), expected_passes);
            prop_assert!(stats.ball_distance >= last_total);
            prop_assert!((stats.ball_distance - expected_distance).abs() < 1e-6);
            last_total = stats.ball_distance;

            let share_sum = stats.possession.a + stats.possession.b;
            if expected_passes > 0 {
                prop_assert!((share_sum - 1.0).abs() < 1e-9);
            } else {
                prop_assert_eq!(share_sum, 0.0);
            }
        }
    }

    #[test]
    fn test_entity_distance_is_exact_step_sum(
        steps in prop::collection::vec((-20i32..=20, -20i32..=20), 1..50),
    ) {
        let mut analyzer = MatchAnalyzer::new(20.0);
        let mut position = Point::new(500, 500);
        let mut expected = 0.0f64;

        for (i, (dx, dy)) in steps.into_iter().enumerate() {
            let next = Point::new(position.x + dx, position.y + dy);
            if i > 0 {
                expected += position.distance(&next);
            }
            position = next;

            let mut snapshot = TrackSnapshot::default();
            snapshot.positions.insert(EntityId(7), position);
            snapshot.sides.insert(EntityId(7), Side::B);
            analyzer.update(i as u64, Point::new(0, 0), &snapshot);

            prop_assert!((analyzer.get_stats().entity_distance(EntityId(7)) - expected).abs() < 1e-6);
        }
    }
}
