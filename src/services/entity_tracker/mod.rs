//! Entity identity tracking across frames
//!
//! The tracker turns per-frame bounding boxes into stable entity IDs:
//! - boxes are reduced to centroids and matched against live entities
//!   through the configured assignment strategy
//! - matched entities take the new centroid and get their side re-classified
//! - unmatched entities accumulate missed frames and are deregistered once
//!   they exceed the patience threshold; their IDs are never reused
//! - unmatched boxes become new entities only when the frame brought at
//!   least as many boxes as there were live entities, otherwise they are
//!   dropped for that frame


use crate::domain::types::{BoundingBox, EntityId, Point, TrackSnapshot, TrackedEntity};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::assignment::{AssignmentStrategy, DistanceMatrix};
use crate::services::side_classifier::{HsvBandClassifier, SideClassifier};
use image::RgbImage;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Centroid tracker with stable, never-reused entity IDs
pub struct EntityTracker<C = HsvBandClassifier> {
    /// Live entities by id (ascending id == registration order)
    entities: BTreeMap<EntityId, TrackedEntity>,
    /// Next id to hand out
    next_id: u64,
    /// Missed frames tolerated before deregistration
    patience: u32,
    strategy: AssignmentStrategy,
    classifier: C,
    metrics: Option<Arc<Metrics>>,
}

impl EntityTracker<HsvBandClassifier> {
    /// Tracker with the HSV kit classifier and settings from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.patience(), HsvBandClassifier::from_config(config))
            .with_strategy(config.assignment())
    }
}

impl<C: SideClassifier> EntityTracker<C> {
    pub fn new(patience: u32, classifier: C) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 0,
            patience,
            strategy: AssignmentStrategy::default(),
            classifier,
            metrics: None,
        }
    }

    pub fn with_strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Record registrations, deregistrations and drops
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Feed one frame of entity boxes and return the resulting state
    ///
    /// `frame` is only used to classify sides; it must share the boxes'
    /// coordinate space.
    pub fn update(&mut self, boxes: &[BoundingBox], frame: &RgbImage) -> TrackSnapshot {
        if boxes.is_empty() {
            let ids: Vec<EntityId> = self.entities.keys().copied().collect();
            for id in ids {
                self.mark_missed(id);
            }
            return self.snapshot();
        }

        let centroids: Vec<Point> = boxes.iter().map(BoundingBox::centroid).collect();

        if self.entities.is_empty() {
            for &centroid in &centroids {
                self.register(centroid, frame);
            }
            return self.snapshot();
        }

        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        let positions: Vec<Point> = self.entities.values().map(|e| e.position).collect();
        let assignment = self.strategy.solve(&DistanceMatrix::between(&positions, &centroids));

        for &(row, col) in &assignment.matches {
            let centroid = centroids[col];
            let side = self.classifier.classify(frame, centroid);
            if let Some(entity) = self.entities.get_mut(&ids[row]) {
                entity.position = centroid;
                entity.missed_count = 0;
                entity.side = side;
            }
        }

        for &row in &assignment.unmatched_tracks {
            self.mark_missed(ids[row]);
        }

        let unmatched = &assignment.unmatched_detections;
        if ids.len() <= centroids.len() {
            for &col in unmatched {
                self.register(centroids[col], frame);
            }
        } else if !unmatched.is_empty() {
            debug!(
                dropped = %unmatched.len(),
                live_entities = %ids.len(),
                detections = %centroids.len(),
                "detections_dropped"
            );
            if let Some(ref m) = self.metrics {
                m.record_detections_dropped(unmatched.len() as u64);
            }
        }

        self.snapshot()
    }

    /// Register a new entity at `centroid`
    fn register(&mut self, centroid: Point, frame: &RgbImage) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let side = self.classifier.classify(frame, centroid);
        self.entities.insert(id, TrackedEntity::new(id, centroid, side));

        debug!(entity_id = %id, position = %centroid, side = %side, "entity_registered");
        if let Some(ref m) = self.metrics {
            m.record_entity_registered();
        }
        id
    }

    /// Count a missed frame, deregistering past the patience threshold
    fn mark_missed(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.missed_count += 1;
        if entity.missed_count > self.patience {
            self.deregister(id);
        }
    }

    fn deregister(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.remove(&id) {
            info!(
                entity_id = %id,
                last_position = %entity.position,
                missed = %entity.missed_count,
                "entity_deregistered"
            );
            if let Some(ref m) = self.metrics {
                m.record_entity_deregistered();
            }
        }
    }

    /// Current id→position and id→side view
    pub fn snapshot(&self) -> TrackSnapshot {
        let mut snapshot = TrackSnapshot::default();
        for (id, entity) in &self.entities {
            snapshot.positions.insert(*id, entity.position);
            snapshot.sides.insert(*id, entity.side);
        }
        snapshot
    }

    pub fn entity(&self, id: EntityId) -> Option<&TrackedEntity> {
        self.entities.get(&id)
    }

    /// Live entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.values()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Id the next registration will receive
    pub fn next_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    pub fn patience(&self) -> u32 {
        self.patience
    }

    pub fn strategy(&self) -> AssignmentStrategy {
        self.strategy
    }
}
