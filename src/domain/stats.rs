//! Match statistics snapshot exposed to reporting

use crate::domain::types::{EntityId, PerSide, Side};
use serde::Serialize;
use std::collections::BTreeMap;

/// Cumulative statistics for one analysis session
///
/// `possession` is derived from `passes`: each side's share of all pass
/// events, or 0 for both sides while no pass has been seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStats {
    pub possession: PerSide<f64>,
    pub passes: PerSide<u32>,
    pub ball_distance: f64,
    pub entity_distance: BTreeMap<EntityId, f64>,
}

impl MatchStats {
    /// Build a snapshot, deriving possession shares from the pass counts
    pub fn compile(
        passes: PerSide<u32>,
        ball_distance: f64,
        entity_distance: BTreeMap<EntityId, f64>,
    ) -> Self {
        Self { possession: possession_shares(&passes), passes, ball_distance, entity_distance }
    }

    pub fn total_passes(&self) -> u32 {
        self.passes.a + self.passes.b
    }

    /// Total distance covered by one entity, 0 if it never moved between frames
    pub fn entity_distance(&self, id: EntityId) -> f64 {
        self.entity_distance.get(&id).copied().unwrap_or(0.0)
    }

    pub fn passes_for(&self, side: Side) -> u32 {
        self.passes[side]
    }
}

/// Each side's fraction of the total pass count
pub fn possession_shares(passes: &PerSide<u32>) -> PerSide<f64> {
    let total = passes.a + passes.b;
    if total == 0 {
        return PerSide::new(0.0, 0.0);
    }
    let total = f64::from(total);
    PerSide::new(f64::from(passes.a) / total, f64::from(passes.b) / total)
}
