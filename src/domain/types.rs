//! Shared types for match analytics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

/// Newtype wrapper for entity IDs to provide type safety
///
/// IDs are handed out by the tracker from a monotonically increasing counter
/// and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pixel position in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned bounding box `[x1, y1, x2, y2]` in pixels
///
/// Well-formed boxes have `x2 >= x1` and `y2 >= y1`. The detector boundary
/// is trusted for that; nothing here validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Geometric center, truncated to whole pixels
    #[inline]
    pub fn centroid(&self) -> Point {
        Point::new(midpoint(self.x1, self.x2), midpoint(self.y1, self.y2))
    }
}

/// Midpoint summed in i64; the halved result always fits back in i32
#[inline]
fn midpoint(a: i32, b: i32) -> i32 {
    ((i64::from(a) + i64::from(b)) / 2) as i32
}

impl From<[i32; 4]> for BoundingBox {
    fn from(b: [i32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Team label inferred from kit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Light / white kit
    A,
    /// Red kit
    B,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::A, Side::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "side_a",
            Side::B => "side_b",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per side; both sides are always present
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerSide<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Iterate `(side, value)` pairs in side order
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::ALL.into_iter().map(move |side| (side, &self[side]))
    }
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }
}

/// Tracked entity state, owned exclusively by the tracker
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub position: Point,
    pub side: Side,
    /// Consecutive frames since the last successful match
    pub missed_count: u32,
}

impl TrackedEntity {
    #[inline]
    pub fn new(id: EntityId, position: Point, side: Side) -> Self {
        Self { id, position, side, missed_count: 0 }
    }
}

/// Read-only view of the tracker state after a frame
///
/// Both maps iterate in ascending id order, which is also registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSnapshot {
    pub positions: BTreeMap<EntityId, Point>,
    pub sides: BTreeMap<EntityId, Side>,
}

impl TrackSnapshot {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: EntityId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn side(&self, id: EntityId) -> Option<Side> {
        self.sides.get(&id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.positions.keys().copied()
    }
}

/// Thresholded detector output for a single frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDetections {
    pub entities: Vec<BoundingBox>,
    pub ball: Option<BoundingBox>,
}

impl FrameDetections {
    pub fn new(entities: Vec<BoundingBox>, ball: Option<BoundingBox>) -> Self {
        Self { entities, ball }
    }

    /// Ball centroid, if a ball was detected
    pub fn ball_position(&self) -> Option<Point> {
        self.ball.map(|b| b.centroid())
    }
}
