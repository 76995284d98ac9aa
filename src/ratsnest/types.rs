//! Core ratsnest types
//!
//! Board coordinates, item identities and the tunables shared by the
//! per-net graphs and the board-level store.

use serde::{Deserialize, Serialize};

/// Net number. 0 is reserved for items that belong to no net.
pub type NetCode = usize;

/// Net number used for unconnected items
pub const NO_NET: NetCode = 0;

/// A point in board coordinates (integer units, e.g. nanometers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_2(other).sqrt()
    }

    /// Squared Euclidean distance, computed in f64 to avoid i32 overflow
    pub fn distance_2(&self, other: &Point) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        dx * dx + dy * dy
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box, inclusive on all sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Bounding box of a point run. Returns None for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BoundingBox { min: *first, max: *first };
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// The box as an R-tree envelope
    pub fn envelope(&self) -> rstar::AABB<[f64; 2]> {
        rstar::AABB::from_corners(self.min.as_array(), self.max.as_array())
    }
}

/// Stable pad identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PadId(pub u64);

/// Stable via identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViaId(pub u64);

/// Stable track segment identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

/// Stable copper zone identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u64);

/// Stable module (footprint) identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub u64);

/// Identity of any connected board item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ItemId {
    Pad(PadId),
    Via(ViaId),
    Track(TrackId),
    Zone(ZoneId),
}

/// How candidate (missing) connections are proposed before the spanning tree runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStrategy {
    /// Delaunay triangulation edges, O(n) candidates
    #[default]
    Triangulation,
    /// Every node pair, O(n^2) candidates
    Exhaustive,
}

/// Ratsnest tunables
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RatsnestOptions {
    /// Minimum number of dirty nets before recalculation fans out over rayon
    pub parallel_threshold: usize,
    pub candidates: CandidateStrategy,
    /// Highest net number accepted; items on higher nets are skipped
    pub max_net: NetCode,
}

impl Default for RatsnestOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: 4,
            candidates: CandidateStrategy::Triangulation,
            max_net: 1 << 20,
        }
    }
}
