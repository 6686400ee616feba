//! Land/water point classification against polygon rings.
//!
//! A [`LandMask`] holds an immutable set of simple polygon rings and answers
//! whether a (lon, lat) point lies inside any of them. Containment uses an
//! even-odd ray cast toward +longitude with half-open vertical comparisons;
//! points exactly on a ring edge follow the rule's asymmetry and are not
//! separately classified. Holes are out of scope — lake and island levels
//! are filtered out before the mask is built.
//!
//! Cost is O(polygon count × vertices) per query. Queries happen once per
//! output pixel at the coarse basemap resolution, not per raw sample, so no
//! spatial index is kept.

use tracing::{debug, warn};

use crate::gshhg::{Level, Shape};

/// A simple polygon ring of (lon, lat) pairs.
///
/// The ring is treated as implicitly closed; the last vertex connects back
/// to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    ring: Vec<(f64, f64)>,
}

impl Polygon {
    /// Create a polygon from an ordered ring of (lon, lat) pairs.
    pub fn new(ring: Vec<(f64, f64)>) -> Self {
        Self { ring }
    }

    /// Number of vertices in the ring.
    pub fn vertex_count(&self) -> usize {
        self.ring.len()
    }

    /// Even-odd ray-cast containment test.
    ///
    /// Rings with fewer than three vertices contain nothing.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if self.ring.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.ring.len() - 1;
        for i in 0..self.ring.len() {
            let (xi, yi) = self.ring[i];
            let (xj, yj) = self.ring[j];

            // Edge straddles the query latitude (half-open, so a vertex
            // exactly on the latitude counts for one of its two edges only).
            if (yi > lat) != (yj > lat) {
                let crossing = (xj - xi) * (lat - yi) / (yj - yi) + xi;
                if lon < crossing {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Immutable land polygon set for point classification.
///
/// Loaded once before fan-out and shared read-only across worker threads.
#[derive(Debug, Clone, Default)]
pub struct LandMask {
    polygons: Vec<Polygon>,
}

impl LandMask {
    /// Build a mask from an already-converted polygon set.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    /// Build a mask from decoded shapes, keeping land-level rings only.
    ///
    /// Lake, island-in-lake, pond and invalid levels are skipped, as are
    /// degenerate rings with fewer than three points.
    pub fn from_shapes(shapes: &[Shape]) -> Self {
        let mut polygons = Vec::new();
        for shape in shapes {
            if shape.level() != Level::Land {
                continue;
            }
            if shape.point_count() < 3 {
                warn!(
                    shape_id = shape.header().id(),
                    points = shape.point_count(),
                    "skipping degenerate land ring"
                );
                continue;
            }

            let ring = shape
                .longitudes()
                .into_iter()
                .zip(shape.latitudes())
                .collect();
            polygons.push(Polygon::new(ring));
        }

        debug!(polygons = polygons.len(), "built land mask");
        Self { polygons }
    }

    /// True iff the point lies inside any polygon; short-circuits on the
    /// first match.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(lon, lat))
    }

    /// Number of polygons in the mask.
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// True when the mask holds no polygons (every point is water).
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}
