//! Planar geometry support shared by the cleaning stages
//!
//! - Precision grid snapping
//! - Validity checking
//! - Panic-guarded boolean operations and cascaded union
//! - Antimeridian splitting

mod boolean;
mod precision;
mod validity;
mod wrap;

pub use boolean::{
    boolean_op, cascaded_union, make_valid, BooleanOp, BooleanOpFailure,
    GeoOverlay, Overlay,
};
pub use precision::{PrecisionGrid, GEOGRAPHIC_PRECISION, PROJECTED_PRECISION};
pub use validity::{check_validity, is_valid, ValidityProblem};
pub use wrap::{clip_ring, split_antimeridian, ClipRect};

use geo::{Area, BoundingRect, LineString, MultiPolygon, Polygon};
use rstar::AABB;

/// Shoelace area of a closed ring, positive for counter-clockwise rings
pub fn ring_signed_area(ring: &LineString<f64>) -> f64 {
    let twice: f64 = ring
        .lines()
        .map(|l| l.start.x * l.end.y - l.end.x * l.start.y)
        .sum();
    twice / 2.0
}

/// Envelope of a multipolygon as an R-tree box, `None` when empty
pub fn envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|r| AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]))
}

/// Drop polygon parts and holes whose area is below `min_area`
pub fn remove_slivers(mp: &MultiPolygon<f64>, min_area: f64) -> MultiPolygon<f64> {
    let polygons = mp
        .iter()
        .filter(|p| p.unsigned_area() >= min_area)
        .map(|p| {
            let holes = p
                .interiors()
                .iter()
                .filter(|h| ring_signed_area(h).abs() >= min_area)
                .cloned()
                .collect();
            Polygon::new(p.exterior().clone(), holes)
        })
        .collect();
    MultiPolygon::new(polygons)
}
