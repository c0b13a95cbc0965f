//! Polygon validity checking
//!
//! Reports the first problem found in a multipolygon. Ring segments are
//! indexed in an R-tree so that crossing tests only run between segments
//! whose envelopes overlap.

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{BoundingRect, Coord, Line, LineString, MultiPolygon, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use thiserror::Error;

use super::ring_signed_area;

/// Why a geometry is not valid
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidityProblem {
    #[error("non-finite coordinate")]
    NonFinite,

    #[error("ring with fewer than four vertices")]
    TooFewPoints,

    #[error("ring is not closed")]
    Unclosed,

    #[error("ring encloses no area")]
    ZeroAreaRing,

    #[error("self-intersection near ({x:.6}, {y:.6})")]
    SelfIntersection { x: f64, y: f64 },

    #[error("hole lies outside its shell")]
    HoleOutsideShell,

    #[error("polygon parts overlap")]
    OverlappingParts,
}

/// Check a multipolygon and return the first problem found
pub fn check_validity(mp: &MultiPolygon<f64>) -> Result<(), ValidityProblem> {
    for poly in mp {
        for ring in rings(poly) {
            check_ring(ring)?;
        }
    }
    check_crossings(mp)?;
    for poly in mp {
        check_holes(poly)?;
    }
    check_parts(mp)
}

pub fn is_valid(mp: &MultiPolygon<f64>) -> bool {
    check_validity(mp).is_ok()
}

fn rings(poly: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(poly.exterior()).chain(poly.interiors())
}

fn check_ring(ring: &LineString<f64>) -> Result<(), ValidityProblem> {
    if ring.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(ValidityProblem::NonFinite);
    }
    if ring.0.len() < 4 {
        return Err(ValidityProblem::TooFewPoints);
    }
    if !ring.is_closed() {
        return Err(ValidityProblem::Unclosed);
    }
    if ring_signed_area(ring) == 0.0 {
        return Err(ValidityProblem::ZeroAreaRing);
    }
    Ok(())
}

/// One ring segment in the crossing index
struct Segment {
    line: Line<f64>,
}

impl RTreeObject for Segment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (a, b) = (self.line.start, self.line.end);
        AABB::from_corners([a.x.min(b.x), a.y.min(b.y)], [a.x.max(b.x), a.y.max(b.y)])
    }
}

/// Proper crossings and collinear overlaps between any two ring segments.
/// Segments that only touch at a point are allowed.
fn check_crossings(mp: &MultiPolygon<f64>) -> Result<(), ValidityProblem> {
    let segments: Vec<Segment> = mp
        .iter()
        .flat_map(rings)
        .flat_map(|ring| ring.lines())
        .map(|line| Segment { line })
        .collect();

    let tree = RTree::bulk_load(segments);
    for seg in tree.iter() {
        for other in tree.locate_in_envelope_intersecting(&seg.envelope()) {
            if std::ptr::eq(seg, other) {
                continue;
            }
            match line_intersection(seg.line, other.line) {
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper: true,
                }) => {
                    return Err(crossing_at(intersection));
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    if intersection.start != intersection.end {
                        return Err(crossing_at(intersection.start));
                    }
                }
                // shared vertex of consecutive segments, or a touch
                _ => {}
            }
        }
    }
    Ok(())
}

fn crossing_at(c: Coord<f64>) -> ValidityProblem {
    ValidityProblem::SelfIntersection { x: c.x, y: c.y }
}

fn check_holes(poly: &Polygon<f64>) -> Result<(), ValidityProblem> {
    if poly.interiors().is_empty() {
        return Ok(());
    }
    let shell = Polygon::new(poly.exterior().clone(), vec![]);
    for hole in poly.interiors() {
        if hole
            .coords()
            .any(|c| shell.coordinate_position(c) == CoordPos::Outside)
        {
            return Err(ValidityProblem::HoleOutsideShell);
        }
    }
    Ok(())
}

/// Part envelope in the overlap index
struct Part {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Part {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Parts of a multipolygon must not share interior. Boundaries were already
/// checked for crossings, so two parts overlap only when one has a vertex
/// inside the other or they coincide.
fn check_parts(mp: &MultiPolygon<f64>) -> Result<(), ValidityProblem> {
    if mp.0.len() < 2 {
        return Ok(());
    }
    let parts: Vec<Part> = mp
        .iter()
        .enumerate()
        .filter_map(|(index, poly)| {
            poly.bounding_rect().map(|r| Part {
                index,
                envelope: AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]),
            })
        })
        .collect();

    let tree = RTree::bulk_load(parts);
    for part in tree.iter() {
        for other in tree.locate_in_envelope_intersecting(&part.envelope) {
            if other.index <= part.index {
                continue;
            }
            let (a, b) = (&mp.0[part.index], &mp.0[other.index]);
            if has_vertex_inside(a, b) || has_vertex_inside(b, a) || coincide(a, b) {
                return Err(ValidityProblem::OverlappingParts);
            }
        }
    }
    Ok(())
}

fn has_vertex_inside(poly: &Polygon<f64>, other: &Polygon<f64>) -> bool {
    other
        .exterior()
        .coords()
        .any(|c| poly.coordinate_position(c) == CoordPos::Inside)
}

fn coincide(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    b.exterior()
        .coords()
        .all(|c| a.coordinate_position(c) == CoordPos::OnBoundary)
        && a.exterior()
            .coords()
            .all(|c| b.coordinate_position(c) == CoordPos::OnBoundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
    }

    #[test]
    fn test_valid_square() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 10.0)]);
        assert!(is_valid(&mp));
    }

    #[test]
    fn test_bowtie_self_intersection() {
        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 5.0),
        ];
        let err = check_validity(&MultiPolygon::new(vec![bowtie])).unwrap_err();
        match err {
            ValidityProblem::SelfIntersection { x, y } => {
                let expected = 10.0 / 3.0;
                assert!((x - expected).abs() < 1e-9 && (y - expected).abs() < 1e-9);
            }
            other => panic!("expected self-intersection, got {other:?}"),
        }
    }

    #[test]
    fn test_spike_is_collinear_overlap() {
        let spike = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 15.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        assert!(matches!(
            check_validity(&MultiPolygon::new(vec![spike])),
            Err(ValidityProblem::SelfIntersection { .. })
        ));
    }

    #[test]
    fn test_overlapping_parts() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0)]);
        // boundaries cross
        assert!(!is_valid(&mp));

        let nested = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(2.0, 2.0, 3.0)]);
        assert_eq!(check_validity(&nested), Err(ValidityProblem::OverlappingParts));

        let dup = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(0.0, 0.0, 10.0)]);
        assert!(!is_valid(&dup));
    }

    #[test]
    fn test_parts_touching_at_corner_are_valid() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(10.0, 10.0, 10.0)]);
        assert!(is_valid(&mp));

        // a shared edge is a collinear overlap
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0)]);
        assert!(!is_valid(&mp));
    }

    #[test]
    fn test_hole_outside_shell() {
        let poly = Polygon::new(
            square(0.0, 0.0, 10.0).exterior().clone(),
            vec![square(20.0, 20.0, 2.0).exterior().clone()],
        );
        assert_eq!(
            check_validity(&MultiPolygon::new(vec![poly])),
            Err(ValidityProblem::HoleOutsideShell)
        );
    }

    #[test]
    fn test_non_finite() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1.0, y: 1.0),
        ];
        assert_eq!(
            check_validity(&MultiPolygon::new(vec![poly])),
            Err(ValidityProblem::NonFinite)
        );
    }
}
