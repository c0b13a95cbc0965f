//! Antimeridian splitting
//!
//! A polygon built around a point close to ±180° longitude extends past
//! the valid longitude range. It is clipped against the three 360°-wide
//! longitude windows with Sutherland-Hodgman and each piece is shifted back
//! into [-180, 180].

use geo::{Coord, LineString, MultiPolygon, Polygon};

/// A clipping rectangle
#[derive(Debug, Clone, Copy)]
pub struct ClipRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ClipRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }
}

/// Edge of the clipping rectangle
#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn is_inside(&self, p: &Coord<f64>, rect: &ClipRect) -> bool {
        match self {
            Edge::Left => p.x >= rect.min_x,
            Edge::Right => p.x <= rect.max_x,
            Edge::Bottom => p.y >= rect.min_y,
            Edge::Top => p.y <= rect.max_y,
        }
    }

    fn intersect(&self, p: &Coord<f64>, q: &Coord<f64>, rect: &ClipRect) -> Coord<f64> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;

        match self {
            Edge::Left => {
                let t = (rect.min_x - p.x) / dx;
                Coord { x: rect.min_x, y: p.y + t * dy }
            }
            Edge::Right => {
                let t = (rect.max_x - p.x) / dx;
                Coord { x: rect.max_x, y: p.y + t * dy }
            }
            Edge::Bottom => {
                let t = (rect.min_y - p.y) / dy;
                Coord { x: p.x + t * dx, y: rect.min_y }
            }
            Edge::Top => {
                let t = (rect.max_y - p.y) / dy;
                Coord { x: p.x + t * dx, y: rect.max_y }
            }
        }
    }
}

/// Clip a vertex ring against one edge (Sutherland-Hodgman step)
fn clip_edge(vertices: &[Coord<f64>], edge: Edge, rect: &ClipRect) -> Vec<Coord<f64>> {
    let n = vertices.len();
    let mut output = Vec::with_capacity(n + 2);

    for i in 0..n {
        let current = &vertices[i];
        let next = &vertices[(i + 1) % n];

        match (edge.is_inside(current, rect), edge.is_inside(next, rect)) {
            (true, true) => output.push(*next),
            (true, false) => output.push(edge.intersect(current, next, rect)),
            (false, true) => {
                output.push(edge.intersect(current, next, rect));
                output.push(*next);
            }
            (false, false) => {}
        }
    }

    output
}

/// Clip the shell of a polygon by a rectangle. Only valid for shells that
/// stay convex along the clipped edges, such as expanded point circles.
pub fn clip_ring(ring: &LineString<f64>, rect: ClipRect) -> Option<LineString<f64>> {
    let mut vertices: Vec<Coord<f64>> = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        vertices = clip_edge(&vertices, edge, &rect);
        if vertices.len() < 3 {
            return None;
        }
    }

    vertices.push(vertices[0]);
    Some(LineString::new(vertices))
}

/// Split a hole-free polygon given in degrees along ±180° longitude.
///
/// Polygons already inside [-180, 180] are returned unchanged as a single
/// part.
pub fn split_antimeridian(poly: &Polygon<f64>) -> MultiPolygon<f64> {
    let (min_x, max_x) = poly
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.x), hi.max(c.x))
        });
    if min_x >= -180.0 && max_x <= 180.0 {
        return MultiPolygon::new(vec![poly.clone()]);
    }

    let mut parts = Vec::new();
    for shift in [-360.0, 0.0, 360.0] {
        let window = ClipRect::new(-180.0 + shift, -90.0, 180.0 + shift, 90.0);
        if max_x < window.min_x || min_x > window.max_x {
            continue;
        }
        if let Some(ring) = clip_ring(poly.exterior(), window) {
            let shifted: Vec<Coord<f64>> = ring
                .coords()
                .map(|c| Coord { x: c.x - shift, y: c.y })
                .collect();
            parts.push(Polygon::new(LineString::new(shifted), vec![]));
        }
    }
    MultiPolygon::new(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, BoundingRect};

    #[test]
    fn test_clip_ring_square() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        let clipped = clip_ring(square.exterior(), ClipRect::new(5.0, -1.0, 20.0, 20.0)).unwrap();
        let area = Polygon::new(clipped, vec![]).unsigned_area();
        assert!((area - 50.0).abs() < 1e-9, "area = {area}");
    }

    #[test]
    fn test_clip_ring_outside() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        assert!(clip_ring(square.exterior(), ClipRect::new(5.0, 5.0, 6.0, 6.0)).is_none());
    }

    #[test]
    fn test_split_antimeridian() {
        let across = polygon![
            (x: 178.0, y: -1.0),
            (x: 182.0, y: -1.0),
            (x: 182.0, y: 1.0),
            (x: 178.0, y: 1.0),
        ];
        let split = split_antimeridian(&across);
        assert_eq!(split.0.len(), 2);
        assert!((split.unsigned_area() - 8.0).abs() < 1e-9);

        let bounds = split.bounding_rect().unwrap();
        assert!(bounds.min().x >= -180.0 && bounds.max().x <= 180.0);
    }

    #[test]
    fn test_split_antimeridian_noop() {
        let inside = polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
        ];
        let split = split_antimeridian(&inside);
        assert_eq!(split.0.len(), 1);
        assert_eq!(split.0[0], inside);
    }
}
