//! Equal-area circles around points
//!
//! A circle is approximated by a regular n-gon whose radius is enlarged so
//! that the polygon, not the ideal circle, has the requested area.

use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use std::f64::consts::PI;

use crate::geometry::split_antimeridian;
use crate::projection::EqualAreaProjection;

/// Radius of a regular `segments`-gon with area `area`.
///
/// Equivalent to `sqrt(area / π)` scaled by `sqrt(π / (n/2 · sin(2π/n)))`.
pub fn equal_area_radius(area: f64, segments: usize) -> f64 {
    let n = segments as f64;
    (2.0 * area / (n * (2.0 * PI / n).sin())).sqrt()
}

/// Closed ring of `segments` vertices around `center`
pub fn circle_ring(center: Coord<f64>, radius: f64, segments: usize) -> LineString<f64> {
    let mut coords = Vec::with_capacity(segments + 1);
    for i in 0..segments {
        let angle = 2.0 * PI * i as f64 / segments as f64;
        coords.push(Coord {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        });
    }
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Circle of planar area `area` (squared working units) in an equal-area CRS
pub fn planar_circle(center: Coord<f64>, area: f64, segments: usize) -> Polygon<f64> {
    let radius = equal_area_radius(area, segments);
    Polygon::new(circle_ring(center, radius, segments), vec![])
}

/// Circle of `area_km2` around a (lon, lat) point in degrees.
///
/// The n-gon is built in a Lambert azimuthal equal-area projection centred
/// on the point and inverse-projected vertex by vertex. Circles crossing
/// ±180° come back as two parts. A circle containing a pole becomes a cap
/// bounded by ±180° and the pole line. Returns `None` when the circle does
/// not fit on the sphere.
pub fn geographic_circle(center: Coord<f64>, area_km2: f64, segments: usize) -> Option<MultiPolygon<f64>> {
    let projection = EqualAreaProjection::LambertAzimuthal {
        lon0: center.x,
        lat0: center.y,
    };
    let ring = circle_ring(Coord { x: 0.0, y: 0.0 }, equal_area_radius(area_km2, segments), segments);
    let north = contains_pole(&projection, &ring, 90.0);
    let south = contains_pole(&projection, &ring, -90.0);

    let coords = ring
        .coords()
        .map(|c| projection.inverse(c.x, c.y).map(|(lon, lat)| Coord { x: lon, y: lat }))
        .collect::<Option<Vec<_>>>()?;

    match (north, south) {
        (false, false) => Some(split_antimeridian(&Polygon::new(LineString::new(coords), vec![]))),
        (true, false) => Some(MultiPolygon::new(vec![polar_cap(&coords, 90.0)])),
        (false, true) => Some(MultiPolygon::new(vec![polar_cap(&coords, -90.0)])),
        (true, true) => None,
    }
}

fn contains_pole(projection: &EqualAreaProjection, ring: &LineString<f64>, pole_lat: f64) -> bool {
    let (x, y) = projection.forward(0.0, pole_lat);
    Polygon::new(ring.clone(), vec![]).contains(&Point::new(x, y))
}

fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Lon/lat polygon of a circle around a pole.
///
/// Around a pole the boundary visits every longitude once, so it is
/// ordered by longitude and closed along ±180° and the pole line.
fn polar_cap(coords: &[Coord<f64>], pole_lat: f64) -> Polygon<f64> {
    let open = &coords[..coords.len().saturating_sub(1)];
    let mut boundary: Vec<Coord<f64>> = open
        .iter()
        .map(|c| Coord { x: wrap_lon(c.x), y: c.y })
        .collect();
    boundary.sort_by(|a, b| a.x.total_cmp(&b.x));

    // latitude where the boundary crosses ±180°
    let seam = match (boundary.first(), boundary.last()) {
        (Some(first), Some(last)) => {
            let gap = first.x + 360.0 - last.x;
            let t = if gap > 0.0 { (180.0 - last.x) / gap } else { 0.0 };
            last.y + t * (first.y - last.y)
        }
        _ => pole_lat,
    };

    let mut ring = Vec::with_capacity(boundary.len() + 6);
    ring.push(Coord { x: -180.0, y: seam });
    if pole_lat > 0.0 {
        ring.extend(boundary);
        ring.push(Coord { x: 180.0, y: seam });
        ring.push(Coord { x: 180.0, y: pole_lat });
        ring.push(Coord { x: -180.0, y: pole_lat });
    } else {
        ring.push(Coord { x: -180.0, y: pole_lat });
        ring.push(Coord { x: 180.0, y: pole_lat });
        ring.push(Coord { x: 180.0, y: seam });
        ring.extend(boundary.into_iter().rev());
    }
    ring.dedup();
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), vec![])
}
