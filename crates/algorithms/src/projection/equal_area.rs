//! Spherical equal-area projections (Snyder 1987, USGS formulas).
//!
//! All projections work on the authalic sphere, whose surface area equals
//! that of the WGS84 ellipsoid, so planar areas of projected geometry are
//! true areas in km². Longitudes and latitudes are in degrees, projected
//! coordinates in kilometres.

use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

/// Radius of the sphere with the same surface area as WGS84 (km)
pub const AUTHALIC_RADIUS_KM: f64 = 6_371.007_180_9;

const R: f64 = AUTHALIC_RADIUS_KM;

/// Extent beyond which a regional conic gives way to a world projection
const MAX_CONIC_LON_SPAN: f64 = 90.0;
const MAX_CONIC_LAT_SPAN: f64 = 60.0;

/// Wide extents entirely poleward of this latitude use a polar azimuthal
const MIN_POLAR_LAT: f64 = 45.0;

/// An equal-area projection on the authalic sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EqualAreaProjection {
    /// Lambert azimuthal equal-area centred on (`lon0`, `lat0`)
    LambertAzimuthal { lon0: f64, lat0: f64 },
    /// Albers equal-area conic with standard parallels `lat1`, `lat2`
    AlbersConic { lon0: f64, lat0: f64, lat1: f64, lat2: f64 },
    /// Lambert cylindrical equal-area, true scale at the equator
    LambertCylindrical { lon0: f64 },
    /// Mollweide pseudo-cylindrical
    Mollweide { lon0: f64 },
}

impl EqualAreaProjection {
    /// Pick a projection that bounds distortion over a geographic extent.
    ///
    /// Extents that reach a pole, or wrap far around it, get a polar
    /// Lambert azimuthal. Regional extents get an Albers conic with standard
    /// parallels at 1/6 and 5/6 of the latitude span. Other extents wider
    /// than 90° of longitude or taller than 60° of latitude use Mollweide.
    pub fn for_extent(extent: &Rect<f64>) -> Self {
        let (min, max) = (extent.min(), extent.max());
        let lon_span = max.x - min.x;
        let lat_span = max.y - min.y;
        let wide = lon_span > MAX_CONIC_LON_SPAN;
        if min.y > 0.0 && (max.y >= 90.0 || (wide && min.y >= MIN_POLAR_LAT)) {
            return EqualAreaProjection::LambertAzimuthal { lon0: 0.0, lat0: 90.0 };
        }
        if max.y < 0.0 && (min.y <= -90.0 || (wide && max.y <= -MIN_POLAR_LAT)) {
            return EqualAreaProjection::LambertAzimuthal { lon0: 0.0, lat0: -90.0 };
        }
        if wide || lat_span > MAX_CONIC_LAT_SPAN {
            return EqualAreaProjection::Mollweide { lon0: 0.0 };
        }

        let lon0 = (min.x + max.x) / 2.0;
        let lat1 = min.y + lat_span / 6.0;
        let lat2 = max.y - lat_span / 6.0;
        let n = (lat1.to_radians().sin() + lat2.to_radians().sin()) / 2.0;
        if n.abs() < 1e-6 {
            return EqualAreaProjection::LambertCylindrical { lon0 };
        }
        EqualAreaProjection::AlbersConic {
            lon0,
            lat0: (min.y + max.y) / 2.0,
            lat1,
            lat2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EqualAreaProjection::LambertAzimuthal { .. } => "Lambert azimuthal equal-area",
            EqualAreaProjection::AlbersConic { .. } => "Albers equal-area conic",
            EqualAreaProjection::LambertCylindrical { .. } => "Lambert cylindrical equal-area",
            EqualAreaProjection::Mollweide { .. } => "Mollweide",
        }
    }

    /// Project (lon, lat) in degrees to (x, y) in km
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        match *self {
            EqualAreaProjection::LambertAzimuthal { lon0, lat0 } => {
                let dl = delta_lon(lon, lon0);
                let phi0 = lat0.to_radians();
                let cos_c = phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dl.cos();
                // antipode of the centre: no finite image
                let k = (2.0 / (1.0 + cos_c).max(f64::MIN_POSITIVE)).sqrt();
                let x = R * k * phi.cos() * dl.sin();
                let y = R * k * (phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dl.cos());
                (x, y)
            }
            EqualAreaProjection::AlbersConic { lon0, lat0, lat1, lat2 } => {
                let albers = Albers::new(lat0, lat1, lat2);
                let rho = albers.rho(phi);
                let theta = albers.n * delta_lon(lon, lon0);
                (rho * theta.sin(), albers.rho0 - rho * theta.cos())
            }
            EqualAreaProjection::LambertCylindrical { lon0 } => {
                (R * delta_lon(lon, lon0), R * phi.sin())
            }
            EqualAreaProjection::Mollweide { lon0 } => {
                let theta = mollweide_theta(phi);
                let x = 2.0 * SQRT_2 / PI * R * delta_lon(lon, lon0) * theta.cos();
                let y = SQRT_2 * R * theta.sin();
                (x, y)
            }
        }
    }

    /// Unproject (x, y) in km to (lon, lat) in degrees.
    ///
    /// Longitudes are `lon0 + Δ` with Δ in [-180, 180] and are not wrapped,
    /// so shapes around the centre stay continuous across ±180°.
    /// Returns `None` outside the projection's domain.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match *self {
            EqualAreaProjection::LambertAzimuthal { lon0, lat0 } => {
                let rho = (x * x + y * y).sqrt();
                if rho == 0.0 {
                    return Some((lon0, lat0));
                }
                if rho > 2.0 * R {
                    return None;
                }
                let phi0 = lat0.to_radians();
                let c = 2.0 * (rho / (2.0 * R)).asin();
                let phi = (c.cos() * phi0.sin() + y * c.sin() * phi0.cos() / rho)
                    .clamp(-1.0, 1.0)
                    .asin();
                let dl = (x * c.sin()).atan2(rho * phi0.cos() * c.cos() - y * phi0.sin() * c.sin());
                Some((lon0 + dl.to_degrees(), phi.to_degrees()))
            }
            EqualAreaProjection::AlbersConic { lon0, lat0, lat1, lat2 } => {
                let albers = Albers::new(lat0, lat1, lat2);
                let n = albers.n;
                let dy = albers.rho0 - y;
                let (rho, theta) = if n >= 0.0 {
                    ((x * x + dy * dy).sqrt(), x.atan2(dy))
                } else {
                    (-(x * x + dy * dy).sqrt(), (-x).atan2(-dy))
                };
                let s = (albers.c - (rho * n / R).powi(2)) / (2.0 * n);
                if !(-1.0..=1.0).contains(&s) {
                    return None;
                }
                Some((lon0 + (theta / n).to_degrees(), s.asin().to_degrees()))
            }
            EqualAreaProjection::LambertCylindrical { lon0 } => {
                let s = y / R;
                if !(-1.0..=1.0).contains(&s) {
                    return None;
                }
                Some((lon0 + (x / R).to_degrees(), s.asin().to_degrees()))
            }
            EqualAreaProjection::Mollweide { lon0 } => {
                let s = y / (SQRT_2 * R);
                if !(-1.0..=1.0).contains(&s) {
                    return None;
                }
                let theta = s.asin();
                let phi = ((2.0 * theta + (2.0 * theta).sin()) / PI).clamp(-1.0, 1.0).asin();
                let dl = if theta.cos().abs() < 1e-12 {
                    0.0
                } else {
                    PI * x / (2.0 * SQRT_2 * R * theta.cos())
                };
                Some((lon0 + dl.to_degrees(), phi.to_degrees()))
            }
        }
    }

    pub fn project_coord(&self, c: Coord<f64>) -> Coord<f64> {
        let (x, y) = self.forward(c.x, c.y);
        Coord { x, y }
    }

    pub fn project_ring(&self, ring: &LineString<f64>) -> LineString<f64> {
        ring.coords().map(|c| self.project_coord(*c)).collect()
    }

    pub fn project_polygon(&self, poly: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.project_ring(poly.exterior()),
            poly.interiors().iter().map(|r| self.project_ring(r)).collect(),
        )
    }

    /// Project a multipolygon given in degrees to km
    pub fn project(&self, mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        mp.iter().map(|p| self.project_polygon(p)).collect()
    }
}

/// Longitude difference in radians, brought into [-π, π] only when it
/// falls outside
fn delta_lon(lon: f64, lon0: f64) -> f64 {
    let mut d = (lon - lon0).to_radians();
    if d > PI {
        d -= 2.0 * PI;
    } else if d < -PI {
        d += 2.0 * PI;
    }
    d
}

/// Auxiliary angle θ of Mollweide: 2θ + sin 2θ = π sin φ (Snyder eq. 31-4)
fn mollweide_theta(phi: f64) -> f64 {
    if (phi.abs() - FRAC_PI_2).abs() < 1e-12 {
        return phi;
    }
    let target = PI * phi.sin();
    let mut t = phi;
    for _ in 0..50 {
        let delta = -(t + t.sin() - target) / (1.0 + t.cos());
        t += delta;
        if delta.abs() < 1e-14 {
            break;
        }
    }
    t / 2.0
}

/// Spherical Albers constants (Snyder eqs. 14-3 to 14-6)
struct Albers {
    n: f64,
    c: f64,
    rho0: f64,
}

impl Albers {
    fn new(lat0: f64, lat1: f64, lat2: f64) -> Self {
        let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
        let n = (phi1.sin() + phi2.sin()) / 2.0;
        let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
        let mut albers = Self { n, c, rho0: 0.0 };
        albers.rho0 = albers.rho(lat0.to_radians());
        albers
    }

    fn rho(&self, phi: f64) -> f64 {
        R * (self.c - 2.0 * self.n * phi.sin()).max(0.0).sqrt() / self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon, Area};

    /// True area of a lon/lat cell on the authalic sphere
    fn cell_area(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> f64 {
        R * R * (lon1 - lon0).to_radians() * (lat1.to_radians().sin() - lat0.to_radians().sin())
    }

    fn densified_cell(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Polygon<f64> {
        let steps = 20;
        let mut coords = Vec::new();
        for i in 0..steps {
            coords.push((lon0 + (lon1 - lon0) * i as f64 / steps as f64, lat0));
        }
        for i in 0..steps {
            coords.push((lon1, lat0 + (lat1 - lat0) * i as f64 / steps as f64));
        }
        for i in 0..steps {
            coords.push((lon1 - (lon1 - lon0) * i as f64 / steps as f64, lat1));
        }
        for i in 0..steps {
            coords.push((lon0, lat1 - (lat1 - lat0) * i as f64 / steps as f64));
        }
        coords.push((lon0, lat0));
        Polygon::new(LineString::from(coords), vec![])
    }

    fn assert_preserves_area(proj: EqualAreaProjection, cell: (f64, f64, f64, f64)) {
        let (lon0, lat0, lon1, lat1) = cell;
        let expected = cell_area(lon0, lat0, lon1, lat1);
        let projected = proj.project_polygon(&densified_cell(lon0, lat0, lon1, lat1));
        let actual = projected.unsigned_area();
        let err = (actual - expected).abs() / expected;
        assert!(
            err < 1e-4,
            "{}: area {actual:.3} vs {expected:.3} ({:.5}%)",
            proj.name(),
            err * 100.0
        );
    }

    #[test]
    fn test_equal_area_property() {
        let cell = (10.0, 40.0, 11.0, 41.0);
        assert_preserves_area(EqualAreaProjection::LambertAzimuthal { lon0: 10.5, lat0: 40.5 }, cell);
        assert_preserves_area(
            EqualAreaProjection::AlbersConic { lon0: 10.0, lat0: 40.0, lat1: 30.0, lat2: 50.0 },
            cell,
        );
        assert_preserves_area(EqualAreaProjection::LambertCylindrical { lon0: 0.0 }, cell);
        assert_preserves_area(EqualAreaProjection::Mollweide { lon0: 0.0 }, cell);
    }

    #[test]
    fn test_one_degree_cell_at_equator() {
        // about 12,364 km² on the authalic sphere
        let expected = cell_area(0.0, 0.0, 1.0, 1.0);
        assert!((expected - 12_364.0).abs() < 5.0, "expected = {expected}");
        assert_preserves_area(EqualAreaProjection::Mollweide { lon0: 0.0 }, (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_laea_round_trip() {
        let proj = EqualAreaProjection::LambertAzimuthal { lon0: -70.0, lat0: -33.0 };
        for &(lon, lat) in &[(-70.0, -33.0), (-71.3, -32.1), (-60.0, -45.0), (-75.0, -10.0)] {
            let (x, y) = proj.forward(lon, lat);
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-9, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 1e-9, "lat {lat} -> {lat2}");
        }
    }

    #[test]
    fn test_inverse_inverts_forward() {
        let projections = [
            EqualAreaProjection::AlbersConic { lon0: 20.0, lat0: 50.0, lat1: 45.0, lat2: 55.0 },
            EqualAreaProjection::LambertCylindrical { lon0: 0.0 },
            EqualAreaProjection::Mollweide { lon0: 0.0 },
        ];
        for proj in projections {
            let (x, y) = proj.forward(23.5, 51.25);
            let (lon, lat) = proj.inverse(x, y).unwrap();
            assert!((lon - 23.5).abs() < 1e-8, "{}: lon {lon}", proj.name());
            assert!((lat - 51.25).abs() < 1e-8, "{}: lat {lat}", proj.name());
        }
    }

    #[test]
    fn test_laea_continuous_across_antimeridian() {
        let proj = EqualAreaProjection::LambertAzimuthal { lon0: 179.9, lat0: 0.0 };
        let (lon, _) = proj.inverse(50.0, 0.0).unwrap();
        assert!(lon > 180.0, "lon = {lon}");
    }

    #[test]
    fn test_for_extent() {
        let regional = Rect::new(coord! { x: 5.0, y: 45.0 }, coord! { x: 15.0, y: 55.0 });
        assert!(matches!(
            EqualAreaProjection::for_extent(&regional),
            EqualAreaProjection::AlbersConic { .. }
        ));

        let global = Rect::new(coord! { x: -170.0, y: -10.0 }, coord! { x: 170.0, y: 10.0 });
        assert!(matches!(
            EqualAreaProjection::for_extent(&global),
            EqualAreaProjection::Mollweide { .. }
        ));

        let north_cap = Rect::new(coord! { x: -180.0, y: 89.5 }, coord! { x: 180.0, y: 90.0 });
        assert_eq!(
            EqualAreaProjection::for_extent(&north_cap),
            EqualAreaProjection::LambertAzimuthal { lon0: 0.0, lat0: 90.0 }
        );

        let antarctic = Rect::new(coord! { x: -170.0, y: -80.0 }, coord! { x: 170.0, y: -60.0 });
        assert_eq!(
            EqualAreaProjection::for_extent(&antarctic),
            EqualAreaProjection::LambertAzimuthal { lon0: 0.0, lat0: -90.0 }
        );

        let equatorial = Rect::new(coord! { x: 0.0, y: -5.0 }, coord! { x: 10.0, y: 5.0 });
        assert!(matches!(
            EqualAreaProjection::for_extent(&equatorial),
            EqualAreaProjection::LambertCylindrical { .. }
        ));
    }

    #[test]
    fn test_polar_laea_preserves_area() {
        let north = EqualAreaProjection::LambertAzimuthal { lon0: 0.0, lat0: 90.0 };
        assert_preserves_area(north, (100.0, 80.0, 101.0, 81.0));
        let south = EqualAreaProjection::LambertAzimuthal { lon0: 0.0, lat0: -90.0 };
        assert_preserves_area(south, (-60.0, -75.0, -59.0, -74.0));
    }

    #[test]
    fn test_mollweide_pole() {
        let proj = EqualAreaProjection::Mollweide { lon0: 0.0 };
        let (x, y) = proj.forward(45.0, 90.0);
        assert!(x.abs() < 1e-6);
        assert!((y - SQRT_2 * R).abs() < 1e-6);
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert_eq!(proj.project_polygon(&square).exterior().0.len(), 4);
    }
}
