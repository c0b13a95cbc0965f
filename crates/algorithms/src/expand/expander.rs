//! Point expander
//!
//! Converts normalized records into polygonal [`ProtectedArea`]s. Point
//! records become circles with their reported area; polygonal records pass
//! through.

use geo::{Geometry, MultiPolygon, Point, Polygon};
use paclean_core::{
    Algorithm, AuditEntry, Error, Issue, NormalizedRecord, ProtectedArea, Result, Stage, Staged, CRS,
};
use serde::{Deserialize, Serialize};

use super::circle::{geographic_circle, planar_circle};
use crate::geometry::cascaded_union;
use crate::maybe_rayon::*;
use crate::stage::{collect_outcomes, Outcome};

/// Fewest segments accepted for a circle
pub const MIN_SEGMENTS: usize = 8;

/// Parameters for point expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandParams {
    /// Number of segments of each circle (default: 64)
    pub segments: usize,
    /// Working CRS of the records
    pub crs: CRS,
}

impl Default for ExpandParams {
    fn default() -> Self {
        Self {
            segments: 64,
            crs: CRS::wgs84(),
        }
    }
}

/// Point expander algorithm
#[derive(Debug, Clone, Default)]
pub struct PointExpander;

impl Algorithm for PointExpander {
    type Input = Vec<NormalizedRecord>;
    type Output = Staged<ProtectedArea>;
    type Params = ExpandParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PointExpander"
    }

    fn description(&self) -> &'static str {
        "Replace point records with equal-area circles of their reported area"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(expand_points(input, &params))
    }
}

/// Expand point records and keep polygonal ones.
///
/// # Arguments
/// * `records` - Normalized records
/// * `params` - Circle segments and working CRS
///
/// # Returns
/// Records with polygonal geometry only. Points without a reported area and
/// linear geometries are dropped with an audit entry.
pub fn expand_points(records: Vec<NormalizedRecord>, params: &ExpandParams) -> Staged<ProtectedArea> {
    let segments = params.segments.max(MIN_SEGMENTS);
    let km_per_unit = params.crs.units().km_per_unit();

    let outcomes: Vec<_> = records
        .into_par_iter()
        .map(|record| {
            let id = record.attributes.id.clone();
            match to_polygonal(&record, segments, km_per_unit) {
                Ok(geometry) => Outcome::kept(ProtectedArea::new(record.attributes, geometry)),
                Err(issue) => Outcome::Dropped(AuditEntry::new(id, Stage::ExpandPoints, issue)),
            }
        })
        .collect();

    let staged = collect_outcomes(outcomes);
    tracing::info!(
        "expand: {} polygonal records, {} dropped",
        staged.records.len(),
        staged.audit.len()
    );
    staged
}

fn to_polygonal(
    record: &NormalizedRecord,
    segments: usize,
    km_per_unit: Option<f64>,
) -> std::result::Result<MultiPolygon<f64>, Issue> {
    let mut polygons = Vec::new();
    let mut points = Vec::new();
    collect_parts(&record.geometry, &mut polygons, &mut points)?;

    if !polygons.is_empty() {
        return Ok(MultiPolygon::new(polygons));
    }
    if points.is_empty() {
        return Err(Issue::UnsupportedGeometry {
            kind: geometry_kind(&record.geometry).to_string(),
        });
    }

    let area_km2 = record
        .attributes
        .reported_area_km2
        .ok_or(Issue::PointWithoutAreaFailure)?;
    let share = area_km2 / points.len() as f64;

    let mut circles = Vec::with_capacity(points.len());
    for point in &points {
        let circle = match km_per_unit {
            Some(km) => MultiPolygon::new(vec![planar_circle(point.0, share / (km * km), segments)]),
            None => geographic_circle(point.0, share, segments).ok_or_else(|| Issue::UnsupportedGeometry {
                kind: "Point with an area larger than the globe".to_string(),
            })?,
        };
        circles.push(circle);
    }

    if circles.len() == 1 {
        return Ok(circles.remove(0));
    }
    // overlapping circles left as separate parts are merged by the repairer
    let parts: Vec<Polygon<f64>> = circles.iter().flat_map(|c| c.0.iter().cloned()).collect();
    Ok(cascaded_union(circles).unwrap_or_else(|_| MultiPolygon::new(parts)))
}

/// Split a geometry into polygons and points. Any linear member makes the
/// whole record unsupported.
fn collect_parts(
    geometry: &Geometry<f64>,
    polygons: &mut Vec<Polygon<f64>>,
    points: &mut Vec<Point<f64>>,
) -> std::result::Result<(), Issue> {
    match geometry {
        Geometry::Polygon(p) => polygons.push(p.clone()),
        Geometry::MultiPolygon(mp) => polygons.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => polygons.push(r.to_polygon()),
        Geometry::Triangle(t) => polygons.push(t.to_polygon()),
        Geometry::Point(p) => points.push(*p),
        Geometry::MultiPoint(mp) => points.extend(mp.0.iter().copied()),
        Geometry::GeometryCollection(gc) => {
            for member in gc {
                match member {
                    Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {}
                    other => collect_parts(other, polygons, points)?,
                }
            }
        }
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
            return Err(Issue::UnsupportedGeometry {
                kind: geometry_kind(geometry).to_string(),
            });
        }
    }
    Ok(())
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::geometry_area_km2;
    use geo::{line_string, point, polygon, Area, GeometryCollection, LineString, MultiPoint};
    use paclean_core::Attributes;

    fn km_params() -> ExpandParams {
        ExpandParams {
            segments: 64,
            crs: CRS::local_equal_area_km(),
        }
    }

    fn point_record(id: &str, area: Option<f64>) -> NormalizedRecord {
        let mut attrs = Attributes::new(id);
        attrs.reported_area_km2 = area;
        NormalizedRecord::new(attrs, Geometry::Point(point!(x: 0.0, y: 0.0)))
    }

    #[test]
    fn test_point_expansion_area() {
        let out = expand_points(vec![point_record("p", Some(3.14159))], &km_params());
        assert_eq!(out.records.len(), 1);
        let area = out.records[0].geometry.unsigned_area();
        assert!((area - 3.14159).abs() < 1e-9, "area = {area}");
    }

    #[test]
    fn test_point_expansion_in_metres() {
        let params = ExpandParams {
            segments: 64,
            crs: CRS::from_epsg(6933),
        };
        let out = expand_points(vec![point_record("p", Some(2.0))], &params);
        let area_m2 = out.records[0].geometry.unsigned_area();
        assert!((area_m2 - 2.0e6).abs() < 1e-3, "area = {area_m2}");
    }

    #[test]
    fn test_point_without_area() {
        let out = expand_points(vec![point_record("p", None)], &km_params());
        assert!(out.records.is_empty());
        assert_eq!(out.audit.entries()[0].issue, Issue::PointWithoutAreaFailure);
        assert_eq!(out.audit.entries()[0].stage, Stage::ExpandPoints);
    }

    #[test]
    fn test_geographic_point() {
        let mut rec = point_record("p", Some(250.0));
        rec.geometry = Geometry::Point(point!(x: -70.5, y: -33.4));
        let out = expand_points(vec![rec], &ExpandParams::default());

        let area = geometry_area_km2(&out.records[0].geometry, &CRS::wgs84());
        assert!((area - 250.0).abs() / 250.0 < 1e-3, "area = {area}");
    }

    #[test]
    fn test_multipoint_splits_area() {
        let mut rec = point_record("mp", Some(10.0));
        rec.geometry = Geometry::MultiPoint(MultiPoint::from(vec![(0.0, 0.0), (100.0, 0.0)]));
        let out = expand_points(vec![rec], &km_params());

        let geometry = &out.records[0].geometry;
        assert_eq!(geometry.0.len(), 2);
        assert!((geometry.unsigned_area() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_polygon_passes_through() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let rec = NormalizedRecord::new(Attributes::new("sq"), Geometry::Polygon(square.clone()));
        let out = expand_points(vec![rec], &km_params());
        assert_eq!(out.records[0].geometry, MultiPolygon::new(vec![square]));
    }

    #[test]
    fn test_lines_unsupported() {
        let rec = NormalizedRecord::new(
            Attributes::new("line"),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
        );
        let out = expand_points(vec![rec], &km_params());
        assert!(out.records.is_empty());
        assert_eq!(
            out.audit.entries()[0].issue,
            Issue::UnsupportedGeometry {
                kind: "LineString".to_string()
            }
        );
    }

    #[test]
    fn test_collection_keeps_polygons() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let gc = GeometryCollection::new_from(vec![
            Geometry::Polygon(square),
            Geometry::Point(point!(x: 10.0, y: 10.0)),
            Geometry::LineString(LineString::from(vec![(0.0, 0.0), (5.0, 5.0)])),
        ]);
        let rec = NormalizedRecord::new(Attributes::new("gc"), Geometry::GeometryCollection(gc));
        let out = expand_points(vec![rec], &km_params());
        assert_eq!(out.records.len(), 1);
        assert!((out.records[0].geometry.unsigned_area() - 4.0).abs() < 1e-12);
    }
}
