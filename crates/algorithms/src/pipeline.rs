//! Cleaning pipeline
//!
//! normalize → expand points → repair → resolve overlaps (optional) →
//! recompute area
//!
//! The only batch-level error is invalid configuration. Every record-level
//! problem ends up in the returned [`AuditLog`].

use paclean_core::{
    Algorithm, AuditLog, Error, FeatureCollection, ProtectedArea, Result, Staged, CRS,
};
use serde::{Deserialize, Serialize};

use crate::area::{recompute_areas, AreaParams};
use crate::dissolve::DissolveParams;
use crate::expand::{expand_points, ExpandParams, MIN_SEGMENTS};
use crate::geometry::PrecisionGrid;
use crate::normalize::{normalize, NormalizeParams};
use crate::overlap::{resolve_overlaps, OverlapParams, Precedence};
use crate::repair::{repair_records, RepairParams};

/// Parameters for the whole pipeline. Every field has a default, so a
/// JSON file only needs the fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanParams {
    /// Working CRS of the input. Geographic or a known equal-area projection.
    pub crs: CRS,
    /// Grid cells per working unit. Higher keeps more boundary detail at a
    /// superlinear cost. Unset means 1e6 per degree for geographic input
    /// (about 0.11 m) and 1500 per unit for projected input.
    pub geometry_precision: Option<f64>,
    /// Resolve overlaps; when off, overlapping records are emitted as-is
    pub erase_overlaps: bool,
    pub normalize: NormalizeParams,
    /// Segments per expanded circle (default: 64)
    pub segments: usize,
    pub max_repair_attempts: usize,
    /// Sliver threshold in squared working units (default: one grid cell)
    pub sliver_area: Option<f64>,
    pub precedence: Precedence,
    /// Note records whose computed area differs from the reported one by
    /// more than this ratio
    pub area_discrepancy_ratio: Option<f64>,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            crs: CRS::wgs84(),
            geometry_precision: None,
            erase_overlaps: true,
            normalize: NormalizeParams::default(),
            segments: 64,
            max_repair_attempts: 3,
            sliver_area: None,
            precedence: Precedence::InputOrder,
            area_discrepancy_ratio: None,
        }
    }
}

impl CleanParams {
    /// Grid cells per working unit actually used
    pub fn precision(&self) -> f64 {
        self.geometry_precision
            .unwrap_or_else(|| PrecisionGrid::default_precision(&self.crs))
    }

    /// Check the configuration before any record is touched
    pub fn validate(&self) -> Result<()> {
        let precision = self.precision();
        if !precision.is_finite() || precision <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "geometry_precision",
                value: precision.to_string(),
                reason: "must be a positive number".into(),
            });
        }
        if self.segments < MIN_SEGMENTS {
            return Err(Error::InvalidParameter {
                name: "segments",
                value: self.segments.to_string(),
                reason: format!("circles need at least {MIN_SEGMENTS} segments"),
            });
        }
        if let Some(area) = self.sliver_area {
            if !area.is_finite() || area < 0.0 {
                return Err(Error::InvalidParameter {
                    name: "sliver_area",
                    value: area.to_string(),
                    reason: "must be zero or positive".into(),
                });
            }
        }
        if let Some(ratio) = self.area_discrepancy_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(Error::InvalidParameter {
                    name: "area_discrepancy_ratio",
                    value: ratio.to_string(),
                    reason: "must be zero or positive".into(),
                });
            }
        }
        if !self.crs.is_geographic() && !self.crs.is_equal_area() {
            return Err(Error::CrsNotEqualArea(self.crs.identifier()));
        }
        Ok(())
    }

    pub fn expand_params(&self) -> ExpandParams {
        ExpandParams {
            segments: self.segments,
            crs: self.crs.clone(),
        }
    }

    pub fn repair_params(&self) -> RepairParams {
        RepairParams {
            precision: self.precision(),
            max_attempts: self.max_repair_attempts,
            sliver_area: self.sliver_area,
        }
    }

    pub fn overlap_params(&self) -> OverlapParams {
        OverlapParams {
            precedence: self.precedence,
            precision: self.precision(),
            sliver_area: self.sliver_area,
        }
    }

    pub fn area_params(&self) -> AreaParams {
        AreaParams {
            crs: self.crs.clone(),
            discrepancy_ratio: self.area_discrepancy_ratio,
        }
    }

    pub fn dissolve_params(&self) -> DissolveParams {
        DissolveParams {
            precision: self.precision(),
            crs: self.crs.clone(),
            sliver_area: self.sliver_area,
        }
    }
}

/// Cleaned records plus the audit trail of every stage
#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub records: Vec<ProtectedArea>,
    pub audit: AuditLog,
}

/// Full cleaning pipeline as an algorithm
#[derive(Debug, Clone, Default)]
pub struct Cleaner;

impl Algorithm for Cleaner {
    type Input = FeatureCollection;
    type Output = CleanOutput;
    type Params = CleanParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Cleaner"
    }

    fn description(&self) -> &'static str {
        "Normalize, expand, repair, de-overlap and measure protected-area records"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        clean(input, &params)
    }
}

/// Run the full pipeline.
///
/// # Arguments
/// * `features` - Raw provider features in the working CRS
/// * `params` - Pipeline configuration
///
/// # Returns
/// Valid polygonal records with recomputed areas, in input order, and the
/// merged audit log. Fails only when `params` is invalid.
pub fn clean(features: FeatureCollection, params: &CleanParams) -> Result<CleanOutput> {
    let staged = prepare(features, params)?;
    let staged = if params.erase_overlaps {
        let mut audit = staged.audit;
        let resolved = resolve_overlaps(staged.records, &params.overlap_params());
        audit.merge(resolved.audit);
        Staged::new(resolved.records, audit)
    } else {
        tracing::info!("overlap resolution disabled, {} records kept as-is", staged.records.len());
        staged
    };
    Ok(finish(staged, params))
}

/// Normalize, expand and repair: everything up to overlap resolution
pub fn prepare(features: FeatureCollection, params: &CleanParams) -> Result<Staged<ProtectedArea>> {
    params.validate()?;
    tracing::info!(
        "cleaning {} features in {} at precision {}",
        features.len(),
        params.crs,
        params.precision()
    );

    let mut audit = AuditLog::new();

    let normalized = normalize(features, &params.normalize);
    audit.merge(normalized.audit);

    let expanded = expand_points(normalized.records, &params.expand_params());
    audit.merge(expanded.audit);

    let repaired = repair_records(expanded.records, &params.repair_params());
    audit.merge(repaired.audit);

    Ok(Staged::new(repaired.records, audit))
}

/// Recompute areas of the final geometries
pub fn finish(staged: Staged<ProtectedArea>, params: &CleanParams) -> CleanOutput {
    let mut audit = staged.audit;
    let measured = recompute_areas(staged.records, &params.area_params());
    audit.merge(measured.audit);

    tracing::info!(
        "clean: {} records out, {} dropped",
        measured.records.len(),
        audit.drops().count()
    );
    CleanOutput {
        records: measured.records,
        audit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::geometry_area_km2;
    use geo::{polygon, Geometry, MultiPolygon, Point};
    use paclean_core::{Feature, Stage};

    fn params() -> CleanParams {
        CleanParams {
            crs: CRS::local_equal_area_km(),
            geometry_precision: Some(1000.0),
            ..Default::default()
        }
    }

    fn feature(id: &str, geometry: Geometry<f64>) -> Feature {
        Feature::new(geometry)
            .with_id(id)
            .with_property("status", "Designated")
            .with_property("realm", "terrestrial")
    }

    fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ])
    }

    #[test]
    fn test_default_params_valid() {
        assert!(CleanParams::default().validate().is_ok());
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_precision() {
        let p = CleanParams {
            geometry_precision: Some(0.0),
            ..params()
        };
        assert!(matches!(
            p.validate(),
            Err(Error::InvalidParameter { name: "geometry_precision", .. })
        ));
    }

    #[test]
    fn test_rejects_non_equal_area_crs() {
        let p = CleanParams {
            crs: CRS::from_epsg(3857),
            ..params()
        };
        assert!(matches!(p.validate(), Err(Error::CrsNotEqualArea(_))));
        assert!(clean(FeatureCollection::new(), &p).is_err());
    }

    #[test]
    fn test_rejects_few_segments() {
        let p = CleanParams {
            segments: 4,
            ..params()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_partial_json_config() {
        let p: CleanParams =
            serde_json::from_str(r#"{"geometry_precision": 100.0, "precedence": "established-year"}"#).unwrap();
        assert_eq!(p.geometry_precision, Some(100.0));
        assert_eq!(p.precedence, Precedence::EstablishedYear);
        assert!(p.erase_overlaps);
        assert_eq!(p.segments, 64);
    }

    #[test]
    fn test_clean_mixed_batch() {
        let features: FeatureCollection = vec![
            feature("a", square(0.0, 0.0, 10.0)),
            feature("b", square(5.0, 0.0, 10.0)),
            feature("pt", Geometry::Point(Point::new(30.0, 30.0))).with_property("reported_area_km2", 2.0),
            feature("nope", square(0.0, 0.0, 1.0)).with_property("status", "Proposed"),
        ]
        .into_iter()
        .collect();

        let out = clean(features, &params()).unwrap();
        let ids: Vec<_> = out.records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "b", "pt"]);

        let areas: Vec<f64> = out.records.iter().map(|r| r.computed_area_km2.unwrap()).collect();
        assert!((areas[0] - 100.0).abs() < 1e-6);
        assert!((areas[1] - 50.0).abs() < 1e-6);
        assert!((areas[2] - 2.0).abs() / 2.0 < 1e-3);

        let summary = out.audit.summary();
        assert_eq!(summary.count(Stage::Normalize, "UnsupportedStatusExclusion"), 1);
    }

    #[test]
    fn test_small_geographic_sites_keep_area() {
        let side_lat = 0.1 / 111.195;
        let side_lon = side_lat / 1f64.to_radians().cos();
        let hectare = polygon![
            (x: 10.0, y: 1.0),
            (x: 10.0 + side_lon, y: 1.0),
            (x: 10.0 + side_lon, y: 1.0 + side_lat),
            (x: 10.0, y: 1.0 + side_lat),
        ];
        let expected = geometry_area_km2(&MultiPolygon::new(vec![hectare.clone()]), &CRS::wgs84());
        assert!((expected - 0.01).abs() < 2e-4, "expected = {expected}");

        let features: FeatureCollection = vec![
            feature("hectare", Geometry::Polygon(hectare)),
            feature("small", Geometry::Point(Point::new(10.0, 45.0))).with_property("reported_area_km2", 0.01),
            feature("medium", Geometry::Point(Point::new(10.5, 45.0))).with_property("reported_area_km2", 0.1),
        ]
        .into_iter()
        .collect();
        let out = clean(features, &CleanParams::default()).unwrap();
        assert_eq!(out.records.len(), 3);
        assert!(out.audit.is_empty());

        for (record, target) in out.records.iter().zip([expected, 0.01, 0.1]) {
            let area = record.computed_area_km2.unwrap();
            assert!(
                (area - target).abs() / target < 0.01,
                "{}: {area} vs {target}",
                record.id()
            );
        }
    }

    #[test]
    fn test_keep_overlaps() {
        let features: FeatureCollection = vec![
            feature("a", square(0.0, 0.0, 10.0)),
            feature("b", square(5.0, 0.0, 10.0)),
        ]
        .into_iter()
        .collect();
        let p = CleanParams {
            erase_overlaps: false,
            ..params()
        };
        let out = clean(features, &p).unwrap();
        assert_eq!(out.records.len(), 2);
        assert!((out.records[1].computed_area_km2.unwrap() - 100.0).abs() < 1e-6);
    }
}
