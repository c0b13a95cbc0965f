//! Area recomputer
//!
//! `computed_area_km2` is always derived from the stored geometry, never
//! taken from the provider.

use geo::{Area, BoundingRect, MultiPolygon};
use paclean_core::{Algorithm, AuditEntry, Error, Issue, ProtectedArea, Result, Stage, Staged, CRS};
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use crate::projection::EqualAreaProjection;
use crate::stage::{collect_outcomes, Outcome};

/// Parameters for area recomputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaParams {
    /// Working CRS of the records
    pub crs: CRS,
    /// Relative difference between computed and reported area above which an
    /// informational note is written. `None` disables the check.
    pub discrepancy_ratio: Option<f64>,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self {
            crs: CRS::wgs84(),
            discrepancy_ratio: None,
        }
    }
}

/// Area recomputer algorithm
#[derive(Debug, Clone, Default)]
pub struct AreaRecomputer;

impl Algorithm for AreaRecomputer {
    type Input = Vec<ProtectedArea>;
    type Output = Staged<ProtectedArea>;
    type Params = AreaParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "AreaRecomputer"
    }

    fn description(&self) -> &'static str {
        "Recompute record areas in km² under an equal-area projection"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(recompute_areas(input, &params))
    }
}

/// Area of a multipolygon in km².
///
/// Geographic coordinates are projected with an equal-area projection chosen
/// for the geometry's extent; coordinates in an equal-area projected CRS are
/// measured directly and scaled by the CRS unit.
pub fn geometry_area_km2(mp: &MultiPolygon<f64>, crs: &CRS) -> f64 {
    match crs.units().km_per_unit() {
        Some(km) => mp.unsigned_area() * km * km,
        None => match mp.bounding_rect() {
            Some(extent) => EqualAreaProjection::for_extent(&extent)
                .project(mp)
                .unsigned_area(),
            None => 0.0,
        },
    }
}

/// Recompute `computed_area_km2` for every record.
///
/// No record is dropped. With a discrepancy ratio set, records whose
/// computed area differs from the reported one by more than the ratio get
/// an `AreaDiscrepancy` note.
pub fn recompute_areas(records: Vec<ProtectedArea>, params: &AreaParams) -> Staged<ProtectedArea> {
    let outcomes: Vec<_> = records
        .into_par_iter()
        .map(|mut record| {
            let computed = geometry_area_km2(&record.geometry, &params.crs);
            record.computed_area_km2 = Some(computed);

            let mut notes = Vec::new();
            if let (Some(ratio), Some(reported)) = (params.discrepancy_ratio, record.attributes.reported_area_km2) {
                if reported > 0.0 && (computed - reported).abs() / reported > ratio {
                    notes.push(AuditEntry::new(
                        record.id(),
                        Stage::RecomputeArea,
                        Issue::AreaDiscrepancy {
                            reported_km2: reported,
                            computed_km2: computed,
                        },
                    ));
                }
            }
            Outcome::Kept(record, notes)
        })
        .collect();

    let staged = collect_outcomes(outcomes);
    let total: f64 = staged.records.iter().filter_map(|r| r.computed_area_km2).sum();
    tracing::info!("area: {} records, {:.3} km² total", staged.records.len(), total);
    staged
}
