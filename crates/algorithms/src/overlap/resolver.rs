//! Overlap resolver
//!
//! First-registered-wins erasure. Within each realm, records are taken in
//! precedence order; each one keeps only the part of its footprint not yet
//! claimed by an earlier record, and then claims its full original
//! footprint. Records of different realms never erase each other.

use geo::MultiPolygon;
use paclean_core::{
    Algorithm, AuditEntry, AuditLog, Error, Issue, ProtectedArea, Realm, Result, Stage, Staged,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ClaimedArea, Precedence};
use crate::geometry::{
    check_validity, envelope, is_valid, make_valid, remove_slivers, BooleanOp, GeoOverlay, Overlay,
    PrecisionGrid,
};

/// Parameters for overlap resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapParams {
    pub precedence: Precedence,
    /// Grid cells per working unit, used to re-snap after a failed operation
    pub precision: f64,
    /// Residuals smaller than this count as empty, in squared working units.
    /// Defaults to one grid cell.
    pub sliver_area: Option<f64>,
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self {
            precedence: Precedence::InputOrder,
            precision: 1500.0,
            sliver_area: None,
        }
    }
}

impl OverlapParams {
    pub fn grid(&self) -> PrecisionGrid {
        PrecisionGrid::new(self.precision)
    }

    pub fn min_area(&self) -> f64 {
        self.sliver_area.unwrap_or_else(|| self.grid().cell_area())
    }
}

/// Records and drops of a resolution, keyed by input position
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub kept: Vec<(usize, ProtectedArea)>,
    pub dropped: Vec<(usize, AuditEntry)>,
}

impl Resolution {
    pub fn merge(&mut self, other: Resolution) {
        self.kept.extend(other.kept);
        self.dropped.extend(other.dropped);
    }

    /// Records and audit entries, both in input order
    pub fn into_staged(mut self) -> Staged<ProtectedArea> {
        self.kept.sort_by_key(|(index, _)| *index);
        self.dropped.sort_by_key(|(index, _)| *index);
        Staged::new(
            self.kept.into_iter().map(|(_, r)| r).collect(),
            self.dropped.into_iter().map(|(_, e)| e).collect::<AuditLog>(),
        )
    }
}

/// Overlap resolver algorithm
#[derive(Debug, Clone, Default)]
pub struct OverlapResolver;

impl Algorithm for OverlapResolver {
    type Input = Vec<ProtectedArea>;
    type Output = Staged<ProtectedArea>;
    type Params = OverlapParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "OverlapResolver"
    }

    fn description(&self) -> &'static str {
        "Erase overlaps so that every area is credited to exactly one record"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(resolve_overlaps(input, &params))
    }
}

/// Resolve overlaps between valid polygonal records.
///
/// # Arguments
/// * `records` - Valid records, in input order
/// * `params` - Precedence and precision
///
/// # Returns
/// Residual records in input order. Fully subsumed records and records whose
/// residual could not be computed are dropped with an audit entry.
pub fn resolve_overlaps(records: Vec<ProtectedArea>, params: &OverlapParams) -> Staged<ProtectedArea> {
    let total = records.len();
    let staged = resolve_indexed(records.into_iter().enumerate().collect(), params).into_staged();
    tracing::info!(
        "resolve overlaps: {} of {} records keep a residual",
        staged.records.len(),
        total
    );
    staged
}

/// Resolve overlaps among records tagged with their input position.
///
/// The positions only drive tie-breaking and output order, so any subset
/// of a batch can be resolved on its own.
pub fn resolve_indexed(records: Vec<(usize, ProtectedArea)>, params: &OverlapParams) -> Resolution {
    resolve_indexed_with(records, params, &GeoOverlay)
}

/// [`resolve_indexed`] on a chosen overlay backend
pub fn resolve_indexed_with<O: Overlay>(
    records: Vec<(usize, ProtectedArea)>,
    params: &OverlapParams,
    overlay: &O,
) -> Resolution {
    let mut by_realm: BTreeMap<Realm, Vec<(usize, ProtectedArea)>> = BTreeMap::new();
    for (index, record) in records {
        by_realm.entry(record.realm()).or_default().push((index, record));
    }

    let mut resolution = Resolution::default();
    for (realm, mut partition) in by_realm {
        tracing::debug!("resolving {} {} records", partition.len(), realm);
        params.precedence.sort(&mut partition);
        resolution.merge(resolve_partition(partition, params, overlay));
    }
    resolution
}

/// Resolve one realm partition with its own claimed-area accumulator
fn resolve_partition<O: Overlay>(
    partition: Vec<(usize, ProtectedArea)>,
    params: &OverlapParams,
    overlay: &O,
) -> Resolution {
    let mut claimed = ClaimedArea::new();
    let residuals = Residuals {
        overlay,
        grid: params.grid(),
        min_area: params.min_area(),
    };

    let mut resolution = Resolution::default();
    for (index, record) in partition {
        match residuals.compute(&record.geometry, &claimed) {
            Ok(residual) => {
                claimed.claim(&record.geometry);
                if residual.0.is_empty() {
                    resolution.dropped.push((
                        index,
                        AuditEntry::new(record.id(), Stage::ResolveOverlaps, Issue::FullySubsumed),
                    ));
                } else if residual == record.geometry {
                    resolution.kept.push((index, record));
                } else {
                    resolution.kept.push((index, record.with_geometry(residual)));
                }
            }
            Err(reason) => {
                tracing::warn!("record {} dropped: {}", record.id(), reason);
                resolution.dropped.push((
                    index,
                    AuditEntry::new(record.id(), Stage::ResolveOverlaps, Issue::OverlapResolutionFailure { reason }),
                ));
            }
        }
    }
    resolution
}

struct Residuals<'a, O> {
    overlay: &'a O,
    grid: PrecisionGrid,
    min_area: f64,
}

impl<O: Overlay> Residuals<'_, O> {
    /// `geometry` minus every claimed polygon near it
    fn compute(&self, geometry: &MultiPolygon<f64>, claimed: &ClaimedArea) -> std::result::Result<MultiPolygon<f64>, String> {
        let Some(env) = envelope(geometry) else {
            return Ok(MultiPolygon::new(vec![]));
        };
        let candidates = claimed.candidates(&env);
        if candidates.is_empty() {
            return Ok(geometry.clone());
        }

        // one claimed polygon at a time: parts of the claim may overlap each other
        let mut residual = geometry.clone();
        for polygon in candidates {
            if residual.0.is_empty() {
                break;
            }
            let claim = MultiPolygon::new(vec![polygon.clone()]);
            residual = self
                .overlay
                .apply_with_retry(&residual, &claim, BooleanOp::Difference, &self.grid)
                .map_err(|failure| failure.to_string())?;
        }
        self.settle(residual)
    }

    /// Snap a residual back onto the grid, drop slivers and give an invalid
    /// result one repair attempt
    fn settle(&self, residual: MultiPolygon<f64>) -> std::result::Result<MultiPolygon<f64>, String> {
        let snapped = remove_slivers(&self.grid.snap(&residual), self.min_area);
        if snapped.0.is_empty() || is_valid(&snapped) {
            return Ok(snapped);
        }
        let rebuilt = make_valid(&snapped).map_err(|failure| failure.to_string())?;
        let snapped = remove_slivers(&self.grid.snap(&rebuilt), self.min_area);
        check_validity(&snapped).map_err(|problem| format!("residual still invalid: {problem}"))?;
        Ok(snapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{boolean_op, BooleanOpFailure};
    use geo::{polygon, Area, BooleanOps};
    use paclean_core::Attributes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rect(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> ProtectedArea {
        ProtectedArea::new(
            Attributes::new(id),
            MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x1, y: y0),
                (x: x1, y: y1),
                (x: x0, y: y1),
            ]]),
        )
    }

    fn params() -> OverlapParams {
        OverlapParams {
            precision: 1000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_registered_wins() {
        let out = resolve_overlaps(
            vec![rect("a", 0.0, 0.0, 10.0, 10.0), rect("b", 5.0, 0.0, 15.0, 10.0)],
            &params(),
        );
        assert_eq!(out.records.len(), 2);
        assert!((out.records[0].geometry.unsigned_area() - 100.0).abs() < 1e-9);
        assert!((out.records[1].geometry.unsigned_area() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_nested_is_subsumed() {
        let out = resolve_overlaps(
            vec![rect("outer", 0.0, 0.0, 10.0, 10.0), rect("inner", 2.0, 2.0, 4.0, 4.0)],
            &params(),
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].id(), "outer");
        assert_eq!(out.audit.entries()[0].issue, Issue::FullySubsumed);
        assert_eq!(out.audit.entries()[0].record_id, "inner");
    }

    #[test]
    fn test_inner_first_punches_hole() {
        let out = resolve_overlaps(
            vec![rect("inner", 2.0, 2.0, 4.0, 4.0), rect("outer", 0.0, 0.0, 10.0, 10.0)],
            &params(),
        );
        assert_eq!(out.records.len(), 2);
        let outer = &out.records[1].geometry;
        assert!((outer.unsigned_area() - 96.0).abs() < 1e-6);
        assert_eq!(outer.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_realms_never_erase_each_other() {
        let land = rect("land", 0.0, 0.0, 10.0, 10.0);
        let mut sea = rect("sea", 5.0, 0.0, 15.0, 10.0);
        sea.attributes.realm = Realm::Marine;

        let out = resolve_overlaps(vec![land, sea], &params());
        assert_eq!(out.records.len(), 2);
        assert!((out.records[1].geometry.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_precedence_by_year() {
        let mut late = rect("late", 0.0, 0.0, 10.0, 10.0);
        late.attributes.established_year = Some(2001);
        let mut early = rect("early", 5.0, 0.0, 15.0, 10.0);
        early.attributes.established_year = Some(1960);

        let params = OverlapParams {
            precedence: Precedence::EstablishedYear,
            ..params()
        };
        let out = resolve_overlaps(vec![late, early], &params);
        // output keeps input order; the earlier designation keeps the overlap
        assert_eq!(out.records[0].id(), "late");
        assert!((out.records[0].geometry.unsigned_area() - 50.0).abs() < 1e-6);
        assert!((out.records[1].geometry.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_pairwise_overlap() {
        let records: Vec<_> = (0..12)
            .map(|i| {
                let x = (i % 4) as f64 * 3.0;
                let y = (i / 4) as f64 * 3.0;
                rect(&format!("r{i}"), x, y, x + 5.0, y + 5.0)
            })
            .collect();
        let out = resolve_overlaps(records, &params());

        for (i, a) in out.records.iter().enumerate() {
            for b in out.records.iter().skip(i + 1) {
                let overlap = a.geometry.intersection(&b.geometry).unsigned_area();
                assert!(overlap < 1e-6, "{} and {} overlap by {overlap}", a.id(), b.id());
            }
        }
    }

    #[test]
    fn test_sliver_residual_is_subsumed() {
        let params = OverlapParams {
            precision: 1000.0,
            sliver_area: Some(0.5),
            ..Default::default()
        };
        let out = resolve_overlaps(
            vec![rect("a", 0.0, 0.0, 10.0, 10.0), rect("b", 0.0, 0.0, 10.0, 10.01)],
            &params,
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.audit.entries()[0].issue, Issue::FullySubsumed);
    }

    /// Geo overlay that fails every operation on one record's footprint
    struct FailsOn {
        footprint: MultiPolygon<f64>,
        failures: AtomicUsize,
    }

    impl Overlay for FailsOn {
        fn apply(
            &self,
            a: &MultiPolygon<f64>,
            b: &MultiPolygon<f64>,
            op: BooleanOp,
        ) -> std::result::Result<MultiPolygon<f64>, BooleanOpFailure> {
            if *a == self.footprint {
                self.failures.fetch_add(1, Ordering::SeqCst);
                return Err(BooleanOpFailure::new(op, "degenerate overlay"));
            }
            boolean_op(a, b, op)
        }
    }

    #[test]
    fn test_failed_record_is_audited_and_not_claimed() {
        // b fails; c only overlaps b and must keep its full footprint
        let records = vec![
            rect("a", 0.0, 0.0, 10.0, 10.0),
            rect("b", 5.0, 0.0, 15.0, 10.0),
            rect("c", 12.0, 0.0, 20.0, 10.0),
        ];
        let overlay = FailsOn {
            footprint: records[1].geometry.clone(),
            failures: AtomicUsize::new(0),
        };

        let indexed = records.into_iter().enumerate().collect();
        let out = resolve_indexed_with(indexed, &params(), &overlay).into_staged();

        let ids: Vec<_> = out.records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!((out.records[1].geometry.unsigned_area() - 80.0).abs() < 1e-9);

        assert_eq!(out.audit.len(), 1);
        let entry = &out.audit.entries()[0];
        assert_eq!(entry.record_id, "b");
        assert_eq!(entry.stage, Stage::ResolveOverlaps);
        assert!(matches!(entry.issue, Issue::OverlapResolutionFailure { .. }));

        // first attempt plus one retry after re-snapping
        assert_eq!(overlay.failures.load(Ordering::SeqCst), 2);
    }
}
