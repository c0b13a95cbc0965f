//! Dissolver
//!
//! Unattributed union of all records by balanced cascaded union. Cheaper
//! than overlap resolution since no per-record bookkeeping is kept; used
//! when only the total footprint matters.

use geo::MultiPolygon;
use paclean_core::{Algorithm, AuditEntry, AuditLog, Error, Issue, ProtectedArea, Result, Stage, CRS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::area::geometry_area_km2;
use crate::geometry::{remove_slivers, BooleanOp, GeoOverlay, Overlay, PrecisionGrid, GEOGRAPHIC_PRECISION};
use crate::maybe_rayon::*;

/// Parameters for dissolving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissolveParams {
    /// Grid cells per working unit (default: the geographic grid, matching
    /// the default CRS)
    pub precision: f64,
    /// Working CRS, for the area of the result
    pub crs: CRS,
    /// Parts and holes of the result smaller than this are removed.
    /// Defaults to one grid cell.
    pub sliver_area: Option<f64>,
}

impl Default for DissolveParams {
    fn default() -> Self {
        Self {
            precision: GEOGRAPHIC_PRECISION,
            crs: CRS::wgs84(),
            sliver_area: None,
        }
    }
}

/// Single non-overlapping footprint of a set of records
#[derive(Debug, Clone)]
pub struct DissolveOutput {
    pub geometry: MultiPolygon<f64>,
    pub area_km2: f64,
    /// Records that could not be merged
    pub audit: AuditLog,
}

/// Dissolver algorithm
#[derive(Debug, Clone, Default)]
pub struct Dissolver;

impl Algorithm for Dissolver {
    type Input = Vec<ProtectedArea>;
    type Output = DissolveOutput;
    type Params = DissolveParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dissolver"
    }

    fn description(&self) -> &'static str {
        "Union all records into one unattributed footprint"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(dissolve(&input, &params))
    }
}

/// Dissolve all records into one multipolygon.
///
/// # Arguments
/// * `records` - Valid polygonal records
/// * `params` - Precision and working CRS
///
/// # Returns
/// The union, its area in km² and an audit entry for every record that
/// could not be merged
pub fn dissolve(records: &[ProtectedArea], params: &DissolveParams) -> DissolveOutput {
    dissolve_with(records, params, &GeoOverlay)
}

/// [`dissolve`] on a chosen overlay backend
pub fn dissolve_with<O: Overlay>(
    records: &[ProtectedArea],
    params: &DissolveParams,
    overlay: &O,
) -> DissolveOutput {
    let refs: Vec<&ProtectedArea> = records.iter().collect();
    dissolve_refs(&refs, params, overlay)
}

/// Dissolve records separately per key, e.g. per realm.
pub fn dissolve_by<K, F>(records: &[ProtectedArea], key: F, params: &DissolveParams) -> BTreeMap<K, DissolveOutput>
where
    K: Ord,
    F: Fn(&ProtectedArea) -> K,
{
    let mut groups: BTreeMap<K, Vec<&ProtectedArea>> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(k, group)| (k, dissolve_refs(&group, params, &GeoOverlay)))
        .collect()
}

/// A subtree of the union: which records it covers and their union
struct Node {
    members: Vec<usize>,
    geometry: MultiPolygon<f64>,
}

fn dissolve_refs<O: Overlay>(records: &[&ProtectedArea], params: &DissolveParams, overlay: &O) -> DissolveOutput {
    let grid = PrecisionGrid::new(params.precision);
    let min_area = params.sliver_area.unwrap_or_else(|| grid.cell_area());

    let mut nodes: Vec<Node> = records
        .iter()
        .enumerate()
        .map(|(i, r)| Node {
            members: vec![i],
            geometry: r.geometry.clone(),
        })
        .collect();
    let mut audit = AuditLog::new();

    while nodes.len() > 1 {
        let mut pairs = Vec::with_capacity(nodes.len() / 2 + 1);
        let mut iter = nodes.into_iter();
        while let Some(a) = iter.next() {
            pairs.push((a, iter.next()));
        }

        let merged: Vec<(Node, Vec<AuditEntry>)> = pairs
            .into_par_iter()
            .map(|(a, b)| match b {
                Some(b) => merge(a, b, records, &grid, overlay),
                None => (a, Vec::new()),
            })
            .collect();

        nodes = Vec::with_capacity(merged.len());
        for (node, entries) in merged {
            entries.into_iter().for_each(|e| audit.push(e));
            nodes.push(node);
        }
    }

    let geometry = nodes
        .pop()
        .map(|node| remove_slivers(&grid.snap(&node.geometry), min_area))
        .unwrap_or_else(|| MultiPolygon::new(vec![]));
    let area_km2 = geometry_area_km2(&geometry, &params.crs);
    tracing::info!(
        "dissolve: {} records into {} polygons, {:.3} km²",
        records.len(),
        geometry.0.len(),
        area_km2
    );

    DissolveOutput {
        geometry,
        area_km2,
        audit,
    }
}

fn merge<O: Overlay>(
    a: Node,
    b: Node,
    records: &[&ProtectedArea],
    grid: &PrecisionGrid,
    overlay: &O,
) -> (Node, Vec<AuditEntry>) {
    match overlay.apply_with_retry(&a.geometry, &b.geometry, BooleanOp::Union, grid) {
        Ok(geometry) => {
            let mut members = a.members;
            members.extend(b.members);
            (Node { members, geometry }, Vec::new())
        }
        Err(failure) => {
            tracing::debug!("{failure}; rebuilding subtree of {} records", a.members.len() + b.members.len());
            let mut members = a.members;
            members.extend(b.members);
            rebuild(members, records, grid, overlay)
        }
    }
}

/// Fold a subtree's records one at a time, leaving out the ones that
/// cannot be merged
fn rebuild<O: Overlay>(
    members: Vec<usize>,
    records: &[&ProtectedArea],
    grid: &PrecisionGrid,
    overlay: &O,
) -> (Node, Vec<AuditEntry>) {
    let mut geometry = MultiPolygon::new(vec![]);
    let mut kept = Vec::with_capacity(members.len());
    let mut entries = Vec::new();

    for index in members {
        let record = records[index];
        match overlay.apply_with_retry(&geometry, &record.geometry, BooleanOp::Union, grid) {
            Ok(union) => {
                geometry = union;
                kept.push(index);
            }
            Err(failure) => {
                tracing::warn!("record {} left out of the dissolve: {}", record.id(), failure);
                entries.push(AuditEntry::new(
                    record.id(),
                    Stage::Dissolve,
                    Issue::OverlapResolutionFailure {
                        reason: failure.to_string(),
                    },
                ));
            }
        }
    }

    (Node { members: kept, geometry }, entries)
}
