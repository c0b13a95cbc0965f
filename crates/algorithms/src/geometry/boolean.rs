//! Guarded polygon boolean operations
//!
//! The overlay engine can panic on numerically degenerate input. Every
//! operation here runs inside `catch_unwind`, so a bad record turns into a
//! [`BooleanOpFailure`] for that record instead of aborting the batch.

use geo::{BooleanOps, MultiPolygon, Polygon};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

use super::PrecisionGrid;
use crate::maybe_rayon::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{op:?} failed: {message}")]
pub struct BooleanOpFailure {
    pub op: BooleanOp,
    pub message: String,
}

impl BooleanOpFailure {
    pub fn new(op: BooleanOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// Run one boolean operation, converting a panic or a non-finite result
/// into an error
pub fn boolean_op(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
    op: BooleanOp,
) -> Result<MultiPolygon<f64>, BooleanOpFailure> {
    let result = catch_unwind(AssertUnwindSafe(|| match op {
        BooleanOp::Union => a.union(b),
        BooleanOp::Difference => a.difference(b),
        BooleanOp::Intersection => a.intersection(b),
    }))
    .map_err(|payload| {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "overlay panicked".to_string()
        };
        BooleanOpFailure::new(op, message)
    })?;

    let finite = result
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ring| ring.coords())
        .all(|c| c.x.is_finite() && c.y.is_finite());
    if !finite {
        return Err(BooleanOpFailure::new(op, "non-finite coordinate in result"));
    }
    Ok(result)
}

/// Polygon overlay backend of the overlap resolver and the dissolver
pub trait Overlay: Sync {
    fn apply(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
        op: BooleanOp,
    ) -> Result<MultiPolygon<f64>, BooleanOpFailure>;

    /// Apply `op`; on failure re-snap both operands to `grid` and try
    /// exactly once more
    fn apply_with_retry(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
        op: BooleanOp,
        grid: &PrecisionGrid,
    ) -> Result<MultiPolygon<f64>, BooleanOpFailure> {
        match self.apply(a, b, op) {
            Ok(result) => Ok(result),
            Err(first) => {
                tracing::debug!("{first}; retrying after re-snap");
                self.apply(&grid.snap(a), &grid.snap(b), op)
            }
        }
    }
}

/// The `geo` overlay engine behind [`boolean_op`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoOverlay;

impl Overlay for GeoOverlay {
    fn apply(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
        op: BooleanOp,
    ) -> Result<MultiPolygon<f64>, BooleanOpFailure> {
        boolean_op(a, b, op)
    }
}

/// Union of many geometries by balanced pairwise reduction.
///
/// Each level merges neighbours `(0,1), (2,3), ...`, so the number of
/// vertices in any single operation stays close to the size of the output
/// rather than growing with every fold step.
pub fn cascaded_union(
    mut parts: Vec<MultiPolygon<f64>>,
) -> Result<MultiPolygon<f64>, BooleanOpFailure> {
    parts.retain(|p| !p.0.is_empty());
    while parts.len() > 1 {
        let mut pairs = Vec::with_capacity(parts.len() / 2 + 1);
        let mut iter = parts.into_iter();
        while let Some(a) = iter.next() {
            pairs.push((a, iter.next()));
        }
        parts = pairs
            .into_par_iter()
            .map(|(a, b)| match b {
                Some(b) => boolean_op(&a, &b, BooleanOp::Union),
                None => Ok(a),
            })
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![])))
}

/// Rebuild a multipolygon with the overlay engine.
///
/// Each shell and each hole is passed through a self-union, which resolves
/// self-intersections into simple rings. Holes are then subtracted from
/// their shell and the resulting parts merged, so overlapping parts become
/// one polygon.
pub fn make_valid(mp: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, BooleanOpFailure> {
    let mut parts = Vec::with_capacity(mp.0.len());
    for poly in mp {
        let shell = self_union(Polygon::new(poly.exterior().clone(), vec![]))?;
        if poly.interiors().is_empty() {
            parts.push(shell);
            continue;
        }
        let holes = poly
            .interiors()
            .iter()
            .map(|ring| self_union(Polygon::new(ring.clone(), vec![])))
            .collect::<Result<Vec<_>, _>>()?;
        let holes = cascaded_union(holes)?;
        parts.push(boolean_op(&shell, &holes, BooleanOp::Difference)?);
    }
    cascaded_union(parts)
}

fn self_union(poly: Polygon<f64>) -> Result<MultiPolygon<f64>, BooleanOpFailure> {
    let mp = MultiPolygon::new(vec![poly]);
    boolean_op(&mp, &mp, BooleanOp::Union)
}
