//! Geometry repairer
//!
//! Snap to the precision grid, then alternate validation and repair until
//! the geometry is valid or the attempt budget runs out. Every repair is
//! followed by a fresh snap, since the overlay engine emits off-grid
//! coordinates.

use geo::MultiPolygon;
use paclean_core::{Algorithm, AuditEntry, Error, Issue, ProtectedArea, Result, Stage, Staged};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{check_validity, make_valid, remove_slivers, PrecisionGrid};
use crate::maybe_rayon::*;
use crate::stage::{collect_outcomes, Outcome};

/// Parameters for geometry repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairParams {
    /// Grid cells per working unit (default: 1500)
    pub precision: f64,
    /// Repair passes allowed after the first validation (default: 3)
    pub max_attempts: usize,
    /// Parts and holes smaller than this are removed, in squared working
    /// units. Defaults to one grid cell.
    pub sliver_area: Option<f64>,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            precision: 1500.0,
            max_attempts: 3,
            sliver_area: None,
        }
    }
}

impl RepairParams {
    pub fn grid(&self) -> PrecisionGrid {
        PrecisionGrid::new(self.precision)
    }

    pub fn min_area(&self) -> f64 {
        self.sliver_area.unwrap_or_else(|| self.grid().cell_area())
    }
}

/// Why a geometry could not be repaired
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    #[error("still invalid after {attempts} attempts: {problem}")]
    Exhausted { attempts: usize, problem: String },

    #[error("collapsed below the precision grid")]
    Collapsed,
}

impl From<RepairError> for Issue {
    fn from(err: RepairError) -> Self {
        match err {
            RepairError::Exhausted { attempts, problem } => Issue::GeometryRepairFailure { attempts, problem },
            RepairError::Collapsed => Issue::CollapsedBelowPrecision,
        }
    }
}

/// Geometry repairer algorithm
#[derive(Debug, Clone, Default)]
pub struct GeometryRepairer;

impl Algorithm for GeometryRepairer {
    type Input = Vec<ProtectedArea>;
    type Output = Staged<ProtectedArea>;
    type Params = RepairParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GeometryRepairer"
    }

    fn description(&self) -> &'static str {
        "Snap geometry to a precision grid and repair invalid topology"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(repair_records(input, &params))
    }
}

/// Snap and repair one geometry.
///
/// Valid input that is already on the grid comes back unchanged, so
/// repairing the output again is a no-op.
///
/// # Returns
/// A valid, snapped geometry with no part or hole below the sliver area
pub fn repair_geometry(mp: &MultiPolygon<f64>, params: &RepairParams) -> std::result::Result<MultiPolygon<f64>, RepairError> {
    let grid = params.grid();
    let min_area = params.min_area();

    let mut current = remove_slivers(&grid.snap(mp), min_area);
    let mut attempts = 0;
    loop {
        if current.0.is_empty() {
            return Err(RepairError::Collapsed);
        }
        let problem = match check_validity(&current) {
            Ok(()) => return Ok(current),
            Err(problem) => problem,
        };
        if attempts == params.max_attempts {
            return Err(RepairError::Exhausted {
                attempts,
                problem: problem.to_string(),
            });
        }
        attempts += 1;

        let rebuilt = make_valid(&current).map_err(|failure| RepairError::Exhausted {
            attempts,
            problem: failure.to_string(),
        })?;
        current = remove_slivers(&grid.snap(&rebuilt), min_area);
    }
}

/// Repair every record.
///
/// # Returns
/// Records with valid geometry in input order. Records that cannot be
/// repaired or collapse entirely are dropped with an audit entry.
pub fn repair_records(records: Vec<ProtectedArea>, params: &RepairParams) -> Staged<ProtectedArea> {
    let outcomes: Vec<_> = records
        .into_par_iter()
        .map(|record| match repair_geometry(&record.geometry, params) {
            Ok(geometry) => Outcome::kept(record.with_geometry(geometry)),
            Err(err) => {
                tracing::warn!("record {} dropped: {}", record.id(), err);
                Outcome::Dropped(AuditEntry::new(record.id(), Stage::Repair, err.into()))
            }
        })
        .collect();

    let staged = collect_outcomes(outcomes);
    tracing::info!(
        "repair: {} valid records, {} dropped",
        staged.records.len(),
        staged.audit.len()
    );
    staged
}
