//! # paclean Algorithms
//!
//! Cleaning stages for protected-area records.
//!
//! ## Stages
//!
//! - **normalize**: typed attributes, sentinel codes, status and designation filters
//! - **expand**: point records to equal-area circles
//! - **repair**: precision grid snapping and topology repair
//! - **overlap**: first-registered-wins erasure within each realm
//! - **area**: equal-area recomputation of `computed_area_km2`
//! - **dissolve**: unattributed cascaded union
//! - **pipeline**: the stages chained together

pub mod area;
pub mod dissolve;
pub mod expand;
pub mod geometry;
pub mod normalize;
pub mod overlap;
pub mod pipeline;
pub mod projection;
pub mod repair;

mod maybe_rayon;
mod stage;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::area::{geometry_area_km2, recompute_areas, AreaParams, AreaRecomputer};
    pub use crate::dissolve::{dissolve, dissolve_by, DissolveOutput, DissolveParams, Dissolver};
    pub use crate::expand::{expand_points, ExpandParams, PointExpander};
    pub use crate::normalize::{normalize, AttributeNormalizer, NormalizeParams, SentinelCodes};
    pub use crate::overlap::{resolve_indexed, resolve_overlaps, OverlapParams, OverlapResolver, Precedence, Resolution};
    pub use crate::pipeline::{clean, finish, prepare, CleanOutput, CleanParams, Cleaner};
    pub use crate::repair::{repair_geometry, repair_records, GeometryRepairer, RepairParams};
    pub use paclean_core::prelude::*;
}
