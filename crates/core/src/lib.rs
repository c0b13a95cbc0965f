//! # paclean Core
//!
//! Core types, traits and I/O for the paclean protected-area cleaning pipeline.
//!
//! This crate provides:
//! - `Feature` / `FeatureCollection`: raw provider records
//! - `NormalizedRecord` / `ProtectedArea`: typed records flowing through the pipeline
//! - `CRS`: Coordinate Reference System handling
//! - `AuditLog`: per-record audit trail of every drop and rewrite
//! - Algorithm traits for consistent API
//! - GeoJSON I/O

pub mod audit;
pub mod crs;
pub mod error;
pub mod io;
pub mod record;
pub mod vector;

pub use audit::{AuditEntry, AuditLog, AuditSummary, Issue, Stage, Staged};
pub use crs::{Units, CRS};
pub use error::{Error, Result};
pub use record::{
    Attributes, DesignationKind, ManagementCategory, NormalizedRecord, ProtectedArea, Realm,
    Status,
};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditLog, Issue, Stage, Staged};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::record::{Attributes, NormalizedRecord, ProtectedArea, Realm};
    pub use crate::vector::{Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in paclean.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

/// Marker trait for algorithms that can be parallelized
pub trait ParallelAlgorithm: Algorithm {
    /// Execute in parallel using available cores
    fn execute_parallel(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;
}
