//! Partitioned overlap resolution
//!
//! Each partition is resolved by its own resolver invocation, which owns
//! and drops its claimed-area accumulator. Partitions return their own
//! kept records and audit entries; the merge orders both by input position.

use paclean_algorithms::overlap::{resolve_indexed, OverlapParams, Resolution};
use paclean_algorithms::pipeline::{finish, prepare, CleanOutput, CleanParams};
use paclean_core::{
    Algorithm, Error, FeatureCollection, ParallelAlgorithm, ProtectedArea, Result, Staged,
};

use crate::partition::{partition, PartitionScheme};
use crate::strategy::{ParallelStrategy, ProcessingMode};

/// Parameters for partitioned overlap resolution
#[derive(Debug, Clone, Default)]
pub struct PartitionedParams {
    pub overlap: OverlapParams,
    pub scheme: PartitionScheme,
    pub mode: ProcessingMode,
}

/// Overlap resolver that works partition by partition
#[derive(Debug, Clone, Default)]
pub struct ParallelOverlapResolver;

impl Algorithm for ParallelOverlapResolver {
    type Input = Vec<ProtectedArea>;
    type Output = Staged<ProtectedArea>;
    type Params = PartitionedParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ParallelOverlapResolver"
    }

    fn description(&self) -> &'static str {
        "Erase overlaps independently per partition"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(resolve_partitioned(input, &params.overlap, params.scheme, params.mode))
    }
}

impl ParallelAlgorithm for ParallelOverlapResolver {
    fn execute_parallel(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let params = PartitionedParams {
            mode: ProcessingMode::Parallel,
            ..params
        };
        self.execute(input, params)
    }
}

/// Resolve overlaps partition by partition.
///
/// # Arguments
/// * `records` - Valid records, in input order
/// * `params` - Precedence and precision, as for the sequential resolver
/// * `scheme` - How records are grouped
/// * `mode` - Sequential or parallel execution of the partitions
///
/// # Returns
/// Residual records and audit entries in input order. With
/// [`PartitionScheme::OverlapGroups`] this is the sequential result.
pub fn resolve_partitioned(
    records: Vec<ProtectedArea>,
    params: &OverlapParams,
    scheme: PartitionScheme,
    mode: ProcessingMode,
) -> Staged<ProtectedArea> {
    let total = records.len();
    let groups = partition(&records, scheme);

    let mut group_of = vec![0; total];
    for (g, members) in groups.iter().enumerate() {
        for &i in members {
            group_of[i] = g;
        }
    }
    let mut batches: Vec<Vec<(usize, ProtectedArea)>> = groups.iter().map(|g| Vec::with_capacity(g.len())).collect();
    for (i, record) in records.into_iter().enumerate() {
        batches[group_of[i]].push((i, record));
    }

    let resolutions = mode.par_map_vec(batches, |batch| resolve_indexed(batch, params));

    let mut merged = Resolution::default();
    for resolution in resolutions {
        merged.merge(resolution);
    }
    let staged = merged.into_staged();
    tracing::info!(
        "resolve overlaps ({} {} partitions): {} of {} records keep a residual",
        groups.len(),
        scheme,
        staged.records.len(),
        total
    );
    staged
}

/// Run the full pipeline with partitioned overlap resolution.
///
/// Fails only when `params` is invalid.
pub fn clean_parallel(
    features: FeatureCollection,
    params: &CleanParams,
    scheme: PartitionScheme,
    mode: ProcessingMode,
) -> Result<CleanOutput> {
    let staged = prepare(features, params)?;
    let staged = if params.erase_overlaps {
        let mut audit = staged.audit;
        let resolved = resolve_partitioned(staged.records, &params.overlap_params(), scheme, mode);
        audit.merge(resolved.audit);
        Staged::new(resolved.records, audit)
    } else {
        staged
    };
    Ok(finish(staged, params))
}
