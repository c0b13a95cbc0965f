//! # paclean Parallel
//!
//! Partitioned processing for the paclean pipeline.
//!
//! This crate provides:
//! - Processing modes over Rayon (sequential, all cores, fixed thread count)
//! - Partitioning of records into independently resolvable groups
//! - Partitioned overlap resolution and a full parallel cleaning run

pub mod partition;
pub mod resolve;
pub mod strategy;

pub use partition::{partition, PartitionScheme};
pub use resolve::{clean_parallel, resolve_partitioned, ParallelOverlapResolver, PartitionedParams};
pub use strategy::{set_num_threads, ParallelStrategy, ProcessingMode};
