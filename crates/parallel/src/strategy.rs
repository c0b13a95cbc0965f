//! Parallel processing strategies

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Processing mode for partitioned work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a `--threads` style option: unset means all cores, one
    /// thread means sequential
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None | Some(0) => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Run `op` on a dedicated pool of `threads` threads. Falls back to the
    /// global pool when the dedicated one cannot be built.
    fn install<R, OP>(threads: usize, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(op),
            Err(e) => {
                tracing::warn!("cannot build a {threads}-thread pool ({e}), using the global pool");
                op()
            }
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over owned items, keeping their order
    fn par_map_vec<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map_vec<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.into_iter().map(f).collect(),
            ProcessingMode::Parallel => items.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                ProcessingMode::install(*threads, || items.into_par_iter().map(f).collect())
            }
        }
    }
}

/// Configure the global thread pool
pub fn set_num_threads(threads: usize) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok(); // Ignore if already initialized
}
