//! Per-record stages iterate with `into_par_iter()`.
//!
//! With the `parallel` feature that is rayon. Without it the same call
//! falls back to a plain `into_iter()`, so stage code does not change and
//! results come out in the same order either way.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
pub use fallback::IntoParallelIterator;

#[cfg(not(feature = "parallel"))]
mod fallback {
    /// `into_par_iter()` for any `IntoIterator`; the rest of the chain
    /// (`map`, `enumerate`, `collect`) is the standard `Iterator` API
    pub trait IntoParallelIterator: IntoIterator + Sized {
        fn into_par_iter(self) -> Self::IntoIter {
            self.into_iter()
        }
    }

    impl<I: IntoIterator> IntoParallelIterator for I {}
}
