//! Map-reduce over independent replicates.
//!
//! Monte Carlo nulls, bootstrap resamples, permutations and simulation trials
//! all share one shape: run a closure `n` times, each time with its own random
//! stream, and collect the outputs. [`run_replicates`] does that with
//! replicate `i` always receiving the stream `StudyRng::for_replicate(seed, i)`
//! and its output always landing at position `i`, so the collected vector does
//! not depend on scheduling.

use crate::errors::AppreciationResult;
use crate::rng::StudyRng;

/// Execution options for a replicate loop.
#[derive(Debug, Clone, Copy)]
pub struct ReplicatePlan {
    /// Number of replicates
    pub count: usize,
    /// Base seed from which per-replicate streams are derived
    pub base_seed: u64,
    /// Distribute replicates over the rayon pool when the `parallel` feature is on
    pub parallel: bool,
}

impl ReplicatePlan {
    /// Plan for `count` replicates with the given base seed.
    pub fn new(count: usize, base_seed: u64, parallel: bool) -> Self {
        Self {
            count,
            base_seed,
            parallel,
        }
    }
}

/// Evaluate `f` at every index in `0..count`, collecting results in index order.
///
/// With `parallel` false every call runs on the calling thread, regardless of
/// whether the `parallel` feature is compiled in.
pub fn map_indices<T, F>(count: usize, parallel: bool, f: F) -> AppreciationResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> AppreciationResult<T> + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;

            return (0..count).into_par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    (0..count).map(f).collect()
}

/// Run `plan.count` replicates of `trial` and collect their outputs in index order.
///
/// The first error (lowest index in sequential mode, any failing replicate in
/// parallel mode) aborts the loop.
pub fn run_replicates<T, F>(plan: ReplicatePlan, trial: F) -> AppreciationResult<Vec<T>>
where
    T: Send,
    F: Fn(usize, &mut StudyRng) -> AppreciationResult<T> + Send + Sync,
{
    map_indices(plan.count, plan.parallel, |i| {
        let mut rng = StudyRng::for_replicate(plan.base_seed, i);
        trial(i, &mut rng)
    })
}

/// Fold replicate outputs with a reducer after collecting them in index order.
pub fn fold_replicates<T, A, F, R>(
    plan: ReplicatePlan,
    trial: F,
    init: A,
    reduce: R,
) -> AppreciationResult<A>
where
    T: Send,
    F: Fn(usize, &mut StudyRng) -> AppreciationResult<T> + Send + Sync,
    R: FnMut(A, T) -> A,
{
    Ok(run_replicates(plan, trial)?.into_iter().fold(init, reduce))
}
