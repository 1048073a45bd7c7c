use crate::core::models::cell::CellDimensions;
use crate::core::models::frame::PositionArray;
use crate::engine::error::UnwrapError;
use crate::engine::frame::{UnwrapOutcome, unwrap_frame_into};
use crate::engine::partition::PartitionPlan;
use nalgebra::Point3;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::trace;

/// Frame unwrapper that splits the particle range into contiguous chunks and
/// processes them on a dedicated thread pool.
///
/// The pool and the partition plan are built once and reused for every frame of a
/// run. Each chunk writes only to its own region of the output buffer, so the result
/// is identical to [`unwrap_frame`](crate::engine::frame::unwrap_frame) for any
/// worker count.
pub struct ParallelUnwrapper {
    pool: ThreadPool,
    plan: PartitionPlan,
}

impl ParallelUnwrapper {
    /// # Errors
    ///
    /// Returns [`UnwrapError::InvalidPartition`] if `workers` is zero or larger than
    /// `n_particles`, and [`UnwrapError::WorkerPool`] if the thread pool cannot be
    /// created.
    pub fn new(workers: usize, n_particles: usize) -> Result<Self, UnwrapError> {
        let plan = PartitionPlan::new(n_particles, workers)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pbcunwrap-worker-{i}"))
            .build()
            .map_err(|e| UnwrapError::WorkerPool(e.to_string()))?;

        trace!(
            workers,
            n_particles,
            chunks = ?plan.ranges(),
            "Built parallel unwrapper."
        );

        Ok(Self { pool, plan })
    }

    pub fn workers(&self) -> usize {
        self.plan.n_chunks()
    }

    pub fn plan(&self) -> &PartitionPlan {
        &self.plan
    }

    pub fn unwrap(
        &self,
        cell: &CellDimensions,
        current: &[Point3<f64>],
        reference: &[Point3<f64>],
    ) -> Result<PositionArray, UnwrapError> {
        self.unwrap_counted(cell, current, reference)
            .map(|outcome| outcome.positions)
    }

    pub fn unwrap_counted(
        &self,
        cell: &CellDimensions,
        current: &[Point3<f64>],
        reference: &[Point3<f64>],
    ) -> Result<UnwrapOutcome, UnwrapError> {
        let n = self.plan.n_particles();
        if current.len() != n {
            return Err(UnwrapError::shape("current frame", n, current.len()));
        }
        if reference.len() != n {
            return Err(UnwrapError::shape("reference frame", n, reference.len()));
        }

        let mut positions = vec![Point3::origin(); n];
        let chunks = self.plan.split_mut(&mut positions)?;
        let ranges = self.plan.ranges();

        let crossings = self.pool.install(|| {
            chunks
                .into_par_iter()
                .zip(ranges.par_iter())
                .map(|(out, range)| {
                    unwrap_frame_into(
                        cell,
                        &current[range.clone()],
                        &reference[range.clone()],
                        out,
                    )
                })
                .try_reduce(|| 0, |a, b| Ok(a + b))
        })?;

        Ok(UnwrapOutcome {
            positions,
            crossings,
        })
    }
}

/// One-shot parallel unwrap of a single frame with `workers` threads.
///
/// Builds a short-lived [`ParallelUnwrapper`]; callers unwrapping many frames should
/// keep one unwrapper alive instead.
pub fn unwrap_frame_parallel(
    cell: &CellDimensions,
    current: &[Point3<f64>],
    reference: &[Point3<f64>],
    workers: usize,
) -> Result<PositionArray, UnwrapError> {
    ParallelUnwrapper::new(workers, current.len())?.unwrap(cell, current, reference)
}
