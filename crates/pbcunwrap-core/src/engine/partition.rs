use crate::engine::error::UnwrapError;
use std::ops::Range;

/// Contiguous, ordered split of the particle index range `[0, n_particles)` into one
/// chunk per worker.
///
/// With `base = n / workers` and `remainder = n % workers`, the first `remainder`
/// chunks hold `base + 1` particles and the rest hold `base`. Chunks never overlap and
/// together cover every index exactly once, so results can be copied back by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    n_particles: usize,
    ranges: Vec<Range<usize>>,
}

impl PartitionPlan {
    /// # Errors
    ///
    /// Returns [`UnwrapError::InvalidPartition`] when `workers` is zero or exceeds
    /// `n_particles`.
    pub fn new(n_particles: usize, workers: usize) -> Result<Self, UnwrapError> {
        if workers == 0 || workers > n_particles {
            return Err(UnwrapError::InvalidPartition {
                workers,
                particles: n_particles,
            });
        }

        let base = n_particles / workers;
        let remainder = n_particles - base * workers;

        let mut ranges = Vec::with_capacity(workers);
        let mut start = 0;
        for i in 0..workers {
            let len = if i < remainder { base + 1 } else { base };
            ranges.push(start..start + len);
            start += len;
        }
        debug_assert_eq!(start, n_particles);

        Ok(Self {
            n_particles,
            ranges,
        })
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn n_chunks(&self) -> usize {
        self.ranges.len()
    }

    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    /// Splits `buffer` into one disjoint mutable chunk per range, in plan order.
    ///
    /// # Errors
    ///
    /// Returns [`UnwrapError::ShapeMismatch`] if `buffer` does not hold exactly
    /// `n_particles` elements.
    pub fn split_mut<'a, T>(&self, buffer: &'a mut [T]) -> Result<Vec<&'a mut [T]>, UnwrapError> {
        if buffer.len() != self.n_particles {
            return Err(UnwrapError::shape(
                "partitioned buffer",
                self.n_particles,
                buffer.len(),
            ));
        }

        let mut chunks = Vec::with_capacity(self.ranges.len());
        let mut rest = buffer;
        for range in &self.ranges {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
            chunks.push(head);
            rest = tail;
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_leading_chunks() {
        let plan = PartitionPlan::new(10, 3).unwrap();
        assert_eq!(plan.ranges(), &[0..4, 4..7, 7..10]);
    }

    #[test]
    fn even_split_has_equal_chunks() {
        let plan = PartitionPlan::new(12, 4).unwrap();
        assert!(plan.ranges().iter().all(|r| r.len() == 3));
    }

    #[test]
    fn one_worker_owns_everything() {
        let plan = PartitionPlan::new(7, 1).unwrap();
        assert_eq!(plan.ranges(), &[0..7]);
    }

    #[test]
    fn one_particle_per_worker_when_counts_match() {
        let plan = PartitionPlan::new(3, 3).unwrap();
        assert_eq!(plan.ranges(), &[0..1, 1..2, 2..3]);
    }

    #[test]
    fn plans_cover_every_index_exactly_once() {
        for n in 1..40 {
            for workers in 1..=n {
                let plan = PartitionPlan::new(n, workers).unwrap();
                assert_eq!(plan.n_chunks(), workers);

                let mut expected_start = 0;
                for range in plan.ranges() {
                    assert_eq!(range.start, expected_start);
                    assert!(!range.is_empty());
                    expected_start = range.end;
                }
                assert_eq!(expected_start, n);

                let sizes: Vec<usize> = plan.ranges().iter().map(|r| r.len()).collect();
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(max - min <= 1, "n={n} workers={workers} sizes={sizes:?}");
            }
        }
    }

    #[test]
    fn zero_workers_is_invalid() {
        assert!(matches!(
            PartitionPlan::new(5, 0),
            Err(UnwrapError::InvalidPartition {
                workers: 0,
                particles: 5
            })
        ));
    }

    #[test]
    fn more_workers_than_particles_is_invalid() {
        assert!(matches!(
            PartitionPlan::new(2, 3),
            Err(UnwrapError::InvalidPartition {
                workers: 3,
                particles: 2
            })
        ));
        assert!(PartitionPlan::new(0, 1).is_err());
    }

    #[test]
    fn split_mut_yields_disjoint_chunks_matching_ranges() {
        let plan = PartitionPlan::new(5, 2).unwrap();
        let mut data = vec![0u32; 5];
        {
            let chunks = plan.split_mut(&mut data).unwrap();
            assert_eq!(chunks.len(), 2);
            for (i, chunk) in chunks.into_iter().enumerate() {
                for slot in chunk.iter_mut() {
                    *slot = i as u32 + 1;
                }
            }
        }
        assert_eq!(data, vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn split_mut_rejects_wrong_buffer_size() {
        let plan = PartitionPlan::new(5, 2).unwrap();
        let mut data = vec![0u8; 4];
        assert!(matches!(
            plan.split_mut(&mut data),
            Err(UnwrapError::ShapeMismatch {
                expected: 5,
                found: 4,
                ..
            })
        ));
    }
}
