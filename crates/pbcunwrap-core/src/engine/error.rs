use crate::core::models::cell::Axis;
use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum UnwrapError {
    #[error("Shape mismatch in {context}: expected {expected} particles, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "Invalid partition: cannot split {particles} particles across {workers} workers (need 1 <= workers <= particles)"
    )]
    InvalidPartition { workers: usize, particles: usize },

    #[error("Degenerate cell: {axis} length is {length}, expected a finite value > 0")]
    DegenerateCell { axis: Axis, length: f64 },

    #[error("Non-finite coordinate for particle {index} in frame {frame}")]
    NonFiniteCoordinate { frame: usize, index: usize },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("Trajectory source failed at frame {frame}: {source}")]
    Source {
        frame: usize,
        #[source]
        source: BoxedError,
    },

    #[error("Trajectory sink failed at frame {frame}: {source}")]
    Sink {
        frame: usize,
        #[source]
        source: BoxedError,
    },
}

impl UnwrapError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}
