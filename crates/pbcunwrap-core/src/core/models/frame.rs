use super::cell::CellDimensions;
use nalgebra::Point3;

/// Per-particle coordinates of one frame, indexed identically across the whole trajectory.
pub type PositionArray = Vec<Point3<f64>>;

/// A single trajectory snapshot: the cell it was recorded in and every particle position.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub cell: CellDimensions,
    pub positions: PositionArray,
}

impl Frame {
    pub fn new(cell: CellDimensions, positions: PositionArray) -> Self {
        Self { cell, positions }
    }

    #[inline]
    pub fn n_particles(&self) -> usize {
        self.positions.len()
    }

    /// Returns the index of the first particle with a NaN or infinite component.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.positions
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    }
}
