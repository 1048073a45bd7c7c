use crate::engine::error::UnwrapError;
use nalgebra::Vector3;
use std::fmt;

/// One of the three Cartesian axes of a rectangular cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The component index of this axis in a `Point3` or `Vector3`.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Edge lengths `(A, B, C)` of a rectangular simulation cell for a single frame.
///
/// The constructor guarantees that every length is finite and strictly positive,
/// so code holding a `CellDimensions` never has to re-check the cell before dividing
/// by or halving one of its lengths. Tilt factors are not represented; a triclinic
/// cell must be reduced to its diagonal before it reaches this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDimensions {
    lengths: Vector3<f64>,
}

impl CellDimensions {
    /// Creates a cell from its three edge lengths.
    ///
    /// # Errors
    ///
    /// Returns [`UnwrapError::DegenerateCell`] for the first length that is not
    /// finite or not greater than zero.
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self, UnwrapError> {
        let lengths = Vector3::new(a, b, c);
        for axis in Axis::ALL {
            let length = lengths[axis.index()];
            if !length.is_finite() || length <= 0.0 {
                return Err(UnwrapError::DegenerateCell { axis, length });
            }
        }
        Ok(Self { lengths })
    }

    /// Creates a cubic cell with edge length `edge`.
    pub fn cubic(edge: f64) -> Result<Self, UnwrapError> {
        Self::new(edge, edge, edge)
    }

    #[inline]
    pub fn length(&self, axis: Axis) -> f64 {
        self.lengths[axis.index()]
    }

    #[inline]
    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }

    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }
}

impl TryFrom<[f64; 3]> for CellDimensions {
    type Error = UnwrapError;

    fn try_from(value: [f64; 3]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1], value[2])
    }
}
