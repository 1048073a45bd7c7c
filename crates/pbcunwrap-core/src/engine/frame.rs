use crate::core::models::cell::{Axis, CellDimensions};
use crate::core::models::frame::PositionArray;
use crate::engine::axis::axis_shift;
use crate::engine::error::UnwrapError;
use nalgebra::Point3;

/// Unwraps `current` against `reference`, returning a new position array.
///
/// Every axis is corrected independently using the raw difference between the two
/// inputs. Neither input is modified and index `i` of the result is particle `i`.
///
/// # Errors
///
/// Returns [`UnwrapError::ShapeMismatch`] if `current` and `reference` differ in length.
pub fn unwrap_frame(
    cell: &CellDimensions,
    current: &[Point3<f64>],
    reference: &[Point3<f64>],
) -> Result<PositionArray, UnwrapError> {
    unwrap_frame_counted(cell, current, reference).map(|outcome| outcome.positions)
}

/// Unwrapped positions of one frame together with the number of shifted coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwrapOutcome {
    pub positions: PositionArray,
    pub crossings: usize,
}

/// Like [`unwrap_frame`], but also reports how many coordinates were shifted.
pub fn unwrap_frame_counted(
    cell: &CellDimensions,
    current: &[Point3<f64>],
    reference: &[Point3<f64>],
) -> Result<UnwrapOutcome, UnwrapError> {
    let mut positions = vec![Point3::origin(); current.len()];
    let crossings = unwrap_frame_into(cell, current, reference, &mut positions)?;
    Ok(UnwrapOutcome {
        positions,
        crossings,
    })
}

/// Unwraps `current` against `reference` into a caller-provided buffer.
///
/// This is the unit of work handed to each partition by the parallel unwrapper; the
/// three slices must describe the same particle range.
///
/// # Return
///
/// The number of coordinates (particle-axis pairs) that received a non-zero shift.
pub fn unwrap_frame_into(
    cell: &CellDimensions,
    current: &[Point3<f64>],
    reference: &[Point3<f64>],
    output: &mut [Point3<f64>],
) -> Result<usize, UnwrapError> {
    if reference.len() != current.len() {
        return Err(UnwrapError::shape(
            "reference frame",
            current.len(),
            reference.len(),
        ));
    }
    if output.len() != current.len() {
        return Err(UnwrapError::shape(
            "output buffer",
            current.len(),
            output.len(),
        ));
    }

    let lengths = Axis::ALL.map(|axis| cell.length(axis));
    let mut crossings = 0;

    for ((out, cur), prev) in output.iter_mut().zip(current).zip(reference) {
        *out = *cur;
        for (k, &length) in lengths.iter().enumerate() {
            let shift = axis_shift(length, cur[k] - prev[k]);
            if shift != 0 {
                out[k] += shift as f64 * length;
                crossings += 1;
            }
        }
    }

    Ok(crossings)
}
