use crate::engine::error::UnwrapError;

/// Number of cell lengths to add to a coordinate whose displacement from its
/// reference is `displacement`, so that the shifted displacement lies in
/// `[-length / 2, length / 2]`.
///
/// The result is the smallest shift away from zero that brings the displacement back
/// inside half a cell, so a particle that crossed several images between frames still
/// lands on the nearest one. A displacement of exactly half a cell is in bounds and
/// yields `0`.
///
/// The shift is estimated in closed form and then corrected by at most one image in
/// each direction, so the cost does not grow with the size of the jump. Shifts beyond
/// the `i64` range saturate.
///
/// `length` must be finite and positive and `displacement` must be finite; both are
/// guaranteed by [`CellDimensions`](crate::core::models::cell::CellDimensions) and the
/// frame checks in the driver.
#[inline]
pub fn axis_shift(length: f64, displacement: f64) -> i64 {
    let half = length / 2.0;
    let shifted = |shift: i64| displacement + shift as f64 * length;

    if displacement > half {
        let images = (((displacement - half) / length).ceil() as i64).max(1);
        let mut shift = -images;
        // Rounding in the estimate can leave it one image off either way.
        if shifted(shift) > half {
            shift = shift.saturating_sub(1);
        } else if shift < -1 && shifted(shift + 1) <= half {
            shift += 1;
        }
        shift
    } else if displacement < -half {
        let images = (((-half - displacement) / length).ceil() as i64).max(1);
        let mut shift = images;
        if shifted(shift) < -half {
            shift = shift.saturating_add(1);
        } else if shift > 1 && shifted(shift - 1) >= -half {
            shift -= 1;
        }
        shift
    } else {
        0
    }
}

/// Computes the per-particle shift counts for a single axis.
///
/// This is the column-oriented entry point for callers that keep one coordinate array
/// per axis. Frame unwrapping applies [`axis_shift`] to the same differences directly
/// while it walks the particles, so both paths produce identical shifts.
///
/// Each entry depends only on `current[i] - reference[i]` and `length`, so any
/// contiguous sub-slice can be processed independently and produces the same values.
///
/// # Errors
///
/// Returns [`UnwrapError::ShapeMismatch`] if the two slices differ in length.
pub fn unwrap_axis(
    length: f64,
    current: &[f64],
    reference: &[f64],
) -> Result<Vec<i64>, UnwrapError> {
    if current.len() != reference.len() {
        return Err(UnwrapError::shape(
            "axis reference coordinates",
            current.len(),
            reference.len(),
        ));
    }

    Ok(current
        .iter()
        .zip(reference)
        .map(|(&c, &r)| axis_shift(length, c - r))
        .collect())
}
