use crate::core::models::frame::Frame;
use std::error::Error;

/// A forward-only producer of trajectory frames.
///
/// Implementors hand out frames in trajectory order. Every frame must contain
/// [`n_particles`](TrajectorySource::n_particles) positions, and particle `i` must refer to
/// the same particle in every frame.
pub trait TrajectorySource {
    /// The error type for reading frames.
    type Error: Error + Send + Sync + 'static;

    /// Number of particles in every frame of this trajectory.
    fn n_particles(&self) -> usize;

    /// Total number of frames, if the source knows it up front.
    fn n_frames_hint(&self) -> Option<usize> {
        None
    }

    /// Reads the next frame.
    ///
    /// # Return
    ///
    /// `Ok(None)` once the trajectory is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be read or decoded.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// A consumer of trajectory frames, written once per frame in order.
pub trait TrajectorySink {
    /// The error type for writing frames.
    type Error: Error + Send + Sync + 'static;

    /// Persists one frame. Frames arrive in trajectory order.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be encoded or written.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), Self::Error>;

    /// Flushes any buffered state after the last frame.
    ///
    /// # Errors
    ///
    /// Returns an error if finalizing the output fails.
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<S: TrajectorySource + ?Sized> TrajectorySource for &mut S {
    type Error = S::Error;

    fn n_particles(&self) -> usize {
        (**self).n_particles()
    }

    fn n_frames_hint(&self) -> Option<usize> {
        (**self).n_frames_hint()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        (**self).next_frame()
    }
}

impl<K: TrajectorySink + ?Sized> TrajectorySink for &mut K {
    type Error = K::Error;

    fn write_frame(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        (**self).finish()
    }
}
