use super::traits::{TrajectorySink, TrajectorySource};
use crate::core::models::frame::Frame;
use std::collections::VecDeque;
use std::convert::Infallible;

/// A trajectory held entirely in memory.
///
/// Used as a source it yields its frames front to back, consuming them; used as a
/// sink it appends every written frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTrajectory {
    frames: VecDeque<Frame>,
    n_particles: usize,
}

impl MemoryTrajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let n_particles = frames.first().map_or(0, Frame::n_particles);
        Self {
            frames: frames.into(),
            n_particles,
        }
    }

    pub fn push(&mut self, frame: Frame) {
        if self.frames.is_empty() && self.n_particles == 0 {
            self.n_particles = frame.n_particles();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames.into()
    }
}

impl TrajectorySource for MemoryTrajectory {
    type Error = Infallible;

    fn n_particles(&self) -> usize {
        self.n_particles
    }

    fn n_frames_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        Ok(self.frames.pop_front())
    }
}

impl TrajectorySink for MemoryTrajectory {
    type Error = Infallible;

    fn write_frame(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        self.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::CellDimensions;
    use nalgebra::Point3;

    fn frame(x: f64) -> Frame {
        Frame::new(
            CellDimensions::cubic(10.0).unwrap(),
            vec![Point3::new(x, 0.0, 0.0), Point3::new(0.0, x, 0.0)],
        )
    }

    #[test]
    fn source_yields_frames_in_order_then_none() {
        let mut traj = MemoryTrajectory::from_frames(vec![frame(1.0), frame(2.0)]);
        assert_eq!(traj.n_particles(), 2);
        assert_eq!(traj.n_frames_hint(), Some(2));

        assert_eq!(traj.next_frame().unwrap(), Some(frame(1.0)));
        assert_eq!(traj.next_frame().unwrap(), Some(frame(2.0)));
        assert_eq!(traj.next_frame().unwrap(), None);
        assert_eq!(traj.n_particles(), 2);
    }

    #[test]
    fn sink_appends_written_frames() {
        let mut traj = MemoryTrajectory::new();
        assert!(traj.is_empty());

        traj.write_frame(&frame(3.0)).unwrap();
        traj.write_frame(&frame(4.0)).unwrap();
        traj.finish().unwrap();

        assert_eq!(traj.len(), 2);
        assert_eq!(traj.n_particles(), 2);
        assert_eq!(traj.into_frames(), vec![frame(3.0), frame(4.0)]);
    }
}
