use crate::core::io::traits::{TrajectorySink, TrajectorySource};
use crate::core::models::cell::CellDimensions;
use crate::core::models::frame::{Frame, PositionArray};
use crate::engine::config::{ExecutionMode, UnwrapConfig};
use crate::engine::error::UnwrapError;
use crate::engine::frame::{UnwrapOutcome, unwrap_frame_counted};
use crate::engine::parallel::ParallelUnwrapper;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::Point3;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnwrapSummary {
    pub frames: usize,
    pub particles: usize,
    /// Total number of shifted coordinates over the whole run.
    pub crossings: usize,
}

enum Strategy {
    Sequential,
    Parallel(ParallelUnwrapper),
}

impl Strategy {
    fn build(mode: ExecutionMode, n_particles: usize) -> Result<Self, UnwrapError> {
        match mode {
            ExecutionMode::Sequential => Ok(Strategy::Sequential),
            ExecutionMode::Parallel { workers } => Ok(Strategy::Parallel(
                ParallelUnwrapper::new(workers, n_particles)?,
            )),
        }
    }

    fn unwrap(
        &self,
        cell: &CellDimensions,
        current: &[Point3<f64>],
        reference: &[Point3<f64>],
    ) -> Result<UnwrapOutcome, UnwrapError> {
        match self {
            Strategy::Sequential => unwrap_frame_counted(cell, current, reference),
            Strategy::Parallel(unwrapper) => unwrapper.unwrap_counted(cell, current, reference),
        }
    }
}

enum DriverState {
    Empty,
    Tracking { reference: PositionArray },
}

/// Frame-by-frame unwrapping state machine.
///
/// The driver owns the output sink and the single reference buffer for the duration of
/// a run. The first frame is emitted unchanged; every later frame is unwrapped against
/// the previously *emitted* positions, so corrections accumulate across the whole
/// trajectory.
pub struct TrajectoryUnwrapDriver<K: TrajectorySink> {
    sink: K,
    strategy: Strategy,
    state: DriverState,
    n_particles: usize,
    frames: usize,
    crossings: usize,
}

impl<K: TrajectorySink> TrajectoryUnwrapDriver<K> {
    /// Creates a driver for a trajectory of `n_particles` particles.
    ///
    /// # Errors
    ///
    /// Returns [`UnwrapError::InvalidPartition`] if a parallel mode cannot split
    /// `n_particles` across its workers. This is checked here, before any frame is read.
    pub fn new(config: &UnwrapConfig, n_particles: usize, sink: K) -> Result<Self, UnwrapError> {
        let strategy = Strategy::build(config.mode, n_particles)?;
        Ok(Self {
            sink,
            strategy,
            state: DriverState::Empty,
            n_particles,
            frames: 0,
            crossings: 0,
        })
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, DriverState::Tracking { .. })
    }

    /// The positions the next frame will be unwrapped against.
    pub fn reference(&self) -> Option<&[Point3<f64>]> {
        match &self.state {
            DriverState::Empty => None,
            DriverState::Tracking { reference } => Some(reference),
        }
    }

    pub fn frames_processed(&self) -> usize {
        self.frames
    }

    /// Unwraps one raw frame, writes the result to the sink and makes it the new
    /// reference.
    ///
    /// # Return
    ///
    /// The number of coordinates shifted in this frame.
    pub fn process(&mut self, frame: Frame) -> Result<usize, UnwrapError> {
        let index = self.frames;

        if frame.n_particles() != self.n_particles {
            return Err(UnwrapError::shape(
                format!("frame {index}"),
                self.n_particles,
                frame.n_particles(),
            ));
        }
        if let Some(particle) = frame.first_non_finite() {
            return Err(UnwrapError::NonFiniteCoordinate {
                frame: index,
                index: particle,
            });
        }

        let (emitted, crossings) = match &self.state {
            DriverState::Empty => (frame, 0),
            DriverState::Tracking { reference } => {
                let outcome = self
                    .strategy
                    .unwrap(&frame.cell, &frame.positions, reference)?;
                (Frame::new(frame.cell, outcome.positions), outcome.crossings)
            }
        };

        self.sink
            .write_frame(&emitted)
            .map_err(|e| UnwrapError::Sink {
                frame: index,
                source: Box::new(e),
            })?;

        self.state = DriverState::Tracking {
            reference: emitted.positions,
        };
        self.frames += 1;
        self.crossings += crossings;
        Ok(crossings)
    }

    /// Flushes the sink, releases the reference buffer and hands the sink back.
    pub fn finish(mut self) -> Result<(K, UnwrapSummary), UnwrapError> {
        self.sink.finish().map_err(|e| UnwrapError::Sink {
            frame: self.frames,
            source: Box::new(e),
        })?;
        self.state = DriverState::Empty;

        let summary = UnwrapSummary {
            frames: self.frames,
            particles: self.n_particles,
            crossings: self.crossings,
        };
        Ok((self.sink, summary))
    }
}

/// Unwraps every frame of `source` into `sink`.
///
/// Frames are processed strictly in order. Any error aborts the run; frames already
/// written to the sink are left as they are.
#[instrument(skip_all, name = "unwrap_workflow")]
pub fn run<S, K>(
    mut source: S,
    sink: K,
    config: &UnwrapConfig,
    reporter: &ProgressReporter,
) -> Result<(K, UnwrapSummary), UnwrapError>
where
    S: TrajectorySource,
    K: TrajectorySink,
{
    let n_particles = source.n_particles();
    info!(
        n_particles,
        mode = ?config.mode,
        "Starting trajectory unwrapping."
    );

    let mut driver = TrajectoryUnwrapDriver::new(config, n_particles, sink)?;

    reporter.report(Progress::RunStart {
        total_frames: source.n_frames_hint().map(|n| n as u64),
    });

    loop {
        let index = driver.frames_processed();
        let next = source.next_frame().map_err(|e| UnwrapError::Source {
            frame: index,
            source: Box::new(e),
        })?;
        let Some(frame) = next else {
            break;
        };

        let crossings = driver.process(frame)?;
        debug!(frame = index, crossings, "Frame unwrapped.");
        reporter.report(Progress::FrameDone { index, crossings });
    }

    let (sink, summary) = driver.finish()?;
    reporter.report(Progress::RunFinish {
        frames: summary.frames,
    });
    info!(
        frames = summary.frames,
        crossings = summary.crossings,
        "Trajectory unwrapping complete."
    );

    Ok((sink, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::memory::MemoryTrajectory;
    use crate::engine::config::UnwrapConfigBuilder;
    use std::sync::{Arc, Mutex};
    use thiserror::Error;

    fn cubic(edge: f64) -> CellDimensions {
        CellDimensions::cubic(edge).unwrap()
    }

    fn wrap(x: f64, length: f64) -> f64 {
        x - length * (x / length).floor()
    }

    fn sequential() -> UnwrapConfig {
        UnwrapConfigBuilder::new().sequential(true).build().unwrap()
    }

    fn parallel(workers: usize) -> UnwrapConfig {
        UnwrapConfigBuilder::new().workers(workers).build().unwrap()
    }

    /// Particles drifting at constant velocity, stored wrapped into `[0, edge)`.
    fn drifting_trajectory(
        n_frames: usize,
        edge: f64,
        velocities: &[[f64; 3]],
    ) -> (Vec<Frame>, Vec<Vec<Point3<f64>>>) {
        let mut wrapped = Vec::new();
        let mut truth = Vec::new();
        for t in 0..n_frames {
            let exact: Vec<Point3<f64>> = velocities
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let start = 1.0 + i as f64;
                    Point3::new(
                        start + v[0] * t as f64,
                        start + v[1] * t as f64,
                        start + v[2] * t as f64,
                    )
                })
                .collect();
            let folded = exact
                .iter()
                .map(|p| Point3::new(wrap(p.x, edge), wrap(p.y, edge), wrap(p.z, edge)))
                .collect();
            wrapped.push(Frame::new(cubic(edge), folded));
            truth.push(exact);
        }
        (wrapped, truth)
    }

    fn run_memory(
        frames: Vec<Frame>,
        config: &UnwrapConfig,
    ) -> Result<(Vec<Frame>, UnwrapSummary), UnwrapError> {
        let source = MemoryTrajectory::from_frames(frames);
        let (sink, summary) = run(
            source,
            MemoryTrajectory::new(),
            config,
            &ProgressReporter::new(),
        )?;
        Ok((sink.into_frames(), summary))
    }

    #[test]
    fn first_frame_is_emitted_verbatim() {
        let frame = Frame::new(
            cubic(10.0),
            vec![Point3::new(9.9, 0.1, 5.0), Point3::new(-3.0, 12.0, 0.0)],
        );

        let (out, summary) = run_memory(vec![frame.clone()], &sequential()).unwrap();

        assert_eq!(out, vec![frame]);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.crossings, 0);
    }

    #[test]
    fn box_length_jump_is_removed_on_that_axis() {
        let cell = cubic(10.0);
        let frame0 = Frame::new(cell, vec![Point3::new(4.0, 4.0, 4.0)]);
        let frame1 = Frame::new(cell, vec![Point3::new(4.5, 4.0, 4.0)]);
        let frame2 = Frame::new(cell, vec![Point3::new(4.5 - 10.0, 4.0, 4.0)]);

        let (out, _) = run_memory(vec![frame0, frame1.clone(), frame2], &sequential()).unwrap();

        assert_eq!(out[2].positions[0].x, out[1].positions[0].x);
        assert_eq!(out[2].positions, frame1.positions);
    }

    #[test]
    fn corrections_accumulate_across_many_crossings() {
        let velocities = [[3.0, -2.5, 0.5], [-4.0, 4.5, 1.0], [0.0, 0.0, -3.0]];
        let (wrapped, truth) = drifting_trajectory(40, 10.0, &velocities);

        let (out, summary) = run_memory(wrapped, &sequential()).unwrap();

        assert_eq!(out.len(), 40);
        assert!(summary.crossings > 0);
        for (frame, exact) in out.iter().zip(&truth) {
            for (p, q) in frame.positions.iter().zip(exact) {
                assert!((p - q).norm() < 1e-9, "{p:?} != {q:?}");
            }
        }
    }

    #[test]
    fn reference_is_previous_unwrapped_frame_not_raw_input() {
        let cell = cubic(10.0);
        let frames = vec![
            Frame::new(cell, vec![Point3::new(8.0, 0.0, 0.0)]),
            Frame::new(cell, vec![Point3::new(2.0, 0.0, 0.0)]),
            Frame::new(cell, vec![Point3::new(6.0, 0.0, 0.0)]),
        ];
        let mut driver =
            TrajectoryUnwrapDriver::new(&sequential(), 1, MemoryTrajectory::new()).unwrap();
        assert!(!driver.is_tracking());

        for frame in frames {
            driver.process(frame).unwrap();
        }
        assert_eq!(driver.reference().unwrap()[0].x, 16.0);

        let (sink, summary) = driver.finish().unwrap();
        let xs: Vec<f64> = sink.frames().map(|f| f.positions[0].x).collect();
        assert_eq!(xs, vec![8.0, 12.0, 16.0]);
        assert_eq!(summary.crossings, 2);
    }

    #[test]
    fn changing_box_size_uses_each_frames_own_cell() {
        let frames = vec![
            Frame::new(cubic(10.0), vec![Point3::new(1.0, 1.0, 1.0)]),
            Frame::new(
                CellDimensions::new(20.0, 10.0, 10.0).unwrap(),
                vec![Point3::new(19.0, 1.0, 1.0)],
            ),
        ];

        let (out, _) = run_memory(frames, &sequential()).unwrap();

        assert_eq!(out[1].positions[0], Point3::new(-1.0, 1.0, 1.0));
        assert_eq!(out[1].cell, CellDimensions::new(20.0, 10.0, 10.0).unwrap());
    }

    #[test]
    fn parallel_and_sequential_runs_are_identical() {
        let velocities: Vec<[f64; 3]> = (0..23)
            .map(|i| {
                let f = i as f64;
                [(f * 0.37) % 4.0 - 2.0, 3.9 - (f * 0.61) % 7.8, (f * 1.13) % 4.6 - 2.3]
            })
            .collect();
        let (wrapped, _) = drifting_trajectory(25, 7.5, &velocities);

        let (expected, expected_summary) = run_memory(wrapped.clone(), &sequential()).unwrap();
        for workers in [1, 2, 3, 5, 23] {
            let (got, summary) = run_memory(wrapped.clone(), &parallel(workers)).unwrap();
            assert_eq!(got, expected, "workers={workers}");
            assert_eq!(summary, expected_summary);
        }
    }

    #[test]
    fn too_many_workers_fails_before_any_frame_is_written() {
        let frames = vec![Frame::new(cubic(10.0), vec![Point3::origin(); 2])];
        let mut source = MemoryTrajectory::from_frames(frames);
        let mut sink = MemoryTrajectory::new();

        let err = run(
            &mut source,
            &mut sink,
            &parallel(3),
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            UnwrapError::InvalidPartition {
                workers: 3,
                particles: 2
            }
        ));
        assert!(sink.is_empty());
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn inconsistent_particle_count_aborts_the_run() {
        let frames = vec![
            Frame::new(cubic(10.0), vec![Point3::origin(); 2]),
            Frame::new(cubic(10.0), vec![Point3::origin(); 3]),
            Frame::new(cubic(10.0), vec![Point3::origin(); 2]),
        ];
        let mut sink = MemoryTrajectory::new();

        let err = run(
            MemoryTrajectory::from_frames(frames),
            &mut sink,
            &sequential(),
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            UnwrapError::ShapeMismatch {
                ref context,
                expected: 2,
                found: 3
            } if context == "frame 1"
        ));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn non_finite_coordinate_aborts_the_run() {
        let frames = vec![
            Frame::new(cubic(10.0), vec![Point3::origin(); 2]),
            Frame::new(
                cubic(10.0),
                vec![Point3::origin(), Point3::new(0.0, f64::INFINITY, 0.0)],
            ),
        ];

        let err = run_memory(frames, &sequential()).unwrap_err();

        assert!(matches!(
            err,
            UnwrapError::NonFiniteCoordinate { frame: 1, index: 1 }
        ));
    }

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    struct FailingSink {
        accept: usize,
    }

    impl TrajectorySink for FailingSink {
        type Error = DiskFull;

        fn write_frame(&mut self, _frame: &Frame) -> Result<(), Self::Error> {
            if self.accept == 0 {
                return Err(DiskFull);
            }
            self.accept -= 1;
            Ok(())
        }
    }

    #[test]
    fn sink_errors_are_propagated_with_frame_index() {
        let frames = vec![Frame::new(cubic(10.0), vec![Point3::origin()]); 3];

        let err = run(
            MemoryTrajectory::from_frames(frames),
            FailingSink { accept: 2 },
            &sequential(),
            &ProgressReporter::new(),
        )
        .err()
        .unwrap();

        assert!(matches!(err, UnwrapError::Sink { frame: 2, .. }));
        assert!(err.to_string().contains("disk full"));
    }

    struct FailingSource {
        remaining: usize,
    }

    impl TrajectorySource for FailingSource {
        type Error = DiskFull;

        fn n_particles(&self) -> usize {
            1
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
            if self.remaining == 0 {
                return Err(DiskFull);
            }
            self.remaining -= 1;
            Ok(Some(Frame::new(cubic(10.0), vec![Point3::origin()])))
        }
    }

    #[test]
    fn source_errors_are_propagated_with_frame_index() {
        let err = run(
            FailingSource { remaining: 1 },
            MemoryTrajectory::new(),
            &sequential(),
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, UnwrapError::Source { frame: 1, .. }));
    }

    #[test]
    fn reporter_receives_one_event_per_frame() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let log = events.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |e| {
            log.lock().unwrap().push(e);
        }));
        let cell = cubic(10.0);
        let frames = vec![
            Frame::new(cell, vec![Point3::new(9.0, 0.0, 0.0)]),
            Frame::new(cell, vec![Point3::new(1.0, 0.0, 0.0)]),
        ];

        run(
            MemoryTrajectory::from_frames(frames),
            MemoryTrajectory::new(),
            &parallel(1),
            &reporter,
        )
        .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                Progress::RunStart {
                    total_frames: Some(2)
                },
                Progress::FrameDone {
                    index: 0,
                    crossings: 0
                },
                Progress::FrameDone {
                    index: 1,
                    crossings: 1
                },
                Progress::RunFinish { frames: 2 },
            ]
        );
    }

    #[test]
    fn empty_trajectory_produces_empty_output() {
        let (out, summary) = run_memory(Vec::new(), &sequential()).unwrap();
        assert!(out.is_empty());
        assert_eq!(summary, UnwrapSummary::default());
    }
}
