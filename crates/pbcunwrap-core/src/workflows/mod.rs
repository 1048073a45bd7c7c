//! # Workflows Module
//!
//! High-level entry points that tie trajectory I/O and the unwrapping engine together.
//!
//! - **Unwrap Workflow** ([`unwrap`]) - Streams every frame of a
//!   [`TrajectorySource`](crate::core::io::traits::TrajectorySource) through the
//!   frame-by-frame unwrapping driver into a
//!   [`TrajectorySink`](crate::core::io::traits::TrajectorySink), reporting progress along
//!   the way.
//!
//! Frames are processed strictly in order because each frame is unwrapped against the
//! previous frame's result; parallelism happens only inside a frame.

pub mod unwrap;
