//! # pbcunwrap Core Library
//!
//! Removes periodic-boundary jumps from molecular dynamics trajectories recorded in a
//! rectangular cell whose size may change from frame to frame.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Cell and frame data types plus trajectory I/O behind the
//!   `TrajectorySource` / `TrajectorySink` traits, with a DCD implementation.
//!
//! - **[`engine`]: The Logic Core.** The per-axis shift rule, frame unwrapping, particle
//!   partitioning and the rayon-backed parallel unwrapper, together with configuration,
//!   errors and progress reporting.
//!
//! - **[`workflows`]: The Public API.** The trajectory driver that walks a source frame by
//!   frame, keeps the previous unwrapped frame as reference and writes every result to a
//!   sink.
//!
//! ## Example
//!
//! ```ignore
//! use pbcunwrap::core::io::dcd::{DcdReader, DcdWriteOptions, DcdWriter};
//! use pbcunwrap::engine::{config::UnwrapConfig, progress::ProgressReporter};
//! use pbcunwrap::workflows;
//!
//! let reader = DcdReader::open("wrapped.dcd")?;
//! let options = DcdWriteOptions::from_header(reader.header());
//! let writer = DcdWriter::create("unwrapped.dcd", reader.n_atoms(), &options)?;
//! let (_, summary) = workflows::unwrap::run(
//!     reader,
//!     writer,
//!     &UnwrapConfig::default(),
//!     &ProgressReporter::new(),
//! )?;
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
