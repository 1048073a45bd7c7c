//! # Engine Module
//!
//! The numerical core of periodic-boundary unwrapping.
//!
//! ## Overview
//!
//! Unwrapping is built bottom-up from a single scalar rule:
//!
//! - **Axis rule** ([`axis`]) - The integer number of cell lengths that brings one
//!   coordinate displacement back inside half a cell.
//! - **Frame unwrapping** ([`frame`]) - The axis rule applied to every particle and every
//!   axis of a frame, relative to the previous unwrapped frame.
//! - **Partitioning** ([`partition`]) - Contiguous, balanced split of the particle range.
//! - **Parallel unwrapping** ([`parallel`]) - Frame unwrapping over partitions on a rayon
//!   thread pool, bit-for-bit identical to the sequential path.
//!
//! Supporting modules cover [`config`], [`error`] and [`progress`] reporting.
//!
//! Every particle's shift depends only on its own current/reference pair and the cell
//! length, which is what makes the partitioned execution safe.

pub mod axis;
pub mod config;
pub mod error;
pub mod frame;
pub mod parallel;
pub mod partition;
pub mod progress;
