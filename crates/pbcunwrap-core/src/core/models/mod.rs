//! # Core Models Module
//!
//! Plain data types shared by the unwrapping engine and the trajectory I/O layer.
//!
//! - [`cell`] - Rectangular cell dimensions and the [`cell::Axis`] enumeration
//! - [`frame`] - A single trajectory snapshot and the position array type
//!
//! Both types are index-stable: particle `i` in one frame is particle `i` in every other
//! frame of the same trajectory.

pub mod cell;
pub mod frame;
