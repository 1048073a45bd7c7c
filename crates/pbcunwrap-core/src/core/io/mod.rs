//! Trajectory input and output.
//!
//! The unwrapping driver only talks to the [`traits::TrajectorySource`] and
//! [`traits::TrajectorySink`] traits. This module provides two implementations of each:
//! the binary DCD format ([`dcd`]) used by CHARMM, NAMD and LAMMPS, and an in-memory
//! trajectory ([`memory`]) for library callers and tests.

pub mod dcd;
pub mod memory;
pub mod traits;
