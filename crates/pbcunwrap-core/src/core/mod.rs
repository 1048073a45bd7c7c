//! # Core Module
//!
//! Stateless building blocks: the data model for cells and frames ([`models`]) and the
//! trajectory input/output layer ([`io`]).
//!
//! Nothing in this module knows about unwrapping; the [`engine`](crate::engine) and
//! [`workflows`](crate::workflows) layers build on top of it.

pub mod io;
pub mod models;
