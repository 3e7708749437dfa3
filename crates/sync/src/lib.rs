//! Brings object storage into agreement with a newly assembled manifest.
//!
//! See [`Publisher::publish`] for the order of operations.

pub mod error;
mod publish;

pub use crate::publish::{Outcome, Publisher};
