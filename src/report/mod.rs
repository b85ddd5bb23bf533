//! Reduction of tabular report data into dashboard metrics.

pub mod format;
pub mod reduce;

pub use reduce::{reduce, Reduction};
