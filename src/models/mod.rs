//! Jump-distance model implementations.
//!
//! Models are small, immutable values so that fitting, sampling and exporting
//! code can pass them around freely.

pub mod polynomial;

pub use polynomial::*;
