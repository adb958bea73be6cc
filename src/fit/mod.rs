//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit polynomial degrees 1..=4 per regime and pick the best by R²
//! - rank fitted regimes and keep the best few

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
