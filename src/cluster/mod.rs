//! Unsupervised grouping of observations into preference regimes.
//!
//! Players tend to settle on one of a few jump-distance habits, so the
//! observation cloud is split with a fixed-k, fixed-seed K-Means before any
//! curve is fit.

pub mod kmeans;

pub use kmeans::*;
