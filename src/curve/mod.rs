//! Resampling fitted models into plot curves and jump-distance tables.

pub mod sampler;

pub use sampler::*;
