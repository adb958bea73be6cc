//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observations and curve samples (`Observation`, `CurvePoint`, `JdPair`)
//! - the run configuration (`PipelineConfig`, `TableDomain`)

pub mod types;

pub use types::*;
