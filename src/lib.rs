//! `jd-curves` library crate.
//!
//! The binary (`jd`) is a thin wrapper around this library so that:
//!
//! - the clustering/fitting pipeline is testable without spawning processes
//! - the CLI and the TUI share one implementation
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod cluster;
pub mod curve;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
