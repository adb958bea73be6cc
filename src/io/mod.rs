//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - jump-distance table export (`export`)
//! - regime JSON read/write (`regimes`)

pub mod export;
pub mod ingest;
pub mod regimes;

pub use export::*;
pub use ingest::*;
pub use regimes::*;
