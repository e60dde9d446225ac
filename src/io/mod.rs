//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - model/encoder artifact persistence (`artifacts`)
//! - canonical-record CSV and report JSON exports (`export`)

pub mod artifacts;
pub mod export;
pub mod ingest;

pub use artifacts::*;
pub use export::*;
pub use ingest::*;
