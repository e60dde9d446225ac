//! `repair-estimator` library crate.
//!
//! The binary (`repest`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the estimate service can be embedded behind other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod encode;
pub mod error;
pub mod estimate;
pub mod features;
pub mod io;
pub mod preprocess;
pub mod report;
pub mod snapshot;
pub mod tables;
pub mod tree;
