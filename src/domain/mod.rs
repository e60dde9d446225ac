//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed vocabularies (`Tier`, `CostCategory`, `SpeedCategory`, `Column`)
//! - raw and canonical repair records (`RawRecord`, `CanonicalRecord`)
//! - run configuration (`TrainConfig`, `CostBreakpoints`, `ArtifactPaths`)

pub mod types;

pub use types::*;
