//! Feature derivation from free-text shop records.
//!
//! All functions here are pure and total: they never fail, and the same input
//! always produces the same output. Training and inference both go through
//! them, which is what keeps the learned encodings consistent.

pub mod cost;
pub mod duration;
pub mod normalize;
pub mod tier;

pub use cost::*;
pub use duration::*;
pub use normalize::*;
pub use tier::*;
