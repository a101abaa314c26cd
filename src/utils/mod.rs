//! Shared utilities.
//!
//! - [`path`]: path normalization and editor temp-file detection
//! - [`hash`]: blake3 content hashing for compile inputs

pub mod hash;
pub mod path;
