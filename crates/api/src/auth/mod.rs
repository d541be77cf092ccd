//! Authentication primitives.
//!
//! - [`jwt`] -- JWT validation (and minting, for tooling and tests).

pub mod jwt;
