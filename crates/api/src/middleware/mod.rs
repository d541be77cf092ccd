//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the calling address from a JWT Bearer token.

pub mod auth;
