//! Domain core of the builder backend.
//!
//! Pure logic shared by the database, remote and API crates: identifiers,
//! lifecycle rules, hashing, cheque verification, and the consolidation of
//! stored rows with chain and catalyst state.

pub mod cheque;
pub mod collection;
pub mod committee;
pub mod consolidation;
pub mod content_hash;
pub mod error;
pub mod fragments;
pub mod hashing;
pub mod item;
pub mod types;
pub mod urn;
