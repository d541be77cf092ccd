//! Row models and insert/update DTOs, one module per table family.

pub mod cheque;
pub mod collection;
pub mod curation;
pub mod item;
pub mod third_party;
