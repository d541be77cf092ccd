//! Collection and item state machines.
//!
//! Handlers stay thin: they extract the caller and payload and delegate
//! here. Every guard (ownership, lock, publication) is re-read from the
//! database and the subgraph right before the write it protects.

pub mod access;
pub mod collection;
pub mod item;

pub use collection::CollectionService;
pub use item::ItemService;
