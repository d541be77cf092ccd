pub mod address;
pub mod collection;
pub mod item;
