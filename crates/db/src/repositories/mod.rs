//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a connection, when the call takes part in a
//! transaction) as the first argument.

pub mod cheque_repo;
pub mod collection_repo;
pub mod curation_repo;
pub mod item_repo;
pub mod publication_repo;
pub mod third_party_repo;

pub use cheque_repo::SlotUsageChequeRepo;
pub use collection_repo::CollectionRepo;
pub use curation_repo::{CollectionCurationRepo, ItemCurationRepo};
pub use item_repo::ItemRepo;
pub use publication_repo::PublicationRepo;
pub use third_party_repo::VirtualThirdPartyRepo;
