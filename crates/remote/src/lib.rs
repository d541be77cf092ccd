//! Read-only collaborators: the collections and third party subgraphs, the
//! chain RPC, the catalyst, and the object store holding item contents.
//!
//! Each is exposed behind a trait so services can run against in-memory
//! fakes.

pub mod catalyst;
pub mod chain;
pub mod error;
pub mod object_store;
pub mod subgraph;

pub use catalyst::{CatalystReader, HttpCatalyst};
pub use chain::{ChainReader, JsonRpcChain};
pub use error::RemoteError;
pub use object_store::{ObjectStore, S3ObjectStore};
pub use subgraph::{GraphQlSubgraph, SubgraphReader};
