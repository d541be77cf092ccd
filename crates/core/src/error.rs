use crate::types::DbId;

/// Coarse error categories used to pick an HTTP status and to let callers
/// branch on the kind of failure without enumerating every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Locked,
    Unauthorized,
    InvalidRequest,
    Inconsistent,
    UpstreamUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // --- NotFound ---
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    // --- InvalidRequest ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("The URN '{urn}' is not a valid third party collection URN")]
    InvalidCollectionUrn { urn: String },

    #[error("The URN '{urn}' is not a valid item URN")]
    InvalidItemUrn { urn: String },

    #[error("The URN '{urn}' is not a third party item URN")]
    NotThirdPartyItemUrn { urn: String },

    #[error("The {entity} id in the path ({path_id}) does not match the one in the body ({body_id})")]
    IdMismatch {
        entity: &'static str,
        path_id: String,
        body_id: String,
    },

    #[error("Item {id} exceeds the maximum amount of tags ({max})")]
    MaximumAmountOfTagsReached { id: DbId, max: usize },

    #[error("Item {item_id} can't be moved from collection {from} to collection {to}")]
    ItemCantBeMovedFromCollection { item_id: DbId, from: DbId, to: DbId },

    #[error("Item {id} references contents that were not uploaded: {missing:?}")]
    ItemContentsNotUploaded { id: DbId, missing: Vec<String> },

    #[error("Collection {id} has no items to publish")]
    NoItemsToPublish { id: DbId },

    #[error("The cheque for collection {id} covers {got} slots but {expected} items are being published")]
    ChequeQuantityMismatch { id: DbId, expected: usize, got: u64 },

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Content of {size} bytes exceeds the {max} bytes a single raw block can hash")]
    ContentTooLarge { size: usize, max: usize },

    // --- Conflict ---
    #[error("{entity} {id} is already published")]
    AlreadyPublished { entity: &'static str, id: DbId },

    #[error("Collection {id} is not published on chain")]
    UnpublishedCollection { id: DbId },

    #[error("Collection {id} needs {requested} slots but only {available} are available")]
    InsufficientSlots {
        id: DbId,
        available: i64,
        requested: usize,
    },

    #[error("The URN '{urn}' is already in use")]
    UrnAlreadyInUse { urn: String },

    #[error("The collection name '{name}' is already in use")]
    CollectionNameInUse { name: String },

    #[error("Collection {id} can't change between a standard and a third party collection")]
    CollectionKindChange { id: DbId },

    #[error("Collection {id} can't be moved from third party {from} to {to}")]
    CollectionThirdPartyChange { id: DbId, from: String, to: String },

    #[error("The contract address of collection {id} can't be changed")]
    CollectionContractChange { id: DbId },

    #[error("The URN suffix of item {id} can't be changed once it has been curated")]
    UrnSuffixChange { id: DbId },

    #[error("Collection {id} already has a publication waiting for curation")]
    PublicationInProgress { id: DbId },

    #[error("The rarity of item {id} can't be changed after it was published")]
    ItemPublishedRarityChange { id: DbId },

    #[error("Conflict: {0}")]
    Conflict(String),

    // --- Locked ---
    #[error("{entity} {id} is locked")]
    Locked { entity: &'static str, id: DbId },

    // --- Unauthorized ---
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{eth_address} is not the owner or a manager of {entity} {id}")]
    NotOwnerOrManager {
        entity: &'static str,
        id: String,
        eth_address: String,
    },

    #[error("The cheque for collection {id} was signed by {signer}, expected {expected}")]
    ChequeSignerMismatch {
        id: DbId,
        signer: String,
        expected: String,
    },

    // --- Inconsistent ---
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    #[error("Item {item_id} of collection {collection_id} has no counterpart on chain")]
    ItemMissingOnChain { collection_id: DbId, item_id: DbId },

    #[error("Item {id} is not published, its content hash can't be computed")]
    UnpublishedItemHash { id: DbId },

    #[error("Internal error: {0}")]
    Internal(String),

    // --- UpstreamUnavailable ---
    #[error("{service} is unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },
}

impl CoreError {
    /// Fold the variant into its taxonomy bucket.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,

            CoreError::Validation(_)
            | CoreError::InvalidCollectionUrn { .. }
            | CoreError::InvalidItemUrn { .. }
            | CoreError::NotThirdPartyItemUrn { .. }
            | CoreError::IdMismatch { .. }
            | CoreError::MaximumAmountOfTagsReached { .. }
            | CoreError::ItemCantBeMovedFromCollection { .. }
            | CoreError::ItemContentsNotUploaded { .. }
            | CoreError::NoItemsToPublish { .. }
            | CoreError::ChequeQuantityMismatch { .. }
            | CoreError::MalformedSignature(_)
            | CoreError::ContentTooLarge { .. } => ErrorKind::InvalidRequest,

            CoreError::AlreadyPublished { .. }
            | CoreError::UnpublishedCollection { .. }
            | CoreError::InsufficientSlots { .. }
            | CoreError::UrnAlreadyInUse { .. }
            | CoreError::CollectionNameInUse { .. }
            | CoreError::CollectionKindChange { .. }
            | CoreError::CollectionThirdPartyChange { .. }
            | CoreError::CollectionContractChange { .. }
            | CoreError::UrnSuffixChange { .. }
            | CoreError::PublicationInProgress { .. }
            | CoreError::ItemPublishedRarityChange { .. }
            | CoreError::Conflict(_) => ErrorKind::Conflict,

            CoreError::Locked { .. } => ErrorKind::Locked,

            CoreError::Unauthorized(_)
            | CoreError::NotOwnerOrManager { .. }
            | CoreError::ChequeSignerMismatch { .. } => ErrorKind::Unauthorized,

            CoreError::Inconsistent(_)
            | CoreError::ItemMissingOnChain { .. }
            | CoreError::UnpublishedItemHash { .. }
            | CoreError::Internal(_) => ErrorKind::Inconsistent,

            CoreError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
        }
    }

    /// Shorthand for a `NotFound` keyed by any displayable id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
