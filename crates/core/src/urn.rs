//! Decentraland URN parsing and construction.
//!
//! Standard (on-chain) collections live under
//! `urn:decentraland:<network>:collections-v2:<contract>[:<token id>]`.
//! Third party collections and items hang off a third party id,
//! `urn:decentraland:<network>:collections-thirdparty:<name>` (or the
//! `collections-linked-wearables` flavour), followed by the collection suffix
//! and, for items, the item suffix.
//!
//! Every pattern is anchored: a URN either decodes fully or fails.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Networks that may appear in the network segment of a URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Sepolia,
    Goerli,
    Matic,
    Amoy,
    Mumbai,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
            Self::Goerli => "goerli",
            Self::Matic => "matic",
            Self::Amoy => "amoy",
            Self::Mumbai => "mumbai",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            "goerli" => Ok(Self::Goerli),
            "matic" => Ok(Self::Matic),
            "amoy" => Ok(Self::Amoy),
            "mumbai" => Ok(Self::Mumbai),
            other => Err(CoreError::Validation(format!("Unknown network '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

const NETWORK_PATTERN: &str = "mainnet|sepolia|goerli|matic|amoy|mumbai";
const SEGMENT_PATTERN: &str = r"[^:|\s]+";

fn third_party_id_pattern() -> String {
    format!(
        "urn:decentraland:(?P<network>{NETWORK_PATTERN}):\
         (?:collections-thirdparty|collections-linked-wearables):{SEGMENT_PATTERN}"
    )
}

static THIRD_PARTY_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", third_party_id_pattern())).expect("valid regex")
});

static TP_COLLECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^(?P<third_party_id>{}):(?P<urn_suffix>{SEGMENT_PATTERN})$",
        third_party_id_pattern()
    ))
    .expect("valid regex")
});

static TP_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^(?P<third_party_id>{}):(?P<collection_urn_suffix>{SEGMENT_PATTERN}):\
         (?P<item_urn_suffix>{SEGMENT_PATTERN})$",
        third_party_id_pattern()
    ))
    .expect("valid regex")
});

static STANDARD_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^urn:decentraland:(?P<network>{NETWORK_PATTERN}):collections-v2:\
         (?P<contract_address>0x[0-9a-fA-F]{{40}}):(?P<token_id>[0-9]+)$"
    ))
    .expect("valid regex")
});

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parts of a third party collection URN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThirdPartyCollectionUrn {
    pub third_party_id: String,
    pub network: Network,
    pub urn_suffix: String,
}

/// Parts of a third party item URN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThirdPartyItemUrn {
    pub third_party_id: String,
    pub network: Network,
    pub collection_urn_suffix: String,
    pub item_urn_suffix: String,
}

/// Whether `id` has the shape of a third party id.
pub fn is_third_party_id(id: &str) -> bool {
    THIRD_PARTY_ID_RE.is_match(id)
}

/// Decode `<third party id>:<collection suffix>`.
pub fn decode_tp_collection_urn(urn: &str) -> Result<ThirdPartyCollectionUrn, CoreError> {
    let caps = TP_COLLECTION_RE
        .captures(urn)
        .ok_or_else(|| CoreError::InvalidCollectionUrn {
            urn: urn.to_string(),
        })?;

    Ok(ThirdPartyCollectionUrn {
        third_party_id: caps["third_party_id"].to_string(),
        network: caps["network"].parse()?,
        urn_suffix: caps["urn_suffix"].to_string(),
    })
}

/// Decode `<third party id>:<collection suffix>:<item suffix>`.
///
/// A standard `collections-v2` item URN fails with
/// [`CoreError::NotThirdPartyItemUrn`]; anything that is not an item URN at
/// all fails with [`CoreError::InvalidItemUrn`].
pub fn decode_tp_item_urn(urn: &str) -> Result<ThirdPartyItemUrn, CoreError> {
    if let Some(caps) = TP_ITEM_RE.captures(urn) {
        return Ok(ThirdPartyItemUrn {
            third_party_id: caps["third_party_id"].to_string(),
            network: caps["network"].parse()?,
            collection_urn_suffix: caps["collection_urn_suffix"].to_string(),
            item_urn_suffix: caps["item_urn_suffix"].to_string(),
        });
    }

    if STANDARD_ITEM_RE.is_match(urn) {
        return Err(CoreError::NotThirdPartyItemUrn {
            urn: urn.to_string(),
        });
    }

    Err(CoreError::InvalidItemUrn {
        urn: urn.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

pub fn build_tp_collection_urn(third_party_id: &str, urn_suffix: &str) -> String {
    format!("{third_party_id}:{urn_suffix}")
}

pub fn build_tp_item_urn(
    third_party_id: &str,
    collection_urn_suffix: &str,
    item_urn_suffix: &str,
) -> String {
    format!("{third_party_id}:{collection_urn_suffix}:{item_urn_suffix}")
}

pub fn decentraland_collection_urn(network: Network, contract_address: &str) -> String {
    format!(
        "urn:decentraland:{network}:collections-v2:{}",
        contract_address.to_lowercase()
    )
}

pub fn decentraland_item_urn(network: Network, contract_address: &str, token_id: &str) -> String {
    format!(
        "{}:{token_id}",
        decentraland_collection_urn(network, contract_address)
    )
}
