//! Shared digest helpers: SHA-256 hex, Keccak-256, and raw-leaf CIDv1
//! strings as produced by the catalyst for single-chunk content.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::CoreError;

/// Largest payload that hashes to a single raw IPFS leaf.
pub const MAX_RAW_LEAF_BYTES: usize = 262_144;

/// CIDv1 prefix: version 1, `raw` codec, `sha2-256` multihash of 32 bytes.
const CID_V1_RAW_SHA256_PREFIX: [u8; 4] = [0x01, 0x55, 0x12, 0x20];

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Keccak-256 digest (the Ethereum flavour, not NIST SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Lower-case hex Keccak-256 digest without a `0x` prefix.
pub fn keccak256_hex(data: &[u8]) -> String {
    hex::encode(keccak256(data))
}

/// CIDv1 (`raw` codec, sha2-256, base32 multibase) of a single-chunk payload.
///
/// Payloads larger than [`MAX_RAW_LEAF_BYTES`] would be split into a DAG by
/// the catalyst, which this function does not reproduce. They are rejected
/// with [`CoreError::ContentTooLarge`].
pub fn cid_v1_raw(data: &[u8]) -> Result<String, CoreError> {
    if data.len() > MAX_RAW_LEAF_BYTES {
        return Err(CoreError::ContentTooLarge {
            size: data.len(),
            max: MAX_RAW_LEAF_BYTES,
        });
    }

    let mut bytes = Vec::with_capacity(CID_V1_RAW_SHA256_PREFIX.len() + 32);
    bytes.extend_from_slice(&CID_V1_RAW_SHA256_PREFIX);
    bytes.extend_from_slice(&Sha256::digest(data));

    let encoded = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes);
    Ok(format!("b{}", encoded.to_lowercase()))
}
