//! Slot-usage cheques: EIP-712 hashing and signer recovery.
//!
//! A cheque lets a third party manager spend `qty` publication slots. The
//! manager signs the typed message
//! `ConsumeSlots(string thirdPartyId,uint256 qty,bytes32 salt)` under the
//! third party registry domain; the same hash is the id of the on-chain
//! receipt once the cheque is consumed.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hashing::keccak256;
use crate::types::{same_address, DbId};

pub const DOMAIN_NAME: &str = "Decentraland Third Party Registry";
pub const DOMAIN_VERSION: &str = "1";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,address verifyingContract,bytes32 salt)";
const CONSUME_SLOTS_TYPE: &str = "ConsumeSlots(string thirdPartyId,uint256 qty,bytes32 salt)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUsageCheque {
    /// 65-byte `r || s || v` signature, `0x` prefixed hex.
    pub signature: String,
    pub qty: u64,
    /// 32-byte salt, `0x` prefixed hex.
    pub salt: String,
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

fn decode_hex(value: &str) -> Result<Vec<u8>, CoreError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| CoreError::Validation(format!("'{value}' is not hex: {e}")))
}

fn decode_bytes32(value: &str) -> Result<[u8; 32], CoreError> {
    let bytes = decode_hex(value)?;
    bytes
        .try_into()
        .map_err(|_| CoreError::Validation(format!("'{value}' is not 32 bytes long")))
}

/// Left-pad an address into a 32-byte ABI word.
fn address_word(address: &str) -> Result<[u8; 32], CoreError> {
    let bytes = decode_hex(address)?;
    if bytes.len() != 20 {
        return Err(CoreError::Validation(format!("'{address}' is not an address")));
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// EIP-712 domain separator of the third party registry. The chain id is
/// carried as the domain salt.
pub fn domain_separator(registry_address: &str, chain_id: u64) -> Result<[u8; 32], CoreError> {
    let mut encoded = Vec::with_capacity(32 * 5);
    encoded.extend_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
    encoded.extend_from_slice(&keccak256(DOMAIN_NAME.as_bytes()));
    encoded.extend_from_slice(&keccak256(DOMAIN_VERSION.as_bytes()));
    encoded.extend_from_slice(&address_word(registry_address)?);
    encoded.extend_from_slice(&u64_word(chain_id));
    Ok(keccak256(&encoded))
}

fn consume_slots_hash(third_party_id: &str, qty: u64, salt: &[u8; 32]) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(32 * 4);
    encoded.extend_from_slice(&keccak256(CONSUME_SLOTS_TYPE.as_bytes()));
    encoded.extend_from_slice(&keccak256(third_party_id.as_bytes()));
    encoded.extend_from_slice(&u64_word(qty));
    encoded.extend_from_slice(salt);
    keccak256(&encoded)
}

/// The digest a manager signs for the cheque. Also the on-chain receipt id.
pub fn cheque_message_hash(
    third_party_id: &str,
    qty: u64,
    salt: &str,
    registry_address: &str,
    chain_id: u64,
) -> Result<[u8; 32], CoreError> {
    let salt = decode_bytes32(salt)?;
    let mut encoded = Vec::with_capacity(2 + 64);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(&domain_separator(registry_address, chain_id)?);
    encoded.extend_from_slice(&consume_slots_hash(third_party_id, qty, &salt));
    Ok(keccak256(&encoded))
}

/// `0x` prefixed hex of a digest, as used for receipt ids.
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    to_hex_prefixed(&hash[12..])
}

/// Recover the lower-cased signer address of a prehashed message.
pub fn recover_signer(message_hash: &[u8; 32], signature: &str) -> Result<String, CoreError> {
    let bytes = decode_hex(signature).map_err(|e| CoreError::MalformedSignature(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(CoreError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = match bytes[64] {
        v @ (27 | 28) => v - 27,
        v @ (0 | 1) => v,
        other => {
            return Err(CoreError::MalformedSignature(format!(
                "invalid recovery byte {other}"
            )))
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| CoreError::MalformedSignature(format!("invalid recovery id {v}")))?;
    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CoreError::MalformedSignature(e.to_string()))?;

    let key = VerifyingKey::recover_from_prehash(message_hash, &signature, recovery_id)
        .map_err(|e| CoreError::MalformedSignature(e.to_string()))?;
    Ok(address_from_verifying_key(&key))
}

/// Check a cheque against the collection being published and the manager
/// asserting it. Returns the message hash on success.
pub fn verify_cheque(
    collection_id: DbId,
    cheque: &SlotUsageCheque,
    third_party_id: &str,
    items_to_publish: usize,
    signer: &str,
    registry_address: &str,
    chain_id: u64,
) -> Result<[u8; 32], CoreError> {
    if cheque.qty != items_to_publish as u64 {
        return Err(CoreError::ChequeQuantityMismatch {
            id: collection_id,
            expected: items_to_publish,
            got: cheque.qty,
        });
    }

    let hash = cheque_message_hash(
        third_party_id,
        cheque.qty,
        &cheque.salt,
        registry_address,
        chain_id,
    )?;
    let recovered = recover_signer(&hash, &cheque.signature)?;
    if !same_address(&recovered, signer) {
        return Err(CoreError::ChequeSignerMismatch {
            id: collection_id,
            signer: recovered,
            expected: signer.to_lowercase(),
        });
    }
    Ok(hash)
}

#[cfg(test)]
pub(crate) mod test_support {
    use k256::ecdsa::SigningKey;

    use super::*;

    pub const REGISTRY: &str = "0x1C436C1EFb4608dFfDC8bace99d2B03c314f3348";
    pub const CHAIN_ID: u64 = 80002;

    pub fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    pub fn address_of(key: &SigningKey) -> String {
        address_from_verifying_key(key.verifying_key())
    }

    pub fn sign(key: &SigningKey, third_party_id: &str, qty: u64, salt: &str) -> SlotUsageCheque {
        let hash = cheque_message_hash(third_party_id, qty, salt, REGISTRY, CHAIN_ID).unwrap();
        let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        SlotUsageCheque {
            signature: to_hex_prefixed(&bytes),
            qty,
            salt: salt.to_string(),
        }
    }
}
