//! Account key codec.
//!
//! A Solana account key is 32 bytes, rendered as Base58. Program-derived
//! addresses use the same encoding even though they have no private key, so
//! validation here is purely syntactic: anything that decodes to exactly 32
//! bytes is a well-formed key.

use crate::error::SolError;

/// Check that `address` is a Base58 string decoding to exactly 32 bytes.
pub fn validate_address(address: &str) -> Result<(), SolError> {
    address_to_bytes(address).map(|_| ())
}

/// Decode an account key string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    if address.is_empty() {
        return Err(SolError::InvalidAddress("empty address".into()));
    }

    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as an account key string.
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}
