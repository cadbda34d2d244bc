//! Metaplex Token Metadata accounts.
//!
//! Only the leading fields of a `MetadataV1` account are decoded: that is
//! all a wallet needs to show a symbol and follow the off-chain URI.
//!
//! ```text
//! key               u8      (4 = MetadataV1)
//! update_authority  [u8; 32]
//! mint              [u8; 32]
//! name              u32 LE length + bytes (NUL padded)
//! symbol            u32 LE length + bytes (NUL padded)
//! uri               u32 LE length + bytes (NUL padded)
//! ...
//! ```

use crate::address::address_to_bytes;
use crate::error::SolError;
use crate::spl_token::find_program_address;

/// Token Metadata program address.
pub const TOKEN_METADATA_PROGRAM_ADDRESS: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

const METADATA_SEED: &[u8] = b"metadata";
const METADATA_V1_KEY: u8 = 4;

/// Decoded head of a metadata account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainMetadata {
    pub mint: [u8; 32],
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Derive the metadata account address for `mint`.
///
/// Seeds: `["metadata", metadata_program_id, mint]` under the metadata program.
pub fn derive_metadata_address(mint: &[u8; 32]) -> Result<[u8; 32], SolError> {
    let program_id = address_to_bytes(TOKEN_METADATA_PROGRAM_ADDRESS)?;
    find_program_address(&[METADATA_SEED, &program_id, mint.as_ref()], &program_id)
        .map(|(address, _bump)| address)
}

/// Decode the name/symbol/uri head of a `MetadataV1` account.
pub fn decode_metadata_account(data: &[u8]) -> Result<OnChainMetadata, SolError> {
    let mut cursor = Cursor { data, pos: 0 };

    let key = cursor.take(1, "key")?[0];
    if key != METADATA_V1_KEY {
        return Err(SolError::MetadataError(format!(
            "unexpected account key {key}, expected {METADATA_V1_KEY}"
        )));
    }

    cursor.take(32, "update authority")?;
    let mint: [u8; 32] = cursor
        .take(32, "mint")?
        .try_into()
        .map_err(|_| SolError::MetadataError("mint is not 32 bytes".into()))?;

    let name = cursor.string("name")?;
    let symbol = cursor.string("symbol")?;
    let uri = cursor.string("uri")?;

    Ok(OnChainMetadata {
        mint,
        name,
        symbol,
        uri,
    })
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], SolError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| SolError::MetadataError(format!("truncated {field}")))?;
        let data: &'a [u8] = self.data;
        let out = &data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn string(&mut self, field: &str) -> Result<String, SolError> {
        let len_bytes: [u8; 4] = self
            .take(4, field)?
            .try_into()
            .map_err(|_| SolError::MetadataError(format!("bad {field} length")))?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let raw = self.take(len, field)?;
        let text = std::str::from_utf8(raw)
            .map_err(|e| SolError::MetadataError(format!("{field} is not utf-8: {e}")))?;
        Ok(text.trim_end_matches('\0').trim().to_string())
    }
}
