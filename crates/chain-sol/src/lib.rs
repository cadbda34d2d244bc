//! Solana primitives for the transfer engine.
//!
//! Address codec, program-derived addresses, SPL Token / Associated Token
//! Account instructions, Metaplex metadata decoding and the legacy
//! transaction message format. Everything here is synchronous and free of
//! I/O, and is written by hand on top of `sha2`, `curve25519-dalek` and
//! `bs58` instead of pulling in `solana-sdk`.

pub mod address;
pub mod error;
pub mod metadata;
pub mod spl_token;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, validate_address};
pub use error::SolError;
pub use metadata::{
    decode_metadata_account, derive_metadata_address, OnChainMetadata,
    TOKEN_METADATA_PROGRAM_ADDRESS,
};
pub use spl_token::{
    build_create_associated_token_account, build_create_associated_token_account_idempotent,
    build_spl_transfer, derive_associated_token_address,
    find_program_address, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_ACCOUNT_LEN,
    TOKEN_ACCOUNT_OWNER_OFFSET, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    build_system_transfer, compile_transaction, encode_compact_u16, serialize_message,
    CompiledInstruction, SolAccountMeta, SolInstruction, SolTransaction, LAMPORTS_PER_SOL,
    NATIVE_DECIMALS, SYSTEM_PROGRAM_ID,
};
