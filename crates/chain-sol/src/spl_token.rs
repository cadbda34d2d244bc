//! SPL Token and Associated Token Account instructions.
//!
//! Instruction builders and associated token account (ATA) address
//! derivation, implemented without the `spl-token` or
//! `spl-associated-token-account` crates.

use sha2::{Digest, Sha256};

use crate::error::SolError;
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

// ---------------------------------------------------------------------------
// Well-known program IDs and account layout
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
];

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: [u8; 32] = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
];

/// Size in bytes of an SPL Token account.
pub const TOKEN_ACCOUNT_LEN: u64 = 165;

/// Byte offset of the owner field inside an SPL Token account
/// (it follows the 32-byte mint).
pub const TOKEN_ACCOUNT_OWNER_OFFSET: usize = 32;

/// SPL Token `Transfer` instruction index.
const TOKEN_TRANSFER_IX: u8 = 3;

/// ATA program instruction indices.
const ATA_CREATE_IX: u8 = 0;
const ATA_CREATE_IDEMPOTENT_IX: u8 = 1;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// ---------------------------------------------------------------------------
// SPL Token Transfer
// ---------------------------------------------------------------------------

/// Build an SPL Token `Transfer` instruction moving `amount` base units.
///
/// Accounts: source (writable), destination (writable), owner (signer).
/// Data: `[3] ++ amount as u64 LE`.
pub fn build_spl_transfer(
    from_token_account: &[u8; 32],
    to_token_account: &[u8; 32],
    owner: &[u8; 32],
    amount: u64,
) -> Result<SolInstruction, SolError> {
    if amount == 0 {
        return Err(SolError::TransactionBuildError(
            "SPL transfer amount must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(9);
    data.push(TOKEN_TRANSFER_IX);
    data.extend_from_slice(&amount.to_le_bytes());

    Ok(SolInstruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*from_token_account, false),
            SolAccountMeta::writable(*to_token_account, false),
            SolAccountMeta::readonly(*owner, true),
        ],
        data,
    })
}

// ---------------------------------------------------------------------------
// Associated Token Account creation
// ---------------------------------------------------------------------------

/// Build an ATA program `Create` instruction for the `(owner, mint)` pair,
/// funded by `payer`. Fails on-chain if the account already exists.
pub fn build_create_associated_token_account(
    payer: &[u8; 32],
    owner: &[u8; 32],
    mint: &[u8; 32],
) -> Result<SolInstruction, SolError> {
    create_ata_instruction(payer, owner, mint, ATA_CREATE_IX)
}

/// Same as [`build_create_associated_token_account`] but a no-op on-chain
/// when the account already exists.
pub fn build_create_associated_token_account_idempotent(
    payer: &[u8; 32],
    owner: &[u8; 32],
    mint: &[u8; 32],
) -> Result<SolInstruction, SolError> {
    create_ata_instruction(payer, owner, mint, ATA_CREATE_IDEMPOTENT_IX)
}

fn create_ata_instruction(
    payer: &[u8; 32],
    owner: &[u8; 32],
    mint: &[u8; 32],
    ix: u8,
) -> Result<SolInstruction, SolError> {
    let ata = derive_associated_token_address(owner, mint)?;

    Ok(SolInstruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*payer, true),
            SolAccountMeta::writable(ata, false),
            SolAccountMeta::readonly(*owner, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            SolAccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![ix],
    })
}

// ---------------------------------------------------------------------------
// Program Derived Addresses
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// Seeds: `[wallet, token_program_id, mint]` under the ATA program.
pub fn derive_associated_token_address(
    wallet: &[u8; 32],
    mint: &[u8; 32],
) -> Result<[u8; 32], SolError> {
    find_program_address(
        &[wallet.as_ref(), &TOKEN_PROGRAM_ID, mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find the canonical program-derived address for `seeds` under `program_id`.
///
/// Bumps are tried from 255 down; the first
/// `SHA-256(seeds || bump || program_id || "ProgramDerivedAddress")` that is
/// off the Ed25519 curve wins.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), SolError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::NoViableProgramAddress(
        "every bump seed landed on the curve".into(),
    ))
}

fn try_create_program_address(seeds: &[&[u8]], bump: u8, program_id: &[u8; 32]) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }
    Some(hash)
}

fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;

    #[test]
    fn program_id_constants_match_base58() {
        assert_eq!(
            address::bytes_to_address(&TOKEN_PROGRAM_ID),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
        assert_eq!(
            address::bytes_to_address(&ASSOCIATED_TOKEN_PROGRAM_ID),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
    }

    #[test]
    fn spl_transfer_encoding() {
        let ix = build_spl_transfer(&[1u8; 32], &[2u8; 32], &[3u8; 32], 2_000_000).unwrap();

        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(ix.data.len(), 9);
        assert_eq!(ix.data[0], 3);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 2_000_000);

        assert_eq!(ix.accounts[0].pubkey, [1u8; 32]);
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, [2u8; 32]);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_signer && !ix.accounts[2].is_writable);
    }

    #[test]
    fn spl_transfer_zero_amount_fails() {
        assert!(build_spl_transfer(&[1u8; 32], &[2u8; 32], &[3u8; 32], 0).is_err());
    }

    #[test]
    fn create_ata_targets_derived_address() {
        let payer = [0x10u8; 32];
        let owner = [0x20u8; 32];
        let mint = [0x30u8; 32];

        let ix = build_create_associated_token_account(&payer, &owner, &mint).unwrap();
        let expected = derive_associated_token_address(&owner, &mint).unwrap();

        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.data, vec![0]);
        assert_eq!(ix.accounts.len(), 6);
        assert_eq!(ix.accounts[0].pubkey, payer);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, expected);
        assert!(ix.accounts[1].is_writable);
        assert_eq!(ix.accounts[2].pubkey, owner);
        assert_eq!(ix.accounts[3].pubkey, mint);
        assert_eq!(ix.accounts[4].pubkey, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.accounts[5].pubkey, TOKEN_PROGRAM_ID);
    }

    #[test]
    fn idempotent_create_uses_instruction_one() {
        let ix =
            build_create_associated_token_account_idempotent(&[1u8; 32], &[2u8; 32], &[3u8; 32])
                .unwrap();
        assert_eq!(ix.data, vec![1]);
    }

    #[test]
    fn ata_is_off_curve_and_deterministic() {
        let wallet = [0xAAu8; 32];
        let mint = [0xBBu8; 32];

        let a = derive_associated_token_address(&wallet, &mint).unwrap();
        let b = derive_associated_token_address(&wallet, &mint).unwrap();
        assert_eq!(a, b);
        assert!(!is_on_curve(&a));
    }

    #[test]
    fn ata_matches_mainnet_usdc_account() {
        let wallet =
            address::address_to_bytes("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM").unwrap();
        let usdc =
            address::address_to_bytes("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();

        let ata = derive_associated_token_address(&wallet, &usdc).unwrap();
        assert_eq!(
            address::bytes_to_address(&ata),
            "FGETo8T8wMcN2wCjav8VK6eh3dLk63evNDPxzLSJra8B"
        );

        // Bump 250: the first five candidates land on the curve.
        let ata = derive_associated_token_address(&[0x42u8; 32], &usdc).unwrap();
        assert_eq!(
            address::bytes_to_address(&ata),
            "4pw5VSwn2Sec4SjMhbUSBcVjS51rG34Ho1WuHQgxqVd2"
        );
    }

    #[test]
    fn ata_differs_per_owner_and_mint() {
        let mint = [0xFFu8; 32];
        let a = derive_associated_token_address(&[1u8; 32], &mint).unwrap();
        let b = derive_associated_token_address(&[2u8; 32], &mint).unwrap();
        let c = derive_associated_token_address(&[1u8; 32], &[0xEEu8; 32]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }
}
