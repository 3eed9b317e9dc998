//! PDA derivation for the vault, its token accounts and NFT metadata.
//!
//! All functions are pure. They fail only when the bump search finds no
//! off-curve address for the seed set.

use solana_pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use crate::error::{Result, VaultError};
use crate::state::{VaultAddresses, METADATA_PROGRAM_ID};

pub const AUTH_SEED: &[u8] = b"auth";
pub const VAULT_SEED: &[u8] = b"vault";
pub const METADATA_SEED: &[u8] = b"metadata";
pub const EDITION_SEED: &[u8] = b"edition";

/// Accounts the metadata program keeps for one NFT mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataAddresses {
    pub metadata_program: Pubkey,
    pub metadata_account: Pubkey,
    pub master_edition: Pubkey,
}

fn find(seeds: &[&[u8]], program_id: &Pubkey, seed: &'static str) -> Result<Pubkey> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, _bump)| address)
        .ok_or(VaultError::AddressDerivation { seed })
}

/// `["auth", vault_state]`
pub fn derive_authority(program_id: &Pubkey, vault_state: &Pubkey) -> Result<Pubkey> {
    find(&[AUTH_SEED, vault_state.as_ref()], program_id, "auth")
}

/// `["vault", vault_authority]`
pub fn derive_vault_balance(program_id: &Pubkey, vault_authority: &Pubkey) -> Result<Pubkey> {
    find(&[VAULT_SEED, vault_authority.as_ref()], program_id, "vault")
}

pub fn derive_vault_addresses(program_id: &Pubkey, vault_state: &Pubkey) -> Result<VaultAddresses> {
    let authority = derive_authority(program_id, vault_state)?;
    let balance = derive_vault_balance(program_id, &authority)?;
    Ok(VaultAddresses {
        state: *vault_state,
        authority,
        balance,
    })
}

pub fn derive_metadata_addresses(mint: &Pubkey) -> Result<MetadataAddresses> {
    let metadata_program = METADATA_PROGRAM_ID;
    let metadata_account = find(
        &[METADATA_SEED, metadata_program.as_ref(), mint.as_ref()],
        &metadata_program,
        "metadata",
    )?;
    let master_edition = find(
        &[
            METADATA_SEED,
            metadata_program.as_ref(),
            mint.as_ref(),
            EDITION_SEED,
        ],
        &metadata_program,
        "edition",
    )?;
    Ok(MetadataAddresses {
        metadata_program,
        metadata_account,
        master_edition,
    })
}

/// Canonical ATA of `owner` for `mint` under the classic SPL Token program.
/// The vault program rejects any other token account.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}
