//! Single-instruction vault operations.

use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;

use crate::context::VaultContext;
use crate::error::Result;
use crate::instruction;
use crate::ledger::Ledger;
use crate::state::RawAmount;
use crate::submit::Submitter;

/// Creates a vault around `vault_state`, which co-signs as the new account.
pub fn initialize_vault<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Keypair,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(&vault_state.pubkey())?;
    let ix = instruction::initialize(&ctx.program_id, &ctx.payer_pubkey(), &vault)?;
    ctx.submit_with(ix, &[vault_state])
}

pub fn deposit_sol<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    lamports: u64,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(vault_state)?;
    ctx.submit(instruction::deposit_sol(
        &ctx.program_id,
        &ctx.payer_pubkey(),
        &vault,
        lamports,
    )?)
}

pub fn withdraw_sol<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    lamports: u64,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(vault_state)?;
    ctx.submit(instruction::withdraw_sol(
        &ctx.program_id,
        &ctx.payer_pubkey(),
        &vault,
        lamports,
    )?)
}

fn ensure_token_accounts<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_authority: &Pubkey,
    mint: &Pubkey,
) -> Result<()> {
    ctx.ensure_token_account(&ctx.payer_pubkey(), mint)?;
    ctx.ensure_token_account(vault_authority, mint)?;
    Ok(())
}

pub fn deposit_spl<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    mint: &Pubkey,
    amount: &RawAmount,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(vault_state)?;
    let ix = instruction::deposit_spl(&ctx.program_id, &ctx.payer_pubkey(), &vault, mint, amount)?;
    ensure_token_accounts(ctx, &vault.authority, mint)?;
    ctx.submit(ix)
}

pub fn withdraw_spl<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    mint: &Pubkey,
    amount: &RawAmount,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(vault_state)?;
    let ix = instruction::withdraw_spl(&ctx.program_id, &ctx.payer_pubkey(), &vault, mint, amount)?;
    ensure_token_accounts(ctx, &vault.authority, mint)?;
    ctx.submit(ix)
}

pub fn deposit_nft<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    mint: &Pubkey,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(vault_state)?;
    let ix = instruction::deposit_nft(&ctx.program_id, &ctx.payer_pubkey(), &vault, mint)?;
    ensure_token_accounts(ctx, &vault.authority, mint)?;
    ctx.submit(ix)
}

pub fn withdraw_nft<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    mint: &Pubkey,
) -> Result<Signature> {
    let vault = ctx.vault_addresses(vault_state)?;
    let ix = instruction::withdraw_nft(&ctx.program_id, &ctx.payer_pubkey(), &vault, mint)?;
    ensure_token_accounts(ctx, &vault.authority, mint)?;
    ctx.submit(ix)
}

/// Sends Close without checking the vault first. Tokens still held by the
/// vault authority become unreachable; use [`crate::liquidate`] unless the
/// vault was verified empty.
pub fn close_vault<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
) -> Result<Signature> {
    let payer = ctx.payer_pubkey();
    ctx.submit(instruction::close(&ctx.program_id, &payer, &payer, vault_state)?)
}
