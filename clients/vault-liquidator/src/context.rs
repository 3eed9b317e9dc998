//! Explicit run context: client handle, payer and program settings.

use solana_instruction::Instruction;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use crate::error::Result;
use crate::instruction::describe;
use crate::ledger::Ledger;
use crate::pda::{associated_token_address, derive_vault_addresses};
use crate::state::{TokenAccountEntry, VaultAddresses, VaultSnapshot, DEFAULT_RENT_EXEMPT_MINIMUM};
use crate::submit::Submitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Lamports left in the balance account by a non-closing withdrawal.
    pub rent_exempt_minimum: u64,
    /// Create missing payer/vault ATAs before token transfers.
    pub create_missing_token_accounts: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rent_exempt_minimum: DEFAULT_RENT_EXEMPT_MINIMUM,
            create_missing_token_accounts: true,
        }
    }
}

/// Everything a vault operation needs. Immutable for the whole run; the
/// payer key is only ever read.
pub struct VaultContext<'a, C> {
    pub client: &'a C,
    pub payer: &'a Keypair,
    pub program_id: Pubkey,
    pub settings: Settings,
}

impl<'a, C: Ledger + Submitter> VaultContext<'a, C> {
    pub fn new(client: &'a C, payer: &'a Keypair, program_id: Pubkey, settings: Settings) -> Self {
        Self {
            client,
            payer,
            program_id,
            settings,
        }
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn vault_addresses(&self, vault_state: &Pubkey) -> Result<VaultAddresses> {
        derive_vault_addresses(&self.program_id, vault_state)
    }

    /// Reads the balance PDA's lamports and every token account owned by the
    /// vault authority.
    pub fn inspect(&self, vault_state: &Pubkey) -> Result<VaultSnapshot> {
        let addresses = self.vault_addresses(vault_state)?;
        let lamports = self.client.lamport_balance(&addresses.balance)?;
        let token_accounts = self.client.token_accounts_by_owner(&addresses.authority)?;

        for entry in &token_accounts {
            if let TokenAccountEntry::Malformed { address, reason, .. } = entry {
                log::warn!("skipping token account {address}: {reason}");
            }
        }

        Ok(VaultSnapshot {
            addresses,
            lamports,
            token_accounts,
        })
    }

    pub fn submit(&self, instruction: Instruction) -> Result<Signature> {
        self.submit_with(instruction, &[])
    }

    /// Submits with the payer plus `cosigners`.
    pub fn submit_with(
        &self,
        instruction: Instruction,
        cosigners: &[&dyn Signer],
    ) -> Result<Signature> {
        let label = describe(&instruction);
        let mut signers: Vec<&dyn Signer> = Vec::with_capacity(1 + cosigners.len());
        signers.push(self.payer);
        signers.extend_from_slice(cosigners);

        let signature = self.client.submit(instruction, &signers)?;
        log::info!("{label} confirmed: {signature}");
        Ok(signature)
    }

    /// Creates the ATA of `owner` for `mint` when it does not exist yet.
    /// Returns the signature of the creating transaction, if one was sent.
    pub fn ensure_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<Signature>> {
        if !self.settings.create_missing_token_accounts {
            return Ok(None);
        }
        let address = associated_token_address(owner, mint);
        if self.client.account_exists(&address)? {
            return Ok(None);
        }

        log::info!("creating token account {address} (owner {owner}, mint {mint})");
        let instruction = create_associated_token_account_idempotent(
            &self.payer_pubkey(),
            owner,
            mint,
            &spl_token::id(),
        );
        self.submit(instruction).map(Some)
    }
}
