//! JSON-RPC backed [`Ledger`] and [`Submitter`].

use std::str::FromStr;

use solana_account_decoder_client_types::UiAccountData;
use solana_commitment_config::CommitmentConfig;
use solana_instruction::Instruction;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_rpc_client::rpc_client::RpcClient;
use solana_rpc_client_api::request::TokenAccountsFilter;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::Transaction;

use crate::error::{Result, VaultError};
use crate::instruction::describe;
use crate::ledger::{parse_token_account, Ledger};
use crate::state::TokenAccountEntry;
use crate::submit::Submitter;

/// Blocking RPC client shared by every read and submission of a run.
pub struct RpcLedger {
    client: RpcClient,
}

impl RpcLedger {
    pub fn new(url: impl ToString, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(url.to_string(), commitment),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

impl Ledger for RpcLedger {
    fn lamport_balance(&self, address: &Pubkey) -> Result<u64> {
        self.client
            .get_balance(address)
            .map_err(|e| VaultError::ledger(format!("getBalance {address}"), e))
    }

    fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenAccountEntry>> {
        let keyed = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
            .map_err(|e| VaultError::ledger(format!("getTokenAccountsByOwner {owner}"), e))?;

        keyed
            .into_iter()
            .map(|keyed| {
                let address = Pubkey::from_str(&keyed.pubkey).map_err(|e| {
                    VaultError::ledger(format!("node returned address {:?}", keyed.pubkey), e)
                })?;
                Ok(match &keyed.account.data {
                    UiAccountData::Json(parsed) => parse_token_account(address, &parsed.parsed),
                    _ => TokenAccountEntry::Malformed {
                        address,
                        raw_amount: None,
                        reason: "account data not jsonParsed".to_string(),
                    },
                })
            })
            .collect()
    }

    fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        self.client
            .get_account_with_commitment(address, self.client.commitment())
            .map(|response| response.value.is_some())
            .map_err(|e| VaultError::ledger(format!("getAccountInfo {address}"), e))
    }
}

impl Submitter for RpcLedger {
    fn submit(&self, instruction: Instruction, signers: &[&dyn Signer]) -> Result<Signature> {
        let label = describe(&instruction);

        let payer = signers
            .first()
            .map(|signer| signer.pubkey())
            .ok_or_else(|| VaultError::submission(&label, "no fee payer"))?;

        let blockhash = self
            .client
            .get_latest_blockhash()
            .map_err(|e| VaultError::submission(&label, e))?;

        let message = Message::new(&[instruction], Some(&payer));
        let mut tx = Transaction::new_unsigned(message);
        tx.try_sign(signers, blockhash)
            .map_err(|e| VaultError::submission(&label, e))?;

        self.client
            .send_and_confirm_transaction(&tx)
            .map_err(|e| VaultError::submission(&label, e))
    }
}
