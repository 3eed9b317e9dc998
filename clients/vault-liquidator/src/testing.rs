//! Scripted in-memory ledger for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};

use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;

use crate::error::{Result, VaultError};
use crate::instruction::{describe, opcode_of, Opcode};
use crate::ledger::Ledger;
use crate::state::{TokenAccountEntry, TokenAccountSnapshot};
use crate::submit::Submitter;

/// Each read pops the next scripted response; the last one repeats once
/// the script runs out.
#[derive(Default)]
pub struct FakeLedger {
    balances: RefCell<VecDeque<u64>>,
    last_balance: Cell<u64>,
    token_accounts: RefCell<VecDeque<Vec<TokenAccountEntry>>>,
    last_token_accounts: RefCell<Vec<TokenAccountEntry>>,
    missing_accounts: RefCell<HashSet<Pubkey>>,
    reject: Cell<Option<Opcode>>,
    failing_token_read: Cell<Option<usize>>,
    pub token_reads: Cell<usize>,
    pub submitted: RefCell<Vec<Instruction>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(self, balances: &[u64]) -> Self {
        self.balances.borrow_mut().extend(balances);
        self
    }

    pub fn with_token_accounts(self, snapshot: Vec<TokenAccountEntry>) -> Self {
        self.token_accounts.borrow_mut().push_back(snapshot);
        self
    }

    pub fn with_missing_account(self, address: Pubkey) -> Self {
        self.missing_accounts.borrow_mut().insert(address);
        self
    }

    pub fn rejecting(self, opcode: Opcode) -> Self {
        self.reject.set(Some(opcode));
        self
    }

    /// Fails the `nth` token-account read, counting from one.
    pub fn failing_token_read(self, nth: usize) -> Self {
        self.failing_token_read.set(Some(nth));
        self
    }

    pub fn submitted_opcodes(&self) -> Vec<u8> {
        self.submitted
            .borrow()
            .iter()
            .filter(|ix| ix.program_id != spl_associated_token_account::id())
            .map(|ix| ix.data[0])
            .collect()
    }
}

pub fn token_account(mint: Pubkey, amount: &str, decimals: u8) -> TokenAccountEntry {
    TokenAccountEntry::Parsed(TokenAccountSnapshot {
        address: Pubkey::new_unique(),
        mint,
        raw_amount: amount.to_string(),
        decimals,
    })
}

impl Ledger for FakeLedger {
    fn lamport_balance(&self, _address: &Pubkey) -> Result<u64> {
        if let Some(next) = self.balances.borrow_mut().pop_front() {
            self.last_balance.set(next);
        }
        Ok(self.last_balance.get())
    }

    fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenAccountEntry>> {
        self.token_reads.set(self.token_reads.get() + 1);
        if self.failing_token_read.get() == Some(self.token_reads.get()) {
            return Err(VaultError::ledger(
                format!("getTokenAccountsByOwner {owner}"),
                "connection reset by peer",
            ));
        }
        if let Some(next) = self.token_accounts.borrow_mut().pop_front() {
            *self.last_token_accounts.borrow_mut() = next;
        }
        Ok(self.last_token_accounts.borrow().clone())
    }

    fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(!self.missing_accounts.borrow().contains(address))
    }
}

impl Submitter for FakeLedger {
    fn submit(&self, instruction: Instruction, signers: &[&dyn Signer]) -> Result<Signature> {
        assert!(!signers.is_empty(), "fee payer missing");
        let label = describe(&instruction);
        let rejected = instruction.program_id != spl_associated_token_account::id()
            && opcode_of(&instruction).is_some()
            && opcode_of(&instruction) == self.reject.get();

        if instruction.program_id == spl_associated_token_account::id() {
            self.missing_accounts
                .borrow_mut()
                .remove(&instruction.accounts[1].pubkey);
        }
        let mut submitted = self.submitted.borrow_mut();
        submitted.push(instruction);

        if rejected {
            return Err(VaultError::submission(label, "transaction rejected"));
        }
        Ok(Signature::from([submitted.len() as u8; 64]))
    }
}
