use std::cell::RefCell;

use litesvm::LiteSVM;
use serde_json::json;
use solana_account::Account;
use solana_instruction::Instruction;
use solana_keypair::Keypair;
use solana_message::Message;
use solana_native_token::LAMPORTS_PER_SOL;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::Transaction;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, AccountState, Mint};

use vault_liquidator::error::{Result, VaultError};
use vault_liquidator::instruction::describe;
use vault_liquidator::ledger::parse_token_account;
use vault_liquidator::pda::associated_token_address;
use vault_liquidator::{Ledger, Submitter, TokenAccountEntry};

/// In-process ledger backed by LiteSVM.
///
/// LiteSVM has no owner index, so token accounts are tracked as they are
/// seeded or created through the associated token program.
pub struct SvmLedger {
    svm: RefCell<LiteSVM>,
    token_accounts: RefCell<Vec<Pubkey>>,
}

impl Default for SvmLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SvmLedger {
    pub fn new() -> Self {
        Self {
            svm: RefCell::new(LiteSVM::new()),
            token_accounts: RefCell::new(Vec::new()),
        }
    }

    pub fn funded_payer(&self) -> Keypair {
        let payer = Keypair::new();
        self.airdrop(&payer.pubkey(), 10 * LAMPORTS_PER_SOL);
        payer
    }

    pub fn airdrop(&self, pubkey: &Pubkey, lamports: u64) {
        self.svm
            .borrow_mut()
            .airdrop(pubkey, lamports)
            .expect("Airdrop failed");
    }

    fn set_packed<T: Pack>(&self, address: Pubkey, state: T) {
        let mut data = vec![0; T::LEN];
        T::pack(state, &mut data).expect("Failed to pack account");
        let lamports = self.svm.borrow().minimum_balance_for_rent_exemption(T::LEN);
        self.svm
            .borrow_mut()
            .set_account(
                address,
                Account {
                    lamports,
                    data,
                    owner: spl_token::id(),
                    executable: false,
                    rent_epoch: 0,
                },
            )
            .expect("Failed to set account");
    }

    pub fn create_mint(&self, decimals: u8) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.set_packed(
            mint,
            Mint {
                mint_authority: COption::Some(Pubkey::new_unique()),
                supply: u64::MAX,
                decimals,
                is_initialized: true,
                freeze_authority: COption::None,
            },
        );
        mint
    }

    /// Writes an initialized associated token account holding `amount`.
    pub fn seed_token_account(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let address = associated_token_address(owner, mint);
        self.set_packed(
            address,
            TokenAccount {
                mint: *mint,
                owner: *owner,
                amount,
                delegate: COption::None,
                state: AccountState::Initialized,
                is_native: COption::None,
                delegated_amount: 0,
                close_authority: COption::None,
            },
        );
        self.track(address);
        address
    }

    pub fn token_balance(&self, address: &Pubkey) -> Option<u64> {
        let account = self.svm.borrow().get_account(address)?;
        TokenAccount::unpack(&account.data).ok().map(|a| a.amount)
    }

    fn track(&self, address: Pubkey) {
        let mut tracked = self.token_accounts.borrow_mut();
        if !tracked.contains(&address) {
            tracked.push(address);
        }
    }

    /// Renders a token account the way the RPC `jsonParsed` encoding does.
    fn json_parsed(&self, token: &TokenAccount) -> serde_json::Value {
        let decimals = self
            .svm
            .borrow()
            .get_account(&token.mint)
            .and_then(|mint| Mint::unpack(&mint.data).ok())
            .map(|mint| mint.decimals);
        json!({
            "info": {
                "mint": token.mint.to_string(),
                "owner": token.owner.to_string(),
                "tokenAmount": { "amount": token.amount.to_string(), "decimals": decimals }
            },
            "type": "account"
        })
    }
}

impl Ledger for SvmLedger {
    fn lamport_balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.svm.borrow().get_balance(address).unwrap_or(0))
    }

    fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenAccountEntry>> {
        let svm = self.svm.borrow();
        let mut entries = Vec::new();
        for address in self.token_accounts.borrow().iter() {
            let Some(account) = svm.get_account(address) else {
                continue;
            };
            if account.owner != spl_token::id() {
                continue;
            }
            let token = TokenAccount::unpack(&account.data)
                .map_err(|e| VaultError::ledger(format!("unpack {address}"), e.to_string()))?;
            if &token.owner == owner {
                entries.push((*address, token));
            }
        }
        drop(svm);

        Ok(entries
            .iter()
            .map(|(address, token)| parse_token_account(*address, &self.json_parsed(token)))
            .collect())
    }

    fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.svm.borrow().get_account(address).is_some())
    }
}

impl Submitter for SvmLedger {
    fn submit(&self, instruction: Instruction, signers: &[&dyn Signer]) -> Result<Signature> {
        let label = describe(&instruction);
        let payer = signers
            .first()
            .map(|signer| signer.pubkey())
            .ok_or_else(|| VaultError::submission(&label, "no fee payer"))?;
        let created = (instruction.program_id == spl_associated_token_account::id())
            .then(|| instruction.accounts[1].pubkey);

        let mut svm = self.svm.borrow_mut();
        let mut tx = Transaction::new_unsigned(Message::new(&[instruction], Some(&payer)));
        tx.try_sign(signers, svm.latest_blockhash())
            .map_err(|e| VaultError::submission(&label, e))?;
        let signature = tx.signatures[0];

        let result = svm.send_transaction(tx);
        svm.expire_blockhash();
        result.map_err(|failed| VaultError::submission(&label, failed.err))?;
        drop(svm);

        if let Some(address) = created {
            self.track(address);
        }
        Ok(signature)
    }
}
