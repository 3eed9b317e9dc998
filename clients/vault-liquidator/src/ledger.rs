//! Read-only ledger queries and the strict parse of token-account records.

use std::str::FromStr;

use serde_json::Value;
use solana_pubkey::Pubkey;

use crate::error::Result;
use crate::state::{TokenAccountEntry, TokenAccountSnapshot};

/// Read side of the ledger. Calls are idempotent and never retried here.
pub trait Ledger {
    /// Zero for an account that does not exist.
    fn lamport_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Every SPL Token account whose owner field is `owner`, in node order.
    fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenAccountEntry>>;

    fn account_exists(&self, address: &Pubkey) -> Result<bool>;
}

/// Parses the `jsonParsed` payload of a token account:
///
/// ```json
/// { "info": { "mint": "...", "tokenAmount": { "amount": "30000", "decimals": 6 } } }
/// ```
pub fn parse_token_account(address: Pubkey, parsed: &Value) -> TokenAccountEntry {
    let info = &parsed["info"];
    let token_amount = &info["tokenAmount"];
    let raw_amount = token_amount["amount"].as_str().map(str::to_string);

    let malformed = |reason: &str| TokenAccountEntry::Malformed {
        address,
        raw_amount: raw_amount.clone(),
        reason: reason.to_string(),
    };

    let Some(mint) = info["mint"].as_str() else {
        return malformed("missing mint");
    };
    let Ok(mint) = Pubkey::from_str(mint) else {
        return malformed("invalid mint address");
    };
    let Some(amount) = raw_amount.clone() else {
        return malformed("missing token amount");
    };
    let Some(decimals) = token_amount["decimals"]
        .as_u64()
        .and_then(|d| u8::try_from(d).ok())
    else {
        return malformed("missing or invalid decimals");
    };

    TokenAccountEntry::Parsed(TokenAccountSnapshot {
        address,
        mint,
        raw_amount: amount,
        decimals,
    })
}
