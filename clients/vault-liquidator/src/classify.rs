//! Turns token-account snapshots into a withdrawal plan.

use solana_pubkey::Pubkey;

use crate::state::{RawAmount, TokenAccountEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetClass {
    /// `decimals == 0` and exactly one unit held.
    NonFungible,
    Fungible(RawAmount),
    /// Zero balance, unparseable amount, or malformed record.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    WithdrawSpl {
        source: Pubkey,
        mint: Pubkey,
        amount: RawAmount,
    },
    WithdrawNft {
        source: Pubkey,
        mint: Pubkey,
    },
}

impl PlanAction {
    pub fn mint(&self) -> &Pubkey {
        match self {
            Self::WithdrawSpl { mint, .. } | Self::WithdrawNft { mint, .. } => mint,
        }
    }

    pub fn source(&self) -> &Pubkey {
        match self {
            Self::WithdrawSpl { source, .. } | Self::WithdrawNft { source, .. } => source,
        }
    }
}

/// Withdrawals in snapshot order. Entries do not depend on each other.
pub type WithdrawalPlan = Vec<PlanAction>;

pub fn classify_entry(entry: &TokenAccountEntry) -> AssetClass {
    let TokenAccountEntry::Parsed(snapshot) = entry else {
        return AssetClass::Empty;
    };
    match snapshot.amount() {
        None => AssetClass::Empty,
        Some(amount) if amount.is_zero() => AssetClass::Empty,
        Some(amount) if snapshot.decimals == 0 && amount.is_one() => AssetClass::NonFungible,
        Some(amount) => AssetClass::Fungible(amount),
    }
}

pub fn classify(entries: &[TokenAccountEntry]) -> WithdrawalPlan {
    entries
        .iter()
        .filter_map(|entry| {
            let TokenAccountEntry::Parsed(snapshot) = entry else {
                return None;
            };
            match classify_entry(entry) {
                AssetClass::Empty => None,
                AssetClass::NonFungible => Some(PlanAction::WithdrawNft {
                    source: snapshot.address,
                    mint: snapshot.mint,
                }),
                AssetClass::Fungible(amount) => Some(PlanAction::WithdrawSpl {
                    source: snapshot.address,
                    mint: snapshot.mint,
                    amount,
                }),
            }
        })
        .collect()
}

/// Entries whose amount string parses to a value above zero, malformed
/// records included. A non-numeric amount never counts.
pub fn positive_balances(entries: &[TokenAccountEntry]) -> Vec<&TokenAccountEntry> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .raw_amount()
                .and_then(RawAmount::parse)
                .is_some_and(|amount| !amount.is_zero())
        })
        .collect()
}
