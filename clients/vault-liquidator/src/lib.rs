//! Client driver for the PDA vault program.
//!
//! Derives the vault's program addresses, reads its SOL and token holdings,
//! encodes the program's eight instructions and drives a liquidation that
//! withdraws every asset before closing. Close is refused while any token
//! account owned by the vault authority still reports a positive balance.

pub mod actions;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod liquidate;
pub mod pda;
pub mod rpc;
pub mod state;
pub mod submit;

#[cfg(test)]
mod testing;

pub use classify::{classify, AssetClass, PlanAction, WithdrawalPlan};
pub use context::{Settings, VaultContext};
pub use error::{EncodingError, Result, VaultError};
pub use instruction::{Opcode, VaultInstruction};
pub use ledger::Ledger;
pub use liquidate::{liquidate, withdraw_amount, LiquidationReport, Mode, Outcome};
pub use rpc::RpcLedger;
pub use state::{RawAmount, TokenAccountEntry, TokenAccountSnapshot, VaultAddresses, VaultSnapshot};
pub use submit::Submitter;
