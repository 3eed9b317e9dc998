//! Vault liquidation: inspect, withdraw every asset, verify, close.
//!
//! A run walks `Inspecting → Planning → Withdrawing → Verifying → Closing`
//! and ends in `Done`, or in `Refused` when the vault still holds a token
//! balance after the withdrawals. Close is never sent in that case.
//!
//! Every read and submission completes before the next starts. A failed
//! submission aborts the run; transactions confirmed before it stay final,
//! and a later close run refuses until the vault is actually empty.

use std::fmt;
use std::str::FromStr;

use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use solana_signature::Signature;

use crate::classify::{classify, positive_balances, PlanAction};
use crate::context::VaultContext;
use crate::error::Result;
use crate::instruction::{self, describe};
use crate::ledger::Ledger;
use crate::pda::associated_token_address;
use crate::state::{TokenAccountEntry, VaultSnapshot};
use crate::submit::Submitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Read and report only.
    Inspect,
    /// Withdraw everything except the balance account's rent reserve.
    Withdraw,
    /// Withdraw everything, then close the vault state.
    #[default]
    Close,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "inspect" => Ok(Self::Inspect),
            "withdraw" => Ok(Self::Withdraw),
            "close" => Ok(Self::Close),
            other => Err(format!("unknown mode {other:?} (expected inspect, withdraw or close)")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inspect => "inspect",
            Self::Withdraw => "withdraw",
            Self::Close => "close",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Inspected,
    Withdrawn,
    Closed(Signature),
    /// Entries that still hold a positive balance after withdrawing.
    Refused(Vec<TokenAccountEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub label: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationReport {
    pub mode: Mode,
    pub before: VaultSnapshot,
    /// Last inspection after withdrawing; `None` in inspect mode.
    pub after: Option<VaultSnapshot>,
    pub submissions: Vec<Submission>,
    pub outcome: Outcome,
}

/// Lamports to pull out of the balance account. A non-closing withdrawal
/// leaves the rent reserve behind and never goes below zero.
pub fn withdraw_amount(vault_lamports: u64, clean_all: bool, rent_exempt_minimum: u64) -> u64 {
    if clean_all {
        vault_lamports
    } else {
        vault_lamports.saturating_sub(rent_exempt_minimum)
    }
}

enum Task {
    EnsureTokenAccount { owner: Pubkey, mint: Pubkey },
    Submit(Instruction),
}

enum Phase {
    Planning,
    Withdrawing(Vec<Task>),
    Verifying,
    Closing,
    Done(Outcome),
    Refused(Vec<TokenAccountEntry>),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Withdrawing(_) => "withdrawing",
            Self::Verifying => "verifying",
            Self::Closing => "closing",
            Self::Done(_) => "done",
            Self::Refused(_) => "refused",
        }
    }
}

pub fn liquidate<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    vault_state: &Pubkey,
    mode: Mode,
) -> Result<LiquidationReport> {
    log::debug!("{mode} {vault_state}: inspecting");
    let before = ctx.inspect(vault_state)?;
    let mut after = None;
    let mut submissions = Vec::new();

    let mut phase = match mode {
        Mode::Inspect => Phase::Done(Outcome::Inspected),
        Mode::Withdraw | Mode::Close => Phase::Planning,
    };

    let outcome = loop {
        log::debug!("{mode} {vault_state}: {}", phase.name());
        phase = match phase {
            Phase::Planning => Phase::Withdrawing(plan(ctx, &before, mode == Mode::Close)?),
            Phase::Withdrawing(tasks) => {
                for task in tasks {
                    execute(ctx, task, &mut submissions)?;
                }
                if mode == Mode::Withdraw {
                    after = Some(ctx.inspect(vault_state)?);
                    Phase::Done(Outcome::Withdrawn)
                } else {
                    Phase::Verifying
                }
            }
            Phase::Verifying => {
                let snapshot = ctx.inspect(vault_state)?;
                let remaining: Vec<TokenAccountEntry> = positive_balances(&snapshot.token_accounts)
                    .into_iter()
                    .cloned()
                    .collect();
                after = Some(snapshot);
                if remaining.is_empty() {
                    Phase::Closing
                } else {
                    Phase::Refused(remaining)
                }
            }
            Phase::Closing => {
                let payer = ctx.payer_pubkey();
                let ix = instruction::close(&ctx.program_id, &payer, &payer, vault_state)?;
                let signature = ctx.submit(ix)?;
                submissions.push(Submission {
                    label: "Close".to_string(),
                    signature,
                });
                Phase::Done(Outcome::Closed(signature))
            }
            Phase::Done(outcome) => break outcome,
            Phase::Refused(remaining) => {
                log::warn!(
                    "vault {vault_state} still holds {} non-zero token account(s); refusing to close",
                    remaining.len()
                );
                break Outcome::Refused(remaining);
            }
        };
    };

    Ok(LiquidationReport {
        mode,
        before,
        after,
        submissions,
        outcome,
    })
}

/// Builds every withdrawal up front so an encoding error aborts the run
/// before anything is submitted.
fn plan<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    snapshot: &VaultSnapshot,
    clean_all: bool,
) -> Result<Vec<Task>> {
    let vault = &snapshot.addresses;
    let payer = ctx.payer_pubkey();
    let actions = classify(&snapshot.token_accounts);
    let mut tasks = Vec::with_capacity(actions.len() * 3 + 1);

    for action in &actions {
        let mint = *action.mint();
        let vault_ata = associated_token_address(&vault.authority, &mint);
        if action.source() != &vault_ata {
            log::warn!(
                "token account {} is not the vault's associated account {vault_ata}; withdrawing from the latter",
                action.source()
            );
        }

        let ix = match action {
            PlanAction::WithdrawSpl { amount, .. } => {
                instruction::withdraw_spl(&ctx.program_id, &payer, vault, &mint, amount)?
            }
            PlanAction::WithdrawNft { .. } => {
                instruction::withdraw_nft(&ctx.program_id, &payer, vault, &mint)?
            }
        };
        tasks.push(Task::EnsureTokenAccount { owner: payer, mint });
        tasks.push(Task::EnsureTokenAccount {
            owner: vault.authority,
            mint,
        });
        tasks.push(Task::Submit(ix));
    }

    let lamports = withdraw_amount(
        snapshot.lamports,
        clean_all,
        ctx.settings.rent_exempt_minimum,
    );
    if lamports > 0 {
        tasks.push(Task::Submit(instruction::withdraw_sol(
            &ctx.program_id,
            &payer,
            vault,
            lamports,
        )?));
    }

    log::debug!(
        "planned {} token withdrawal(s), {lamports} lamports",
        actions.len()
    );
    Ok(tasks)
}

fn execute<C: Ledger + Submitter>(
    ctx: &VaultContext<'_, C>,
    task: Task,
    submissions: &mut Vec<Submission>,
) -> Result<()> {
    match task {
        Task::EnsureTokenAccount { owner, mint } => {
            if let Some(signature) = ctx.ensure_token_account(&owner, &mint)? {
                submissions.push(Submission {
                    label: "CreateAssociatedTokenAccount".to_string(),
                    signature,
                });
            }
        }
        Task::Submit(ix) => {
            let label = describe(&ix);
            let signature = ctx.submit(ix)?;
            submissions.push(Submission { label, signature });
        }
    }
    Ok(())
}
