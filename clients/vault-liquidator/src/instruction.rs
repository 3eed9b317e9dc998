//! Instruction encoding for the vault program.
//!
//! The opcode table below is the wire contract with the deployed program:
//! a one-byte Borsh enum discriminant, followed by a little-endian `u64`
//! for the four amount-carrying opcodes. Account order and flags come from
//! [`Opcode::accounts`]; builders and decoders never hard-code them.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;
use solana_sdk_ids::system_program;

use crate::error::{EncodingError, Result};
use crate::pda::{associated_token_address, derive_metadata_addresses};
use crate::state::{RawAmount, VaultAddresses};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Initialize = 0,
    DepositSol = 1,
    WithdrawSol = 2,
    DepositSpl = 3,
    WithdrawSpl = 4,
    DepositNft = 5,
    WithdrawNft = 6,
    Close = 7,
}

/// Position in an instruction's account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRole {
    pub name: &'static str,
    pub signer: bool,
    pub writable: bool,
}

const fn signer(name: &'static str) -> AccountRole {
    AccountRole { name, signer: true, writable: true }
}

const fn writable(name: &'static str) -> AccountRole {
    AccountRole { name, signer: false, writable: true }
}

const fn readonly(name: &'static str) -> AccountRole {
    AccountRole { name, signer: false, writable: false }
}

const INITIALIZE: &[AccountRole] = &[
    signer("payer"),
    signer("vault_state"),
    readonly("vault_authority"),
    writable("vault_balance"),
    readonly("system_program"),
];

const DEPOSIT_SOL: &[AccountRole] = &[
    signer("payer"),
    writable("vault_state"),
    readonly("vault_authority"),
    writable("vault_balance"),
    readonly("system_program"),
];

const WITHDRAW_SOL: &[AccountRole] = &[
    signer("payer"),
    readonly("vault_state"),
    readonly("vault_authority"),
    writable("vault_balance"),
    readonly("system_program"),
];

const DEPOSIT_SPL: &[AccountRole] = &[
    signer("payer"),
    writable("payer_ata"),
    writable("vault_state"),
    readonly("vault_authority"),
    writable("vault_ata"),
    readonly("mint"),
    readonly("token_program"),
    readonly("associated_token_program"),
    readonly("system_program"),
];

const WITHDRAW_SPL: &[AccountRole] = &[
    signer("payer"),
    writable("payer_ata"),
    readonly("vault_state"),
    readonly("vault_authority"),
    writable("vault_ata"),
    readonly("mint"),
    readonly("token_program"),
    readonly("associated_token_program"),
    readonly("system_program"),
];

const DEPOSIT_NFT: &[AccountRole] = &[
    signer("payer"),
    writable("payer_ata"),
    writable("vault_state"),
    readonly("vault_authority"),
    writable("vault_ata"),
    readonly("mint"),
    readonly("metadata_account"),
    readonly("master_edition"),
    readonly("metadata_program"),
    readonly("token_program"),
    readonly("associated_token_program"),
    readonly("system_program"),
];

const WITHDRAW_NFT: &[AccountRole] = &[
    signer("payer"),
    writable("payer_ata"),
    readonly("vault_state"),
    readonly("vault_authority"),
    writable("vault_ata"),
    readonly("mint"),
    readonly("metadata_account"),
    readonly("master_edition"),
    readonly("metadata_program"),
    readonly("token_program"),
    readonly("associated_token_program"),
    readonly("system_program"),
];

const CLOSE: &[AccountRole] = &[
    signer("payer"),
    writable("close_destination"),
    writable("vault_state"),
    readonly("system_program"),
];

impl Opcode {
    pub const ALL: [Opcode; 8] = [
        Self::Initialize,
        Self::DepositSol,
        Self::WithdrawSol,
        Self::DepositSpl,
        Self::WithdrawSpl,
        Self::DepositNft,
        Self::WithdrawNft,
        Self::Close,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "Initialize",
            Self::DepositSol => "DepositSol",
            Self::WithdrawSol => "WithdrawSol",
            Self::DepositSpl => "DepositSpl",
            Self::WithdrawSpl => "WithdrawSpl",
            Self::DepositNft => "DepositNft",
            Self::WithdrawNft => "WithdrawNft",
            Self::Close => "Close",
        }
    }

    pub fn carries_amount(self) -> bool {
        matches!(
            self,
            Self::DepositSol | Self::WithdrawSol | Self::DepositSpl | Self::WithdrawSpl
        )
    }

    pub fn accounts(self) -> &'static [AccountRole] {
        match self {
            Self::Initialize => INITIALIZE,
            Self::DepositSol => DEPOSIT_SOL,
            Self::WithdrawSol => WITHDRAW_SOL,
            Self::DepositSpl => DEPOSIT_SPL,
            Self::WithdrawSpl => WITHDRAW_SPL,
            Self::DepositNft => DEPOSIT_NFT,
            Self::WithdrawNft => WITHDRAW_NFT,
            Self::Close => CLOSE,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = EncodingError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(byte as usize)
            .copied()
            .ok_or(EncodingError::UnknownOpcode(byte))
    }
}

/// Instruction enum as the program deserializes it.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultInstruction {
    Initialize,
    DepositSol { amount: u64 },
    WithdrawSol { amount: u64 },
    DepositSpl { amount: u64 },
    WithdrawSpl { amount: u64 },
    DepositNft,
    WithdrawNft,
    Close,
}

impl VaultInstruction {
    fn new(opcode: Opcode, amount: Option<u64>) -> Self {
        let amount = amount.unwrap_or_default();
        match opcode {
            Opcode::Initialize => Self::Initialize,
            Opcode::DepositSol => Self::DepositSol { amount },
            Opcode::WithdrawSol => Self::WithdrawSol { amount },
            Opcode::DepositSpl => Self::DepositSpl { amount },
            Opcode::WithdrawSpl => Self::WithdrawSpl { amount },
            Opcode::DepositNft => Self::DepositNft,
            Opcode::WithdrawNft => Self::WithdrawNft,
            Opcode::Close => Self::Close,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Initialize => Opcode::Initialize,
            Self::DepositSol { .. } => Opcode::DepositSol,
            Self::WithdrawSol { .. } => Opcode::WithdrawSol,
            Self::DepositSpl { .. } => Opcode::DepositSpl,
            Self::WithdrawSpl { .. } => Opcode::WithdrawSpl,
            Self::DepositNft => Opcode::DepositNft,
            Self::WithdrawNft => Opcode::WithdrawNft,
            Self::Close => Opcode::Close,
        }
    }

    pub fn amount(&self) -> Option<u64> {
        match *self {
            Self::DepositSol { amount }
            | Self::WithdrawSol { amount }
            | Self::DepositSpl { amount }
            | Self::WithdrawSpl { amount } => Some(amount),
            _ => None,
        }
    }
}

pub fn encode(opcode: Opcode, amount: Option<&RawAmount>) -> Result<Vec<u8>, EncodingError> {
    let amount = match (opcode.carries_amount(), amount) {
        (true, Some(raw)) => Some(
            raw.to_u64()
                .ok_or_else(|| EncodingError::AmountOutOfRange(raw.to_string()))?,
        ),
        (true, None) => return Err(EncodingError::MissingAmount(opcode.name())),
        (false, Some(_)) => return Err(EncodingError::UnexpectedAmount(opcode.name())),
        (false, None) => None,
    };
    borsh::to_vec(&VaultInstruction::new(opcode, amount))
        .map_err(|_| EncodingError::MalformedPayload)
}

pub fn decode(data: &[u8]) -> Result<VaultInstruction, EncodingError> {
    let first = *data.first().ok_or(EncodingError::MalformedPayload)?;
    Opcode::try_from(first)?;
    VaultInstruction::try_from_slice(data).map_err(|_| EncodingError::MalformedPayload)
}

/// Builds an instruction from keys listed in table order for `opcode`.
pub fn build_instruction(
    program_id: &Pubkey,
    opcode: Opcode,
    keys: &[Pubkey],
    amount: Option<&RawAmount>,
) -> Result<Instruction> {
    let roles = opcode.accounts();
    if keys.len() != roles.len() {
        return Err(EncodingError::AccountCount {
            opcode: opcode.name(),
            expected: roles.len(),
            actual: keys.len(),
        }
        .into());
    }

    let data = encode(opcode, amount)?;
    let accounts = keys
        .iter()
        .zip(roles)
        .map(|(pubkey, role)| AccountMeta {
            pubkey: *pubkey,
            is_signer: role.signer,
            is_writable: role.writable,
        })
        .collect();

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

// ---------------------------------------------------------------------------
// Per-opcode builders
// ---------------------------------------------------------------------------

fn sol_keys(payer: &Pubkey, vault: &VaultAddresses) -> [Pubkey; 5] {
    [
        *payer,
        vault.state,
        vault.authority,
        vault.balance,
        system_program::ID,
    ]
}

fn token_keys(payer: &Pubkey, vault: &VaultAddresses, mint: &Pubkey) -> [Pubkey; 6] {
    [
        *payer,
        associated_token_address(payer, mint),
        vault.state,
        vault.authority,
        associated_token_address(&vault.authority, mint),
        *mint,
    ]
}

fn spl_keys(payer: &Pubkey, vault: &VaultAddresses, mint: &Pubkey) -> Vec<Pubkey> {
    let mut keys = token_keys(payer, vault, mint).to_vec();
    keys.extend([
        spl_token::id(),
        spl_associated_token_account::id(),
        system_program::ID,
    ]);
    keys
}

fn nft_keys(payer: &Pubkey, vault: &VaultAddresses, mint: &Pubkey) -> Result<Vec<Pubkey>> {
    let metadata = derive_metadata_addresses(mint)?;
    let mut keys = token_keys(payer, vault, mint).to_vec();
    keys.extend([
        metadata.metadata_account,
        metadata.master_edition,
        metadata.metadata_program,
        spl_token::id(),
        spl_associated_token_account::id(),
        system_program::ID,
    ]);
    Ok(keys)
}

/// `vault.state` must co-sign.
pub fn initialize(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
) -> Result<Instruction> {
    build_instruction(program_id, Opcode::Initialize, &sol_keys(payer, vault), None)
}

pub fn deposit_sol(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
    lamports: u64,
) -> Result<Instruction> {
    build_instruction(
        program_id,
        Opcode::DepositSol,
        &sol_keys(payer, vault),
        Some(&RawAmount::from(lamports)),
    )
}

pub fn withdraw_sol(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
    lamports: u64,
) -> Result<Instruction> {
    build_instruction(
        program_id,
        Opcode::WithdrawSol,
        &sol_keys(payer, vault),
        Some(&RawAmount::from(lamports)),
    )
}

pub fn deposit_spl(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
    mint: &Pubkey,
    amount: &RawAmount,
) -> Result<Instruction> {
    build_instruction(
        program_id,
        Opcode::DepositSpl,
        &spl_keys(payer, vault, mint),
        Some(amount),
    )
}

pub fn withdraw_spl(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
    mint: &Pubkey,
    amount: &RawAmount,
) -> Result<Instruction> {
    build_instruction(
        program_id,
        Opcode::WithdrawSpl,
        &spl_keys(payer, vault, mint),
        Some(amount),
    )
}

pub fn deposit_nft(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
    mint: &Pubkey,
) -> Result<Instruction> {
    build_instruction(program_id, Opcode::DepositNft, &nft_keys(payer, vault, mint)?, None)
}

pub fn withdraw_nft(
    program_id: &Pubkey,
    payer: &Pubkey,
    vault: &VaultAddresses,
    mint: &Pubkey,
) -> Result<Instruction> {
    build_instruction(program_id, Opcode::WithdrawNft, &nft_keys(payer, vault, mint)?, None)
}

/// Moves every lamport held by `vault_state` to `close_destination`.
pub fn close(
    program_id: &Pubkey,
    payer: &Pubkey,
    close_destination: &Pubkey,
    vault_state: &Pubkey,
) -> Result<Instruction> {
    build_instruction(
        program_id,
        Opcode::Close,
        &[*payer, *close_destination, *vault_state, system_program::ID],
        None,
    )
}

/// Opcode of an instruction built by this module.
pub fn opcode_of(instruction: &Instruction) -> Option<Opcode> {
    instruction
        .data
        .first()
        .and_then(|byte| Opcode::try_from(*byte).ok())
}

/// Name used in logs and submission errors.
pub fn describe(instruction: &Instruction) -> String {
    if instruction.program_id == spl_associated_token_account::id() {
        return "CreateAssociatedTokenAccount".to_string();
    }
    match opcode_of(instruction) {
        Some(opcode) => opcode.name().to_string(),
        None => format!("instruction for {}", instruction.program_id),
    }
}
