//! Error definitions

use std::path::PathBuf;

use thiserror::Error;

/// Boxed underlying cause attached to ledger and submission failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = VaultError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no valid program address for seed \"{seed}\"")]
    AddressDerivation { seed: &'static str },

    #[error("ledger query failed: {context}")]
    LedgerQuery {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("instruction encoding failed")]
    Encoding(#[from] EncodingError),

    #[error("transaction submission failed: {label}")]
    Submission {
        label: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read keypair {}", path.display())]
    Keypair {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl VaultError {
    pub fn ledger(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::LedgerQuery {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn submission(label: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Submission {
            label: label.into(),
            source: source.into(),
        }
    }
}

/// Caller bugs detected while building an instruction payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("amount {0} exceeds the u64 range")]
    AmountOutOfRange(String),
    #[error("{0} requires an amount")]
    MissingAmount(&'static str),
    #[error("{0} does not take an amount")]
    UnexpectedAmount(&'static str),
    #[error("{opcode} expects {expected} accounts, got {actual}")]
    AccountCount {
        opcode: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("malformed instruction payload")]
    MalformedPayload,
}
