//! Single-instruction transaction submission.

use solana_instruction::Instruction;
use solana_signature::Signature;
use solana_signer::Signer;

use crate::error::Result;

/// Write side of the ledger.
pub trait Submitter {
    /// Wraps `instruction` in a transaction paid by `signers[0]`, signs it
    /// with every signer and blocks until the configured commitment is
    /// reached. One attempt only.
    fn submit(&self, instruction: Instruction, signers: &[&dyn Signer]) -> Result<Signature>;
}
