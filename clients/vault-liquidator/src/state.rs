//! Vault data model: addresses, ledger snapshots and raw token amounts.

use std::fmt;
use std::str::FromStr;

use solana_native_token::LAMPORTS_PER_SOL;
use solana_pubkey::{pubkey, Pubkey};

/// Deployed vault program.
pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("26fuYGrUBSa5wjzeUNu42MaQQzraX4kfchtTM9NTUKbM");

/// Vault state used when none is given on the command line.
pub const DEFAULT_VAULT_STATE: Pubkey = pubkey!("9HwjRzkGd5VuxtCtRcyVt4NJiVkqBVkS5tZMTkBuB4zK");

/// Token metadata program that owns NFT metadata and master editions.
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Rent-exempt minimum for the zero-data vault balance account.
pub const DEFAULT_RENT_EXEMPT_MINIMUM: u64 = 890_880;

// ---------------------------------------------------------------------------
// Vault Addresses
// ---------------------------------------------------------------------------
// The vault state is chosen at initialization. Authority and balance
// account are PDAs recomputed from it on every run.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultAddresses {
    pub state: Pubkey,
    /// PDA `["auth", state]`; owns the vault's token accounts.
    pub authority: Pubkey,
    /// PDA `["vault", authority]`; holds the vault's lamports.
    pub balance: Pubkey,
}

/// Unsigned amount of arbitrary precision, as reported by the node.
///
/// Accepts what a JavaScript `BigInt` accepts for a non-negative value:
/// surrounding whitespace, an optional `+` on decimal input, and `0x`, `0o`
/// or `0b` prefixes. A blank string is zero. Values are kept as normalized
/// decimal digits, so `"007"`, `" +7 "` and `"0x7"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawAmount(String);

/// JavaScript `StrWhiteSpaceChar`: Unicode `White_Space` minus U+0085, plus
/// the byte-order mark.
fn is_js_whitespace(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{85}')
}

impl RawAmount {
    /// `None` for anything `BigInt` rejects and for negative values.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim_matches(is_js_whitespace);
        if s.is_empty() {
            return Some(Self("0".to_string()));
        }

        let (radix, digits, negative) = match s.get(..2) {
            Some("0x" | "0X") => (16, &s[2..], false),
            Some("0o" | "0O") => (8, &s[2..], false),
            Some("0b" | "0B") => (2, &s[2..], false),
            _ => match s.as_bytes()[0] {
                b'+' => (10, &s[1..], false),
                b'-' => (10, &s[1..], true),
                _ => (10, s, false),
            },
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }

        let amount = Self(to_decimal(digits, radix));
        if negative && !amount.is_zero() {
            return None;
        }
        Some(amount)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    pub fn is_one(&self) -> bool {
        self.0 == "1"
    }

    /// `None` when the amount does not fit in a `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Converts validated `radix` digits to decimal without leading zeros.
fn to_decimal(digits: &str, radix: u32) -> String {
    if radix == 10 {
        let trimmed = digits.trim_start_matches('0');
        let normalized = if trimmed.is_empty() { "0" } else { trimmed };
        return normalized.to_string();
    }

    // Little-endian base-10 limbs.
    let mut decimal: Vec<u32> = vec![0];
    for d in digits.chars().filter_map(|c| c.to_digit(radix)) {
        let mut carry = d;
        for limb in decimal.iter_mut() {
            let v = *limb * radix + carry;
            *limb = v % 10;
            carry = v / 10;
        }
        while carry > 0 {
            decimal.push(carry % 10);
            carry /= 10;
        }
    }
    while decimal.len() > 1 && decimal.last() == Some(&0) {
        decimal.pop();
    }
    decimal
        .iter()
        .rev()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect()
}

impl From<u64> for RawAmount {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for RawAmount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not an unsigned integer: {s:?}"))
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One token account as returned by the node, after strict parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountSnapshot {
    pub address: Pubkey,
    pub mint: Pubkey,
    /// Decimal string exactly as reported; may fail to parse.
    pub raw_amount: String,
    pub decimals: u8,
}

impl TokenAccountSnapshot {
    pub fn amount(&self) -> Option<RawAmount> {
        RawAmount::parse(&self.raw_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAccountEntry {
    Parsed(TokenAccountSnapshot),
    /// Record missing its mint, amount or decimals. The amount string is
    /// kept when present so the close check can still see it.
    Malformed {
        address: Pubkey,
        raw_amount: Option<String>,
        reason: String,
    },
}

impl TokenAccountEntry {
    pub fn address(&self) -> &Pubkey {
        match self {
            Self::Parsed(snapshot) => &snapshot.address,
            Self::Malformed { address, .. } => address,
        }
    }

    pub fn raw_amount(&self) -> Option<&str> {
        match self {
            Self::Parsed(snapshot) => Some(&snapshot.raw_amount),
            Self::Malformed { raw_amount, .. } => raw_amount.as_deref(),
        }
    }
}

/// A single inspection of the vault: SOL held by the balance PDA plus every
/// token account owned by the authority, in node order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub addresses: VaultAddresses,
    pub lamports: u64,
    pub token_accounts: Vec<TokenAccountEntry>,
}

impl fmt::Display for VaultSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vaultState: {}", self.addresses.state)?;
        writeln!(f, "vaultAuth: {}", self.addresses.authority)?;
        writeln!(f, "vaultPda: {}", self.addresses.balance)?;
        writeln!(
            f,
            "vault SOL: {}",
            self.lamports as f64 / LAMPORTS_PER_SOL as f64
        )?;
        writeln!(f)?;
        writeln!(f, "Token accounts owned by vaultAuth:")?;
        if self.token_accounts.is_empty() {
            return writeln!(f, "(none)");
        }
        for entry in &self.token_accounts {
            writeln!(f, "---")?;
            writeln!(f, "tokenAccount: {}", entry.address())?;
            match entry {
                TokenAccountEntry::Parsed(snapshot) => {
                    writeln!(f, "mint: {}", snapshot.mint)?;
                    writeln!(
                        f,
                        "amount: {} decimals: {}",
                        snapshot.raw_amount, snapshot.decimals
                    )?;
                }
                TokenAccountEntry::Malformed {
                    raw_amount, reason, ..
                } => {
                    writeln!(f, "malformed: {reason}")?;
                    if let Some(raw) = raw_amount {
                        writeln!(f, "amount: {raw}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
