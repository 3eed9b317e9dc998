//! Fuzz test for withdrawal planning
//!
//! Generates random token-account snapshots, amounts and vault balances and
//! checks the properties the liquidator relies on before it ever submits:
//! classification, the close-refusal rule, payload encoding and the SOL
//! withdrawal amount.

use solana_pubkey::Pubkey;
use vault_liquidator::classify::{classify, classify_entry, positive_balances};
use vault_liquidator::instruction::{decode, encode};
use vault_liquidator::{
    withdraw_amount, AssetClass, Opcode, PlanAction, RawAmount, TokenAccountEntry,
    TokenAccountSnapshot,
};

/// One random token account as a node might report it.
#[derive(Debug, Clone)]
pub struct EntryFuzzData {
    /// Raw amount string; sometimes not a number at all.
    pub raw_amount: String,
    pub decimals: u8,
    /// Drop the mint to produce a malformed record.
    pub malformed: bool,
}

/// Fuzz data - the inputs we're randomizing
#[derive(Debug, Clone)]
pub struct PlanFuzzData {
    pub entries: Vec<EntryFuzzData>,
    pub vault_lamports: u64,
    pub rent_exempt_minimum: u64,
    pub amount: u64,
}

impl PlanFuzzData {
    /// Generate random fuzz data
    pub fn random() -> Self {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};

        let s = RandomState::new();
        let mut h = s.build_hasher();
        h.write_u64(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64,
        );
        Self::from_seed(h.finish())
    }

    pub fn from_seed(seed: u64) -> Self {
        let mut next = seed;
        let mut rand = move || {
            next = rand_u64(next);
            next
        };

        let count = (rand() % 6) as usize;
        let entries = (0..count)
            .map(|_| {
                let raw_amount = match rand() % 7 {
                    0 => "0".to_string(),
                    1 => "1".to_string(),
                    2 => "notanumber".to_string(),
                    // Wider than u64 every so often.
                    3 => format!("{}", (rand() as u128) << (rand() % 64)),
                    4 => format!("000{}", rand() % 1000),
                    // Padded or prefixed, as a JavaScript BigInt accepts.
                    5 => format!(" 0x{:x} ", rand() % 4),
                    _ => rand().to_string(),
                };
                EntryFuzzData {
                    raw_amount,
                    decimals: (rand() % 10) as u8,
                    malformed: rand() % 8 == 0,
                }
            })
            .collect();

        Self {
            entries,
            vault_lamports: rand() >> (rand() % 64),
            rent_exempt_minimum: rand() % 2_000_000,
            amount: rand(),
        }
    }

    pub fn snapshot(&self) -> Vec<TokenAccountEntry> {
        self.entries
            .iter()
            .map(|entry| {
                if entry.malformed {
                    TokenAccountEntry::Malformed {
                        address: Pubkey::new_unique(),
                        raw_amount: Some(entry.raw_amount.clone()),
                        reason: "missing mint".to_string(),
                    }
                } else {
                    TokenAccountEntry::Parsed(TokenAccountSnapshot {
                        address: Pubkey::new_unique(),
                        mint: Pubkey::new_unique(),
                        raw_amount: entry.raw_amount.clone(),
                        decimals: entry.decimals,
                    })
                }
            })
            .collect()
    }
}

/// Simple pseudo-random number generator
fn rand_u64(seed: u64) -> u64 {
    let mut x = seed.wrapping_add(0x9E3779B97F4A7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

/// Property: every planned withdrawal is for a parsed entry with a positive
/// balance, NFTs are exactly the decimals-0 amount-1 entries, and nothing
/// with a positive balance is left out of the plan or the refusal check.
fn check_plan_property(data: &PlanFuzzData) -> bool {
    let entries = data.snapshot();
    let plan = classify(&entries);
    let positive = positive_balances(&entries);

    let expected: Vec<&TokenAccountEntry> = entries
        .iter()
        .filter(|entry| !matches!(classify_entry(entry), AssetClass::Empty))
        .collect();
    if plan.len() != expected.len() {
        return false;
    }

    for (action, entry) in plan.iter().zip(&expected) {
        let TokenAccountEntry::Parsed(snapshot) = entry else {
            return false;
        };
        if action.source() != &snapshot.address || action.mint() != &snapshot.mint {
            return false;
        }
        let is_nft = snapshot.decimals == 0
            && RawAmount::parse(&snapshot.raw_amount).is_some_and(|a| a.is_one());
        match action {
            PlanAction::WithdrawNft { .. } if !is_nft => return false,
            PlanAction::WithdrawSpl { amount, .. } if is_nft || amount.is_zero() => return false,
            _ => {}
        }
        if !positive.iter().any(|p| p.address() == &snapshot.address) {
            return false;
        }
    }

    // Non-numeric amounts never count toward refusal.
    positive.iter().all(|entry| {
        entry
            .raw_amount()
            .and_then(RawAmount::parse)
            .is_some_and(|amount| !amount.is_zero())
    })
}

/// Property: amount-carrying payloads are nine bytes and decode back to the
/// same opcode and amount.
fn check_encoding_property(data: &PlanFuzzData) -> bool {
    Opcode::ALL.iter().all(|&opcode| {
        let amount = opcode.carries_amount().then(|| RawAmount::from(data.amount));
        let Ok(bytes) = encode(opcode, amount.as_ref()) else {
            return false;
        };
        let Ok(decoded) = decode(&bytes) else {
            return false;
        };
        let expected_len = if opcode.carries_amount() { 9 } else { 1 };
        bytes.len() == expected_len
            && bytes[0] == opcode as u8
            && decoded.opcode() == opcode
            && decoded.amount() == opcode.carries_amount().then_some(data.amount)
    })
}

/// Property: the SOL withdrawal never exceeds the balance and a
/// non-closing withdrawal leaves the rent reserve in place.
fn check_withdraw_amount_property(data: &PlanFuzzData) -> bool {
    let lamports = data.vault_lamports;
    let rent = data.rent_exempt_minimum;

    let all = withdraw_amount(lamports, true, rent);
    let partial = withdraw_amount(lamports, false, rent);

    all == lamports && partial <= lamports && lamports - partial == lamports.min(rent)
}

fn check_all(data: &PlanFuzzData) -> bool {
    check_plan_property(data)
        && check_encoding_property(data)
        && check_withdraw_amount_property(data)
}


fn main() {
    const ITERATIONS: usize = 10_000;

    println!("Withdrawal Planning Fuzz Test");
    println!("=============================");

    for i in 0..ITERATIONS {
        let data = PlanFuzzData::random();
        if !check_all(&data) {
            eprintln!("Property violated at iteration {i}: {data:?}");
            std::process::exit(1);
        }
    }
    println!("All {ITERATIONS} random iterations passed!");
}
