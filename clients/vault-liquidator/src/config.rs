//! File/flag configuration and keypair loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;

use crate::context::Settings;
use crate::error::{Result, VaultError};
use crate::state::{DEFAULT_PROGRAM_ID, DEFAULT_VAULT_STATE};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_KEYPAIR_PATH: &str = "~/.config/solana/id.json";

/// Unvalidated configuration. Every field is optional; missing ones fall
/// back to the devnet defaults in [`Config::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub rpc_url: Option<String>,
    pub commitment: Option<String>,
    pub program_id: Option<String>,
    pub vault_state: Option<String>,
    pub keypair_path: Option<PathBuf>,
    pub rent_exempt_minimum: Option<u64>,
    pub create_missing_token_accounts: Option<bool>,
}

/// Validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
    pub vault_state: Pubkey,
    pub keypair_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| VaultError::Config(format!("{}: {e}", path.display())))
    }

    /// Fields set in `overrides` win over `self`.
    pub fn merge(self, overrides: Config) -> Self {
        Self {
            rpc_url: overrides.rpc_url.or(self.rpc_url),
            commitment: overrides.commitment.or(self.commitment),
            program_id: overrides.program_id.or(self.program_id),
            vault_state: overrides.vault_state.or(self.vault_state),
            keypair_path: overrides.keypair_path.or(self.keypair_path),
            rent_exempt_minimum: overrides.rent_exempt_minimum.or(self.rent_exempt_minimum),
            create_missing_token_accounts: overrides
                .create_missing_token_accounts
                .or(self.create_missing_token_accounts),
        }
    }

    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let commitment = match &self.commitment {
            Some(level) => CommitmentConfig::from_str(level)
                .map_err(|_| VaultError::Config(format!("unknown commitment {level:?}")))?,
            None => CommitmentConfig::confirmed(),
        };
        let defaults = Settings::default();

        Ok(ResolvedConfig {
            rpc_url: self
                .rpc_url
                .clone()
                .unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            commitment,
            program_id: parse_pubkey("program_id", self.program_id.as_deref())?
                .unwrap_or(DEFAULT_PROGRAM_ID),
            vault_state: parse_pubkey("vault_state", self.vault_state.as_deref())?
                .unwrap_or(DEFAULT_VAULT_STATE),
            keypair_path: expand_home(
                self.keypair_path
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_KEYPAIR_PATH)),
            ),
            settings: Settings {
                rent_exempt_minimum: self
                    .rent_exempt_minimum
                    .unwrap_or(defaults.rent_exempt_minimum),
                create_missing_token_accounts: self
                    .create_missing_token_accounts
                    .unwrap_or(defaults.create_missing_token_accounts),
            },
        })
    }
}

fn parse_pubkey(field: &str, value: Option<&str>) -> Result<Option<Pubkey>> {
    value
        .map(|s| {
            Pubkey::from_str(s)
                .map_err(|e| VaultError::Config(format!("{field}: {s:?} is not an address ({e})")))
        })
        .transpose()
}

/// Replaces a leading `~` with `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Reads a keypair in the Solana CLI format: a JSON array of 64 bytes.
pub fn read_keypair(path: &Path) -> Result<Keypair> {
    let keypair_error = |source: crate::error::BoxError| VaultError::Keypair {
        path: path.to_path_buf(),
        source,
    };
    let raw = fs::read_to_string(path).map_err(|e| keypair_error(e.into()))?;
    let bytes: Vec<u8> = serde_json::from_str(&raw).map_err(|e| keypair_error(e.into()))?;
    Keypair::from_bytes(&bytes).map_err(|e| keypair_error(e.to_string().into()))
}

#[cfg(test)]
mod tests {
    use solana_signer::Signer;

    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vault-liquidator-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn empty_config_resolves_to_devnet_defaults() {
        let resolved = Config::default().resolve().unwrap();

        assert_eq!(resolved.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(resolved.commitment, CommitmentConfig::confirmed());
        assert_eq!(resolved.program_id, DEFAULT_PROGRAM_ID);
        assert_eq!(resolved.vault_state, DEFAULT_VAULT_STATE);
        assert_eq!(resolved.settings, Settings::default());
        assert!(resolved.keypair_path.ends_with(".config/solana/id.json"));
    }

    #[test]
    fn overrides_win_over_file() {
        let path = temp_file(
            "config.json",
            r#"{ "rpc_url": "http://file:8899", "commitment": "finalized", "rent_exempt_minimum": 1000 }"#,
        );
        let file = Config::load(&path).unwrap();
        let overrides = Config {
            rpc_url: Some("http://flag:8899".to_string()),
            ..Config::default()
        };

        let resolved = file.merge(overrides).resolve().unwrap();

        assert_eq!(resolved.rpc_url, "http://flag:8899");
        assert_eq!(resolved.commitment, CommitmentConfig::finalized());
        assert_eq!(resolved.settings.rent_exempt_minimum, 1000);
        assert!(resolved.settings.create_missing_token_accounts);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let bad_id = Config {
            program_id: Some("not-a-key".to_string()),
            ..Config::default()
        };
        assert!(matches!(bad_id.resolve(), Err(VaultError::Config(_))));

        let bad_commitment = Config {
            commitment: Some("eventually".to_string()),
            ..Config::default()
        };
        assert!(matches!(bad_commitment.resolve(), Err(VaultError::Config(_))));

        let path = temp_file("unknown-field.json", r#"{ "rpc": "x" }"#);
        assert!(matches!(Config::load(&path), Err(VaultError::Config(_))));
    }

    #[test]
    fn reads_cli_keypair_file() {
        let keypair = Keypair::new();
        let path = temp_file(
            "id.json",
            &serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap(),
        );

        let loaded = read_keypair(&path).unwrap();

        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn truncated_keypair_is_rejected() {
        let path = temp_file("short.json", "[1, 2, 3]");
        assert!(matches!(read_keypair(&path), Err(VaultError::Keypair { .. })));

        let missing = Path::new("/nonexistent/vault-liquidator/id.json");
        assert!(matches!(read_keypair(missing), Err(VaultError::Keypair { .. })));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home(Path::new("/etc/id.json")), PathBuf::from("/etc/id.json"));
    }
}
