use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

use vault_liquidator::actions;
use vault_liquidator::config::{read_keypair, Config, ResolvedConfig};
use vault_liquidator::{liquidate, Mode, Outcome, RawAmount, Result, RpcLedger, VaultContext};

#[derive(Parser)]
#[command(name = "vault-liquidator", version, about)]
struct Cli {
    /// JSON config file; flags and env vars override its fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "VAULT_RPC_URL", global = true)]
    url: Option<String>,

    /// Payer keypair in Solana CLI JSON format.
    #[arg(long, env = "VAULT_KEYPAIR", global = true)]
    keypair: Option<PathBuf>,

    #[arg(long, env = "VAULT_PROGRAM_ID", global = true)]
    program_id: Option<String>,

    #[arg(long, global = true, value_parser = ["processed", "confirmed", "finalized"])]
    commitment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect, drain or close a vault.
    Run {
        vault_state: Option<Pubkey>,
        #[arg(default_value_t = Mode::Close)]
        mode: Mode,
    },
    /// Create a new vault. A fresh vault-state key is generated unless given.
    Init {
        #[arg(long)]
        vault_keypair: Option<PathBuf>,
    },
    DepositSol {
        lamports: u64,
        #[arg(long)]
        vault: Option<Pubkey>,
    },
    WithdrawSol {
        lamports: u64,
        #[arg(long)]
        vault: Option<Pubkey>,
    },
    DepositSpl {
        mint: Pubkey,
        amount: RawAmount,
        #[arg(long)]
        vault: Option<Pubkey>,
    },
    WithdrawSpl {
        mint: Pubkey,
        amount: RawAmount,
        #[arg(long)]
        vault: Option<Pubkey>,
    },
    DepositNft {
        mint: Pubkey,
        #[arg(long)]
        vault: Option<Pubkey>,
    },
    WithdrawNft {
        mint: Pubkey,
        #[arg(long)]
        vault: Option<Pubkey>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let file = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let overrides = Config {
        rpc_url: cli.url.clone(),
        commitment: cli.commitment.clone(),
        program_id: cli.program_id.clone(),
        keypair_path: cli.keypair.clone(),
        ..Config::default()
    };
    file.merge(overrides).resolve()
}

fn execute(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let payer = read_keypair(&config.keypair_path)?;
    let client = RpcLedger::new(&config.rpc_url, config.commitment);
    log::debug!("rpc {} payer {}", client.url(), payer.pubkey());

    let ctx = VaultContext::new(&client, &payer, config.program_id, config.settings);
    let vault_or_default = |vault: Option<Pubkey>| vault.unwrap_or(config.vault_state);

    match cli.command {
        Command::Run { vault_state, mode } => {
            run(&ctx, &vault_or_default(vault_state), mode)?;
        }
        Command::Init { vault_keypair } => {
            let vault_state = match vault_keypair {
                Some(path) => read_keypair(&path)?,
                None => Keypair::new(),
            };
            actions::initialize_vault(&ctx, &vault_state)?;
            println!("vaultState: {}", vault_state.pubkey());
        }
        Command::DepositSol { lamports, vault } => {
            actions::deposit_sol(&ctx, &vault_or_default(vault), lamports)?;
        }
        Command::WithdrawSol { lamports, vault } => {
            actions::withdraw_sol(&ctx, &vault_or_default(vault), lamports)?;
        }
        Command::DepositSpl {
            mint,
            amount,
            vault,
        } => {
            actions::deposit_spl(&ctx, &vault_or_default(vault), &mint, &amount)?;
        }
        Command::WithdrawSpl {
            mint,
            amount,
            vault,
        } => {
            actions::withdraw_spl(&ctx, &vault_or_default(vault), &mint, &amount)?;
        }
        Command::DepositNft { mint, vault } => {
            actions::deposit_nft(&ctx, &vault_or_default(vault), &mint)?;
        }
        Command::WithdrawNft { mint, vault } => {
            actions::withdraw_nft(&ctx, &vault_or_default(vault), &mint)?;
        }
    }
    Ok(())
}

fn run(ctx: &VaultContext<'_, RpcLedger>, vault_state: &Pubkey, mode: Mode) -> Result<()> {
    let report = liquidate(ctx, vault_state, mode)?;
    print!("{}", report.before);

    match report.outcome {
        Outcome::Inspected => {}
        Outcome::Withdrawn => {
            if let Some(after) = &report.after {
                println!();
                print!("{after}");
            }
        }
        Outcome::Closed(signature) => println!("\nvault closed: {signature}"),
        Outcome::Refused(remaining) => {
            eprintln!("refusing to close {vault_state}: vault authority still holds tokens");
            for entry in &remaining {
                eprintln!(
                    "  {} amount {}",
                    entry.address(),
                    entry.raw_amount().unwrap_or("?")
                );
            }
        }
    }
    Ok(())
}
