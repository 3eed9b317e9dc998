//! Liquidation runs against an in-process ledger with no vault program
//! deployed: anything that reaches the program fails, the rest is real.

#[cfg(test)]
mod tests {
    use solana_pubkey::Pubkey;
    use solana_signer::Signer;

    use vault_liquidator::pda::associated_token_address;
    use vault_liquidator::state::{DEFAULT_PROGRAM_ID, DEFAULT_RENT_EXEMPT_MINIMUM};
    use vault_liquidator::{liquidate, Ledger, Mode, Outcome, Settings, VaultContext, VaultError};
    use vault_tests::common::SvmLedger;

    #[test]
    fn test_withdraw_mode_with_nothing_to_move() {
        let ledger = SvmLedger::new();
        let payer = ledger.funded_payer();
        let ctx = VaultContext::new(&ledger, &payer, DEFAULT_PROGRAM_ID, Settings::default());
        let vault_state = Pubkey::new_unique();
        let vault = ctx.vault_addresses(&vault_state).unwrap();
        ledger.airdrop(&vault.balance, DEFAULT_RENT_EXEMPT_MINIMUM);

        let report = liquidate(&ctx, &vault_state, Mode::Withdraw).unwrap();

        assert_eq!(report.outcome, Outcome::Withdrawn);
        assert!(report.submissions.is_empty());
        assert_eq!(
            report.after.map(|after| after.lamports),
            Some(DEFAULT_RENT_EXEMPT_MINIMUM)
        );
    }

    #[test]
    fn test_empty_vault_close_reaches_program() {
        let ledger = SvmLedger::new();
        let payer = ledger.funded_payer();
        let ctx = VaultContext::new(&ledger, &payer, DEFAULT_PROGRAM_ID, Settings::default());

        // Nothing to withdraw, so the first instruction sent is Close itself.
        let err = liquidate(&ctx, &Pubkey::new_unique(), Mode::Close).unwrap_err();

        println!("Close result: {err}");
        assert!(matches!(err, VaultError::Submission { ref label, .. } if label == "Close"));
    }

    #[test]
    fn test_failed_withdrawal_never_closes() {
        let ledger = SvmLedger::new();
        let payer = ledger.funded_payer();
        let ctx = VaultContext::new(&ledger, &payer, DEFAULT_PROGRAM_ID, Settings::default());
        let vault_state = Pubkey::new_unique();
        let vault = ctx.vault_addresses(&vault_state).unwrap();

        let mint = ledger.create_mint(6);
        let vault_ata = ledger.seed_token_account(&vault.authority, &mint, 30_000);
        ledger.airdrop(&vault.balance, 2_000_000);

        let err = liquidate(&ctx, &vault_state, Mode::Close).unwrap_err();

        println!("Liquidation result: {err}");
        assert!(matches!(err, VaultError::Submission { ref label, .. } if label == "WithdrawSpl"));
        // The payer's token account was provisioned before the withdrawal failed.
        let payer_ata = associated_token_address(&payer.pubkey(), &mint);
        assert_eq!(ledger.token_balance(&payer_ata), Some(0));
        assert_eq!(ledger.token_balance(&vault_ata), Some(30_000));
        assert_eq!(ledger.lamport_balance(&vault.balance).unwrap(), 2_000_000);
    }
}
