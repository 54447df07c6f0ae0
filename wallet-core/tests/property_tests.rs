//! Property-based tests for wallet ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Ledger consistency: balance == Σ(transactions.amount)
//! - Non-negativity: no sequence of operations drives a balance below zero
//! - Transfer conservation: a transfer moves money, never creates or destroys it

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;
use wallet_core::{Caller, Config, Error, Role, WalletService};

/// Strategy for generating valid amounts (positive decimals, two places)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// One step of wallet activity
#[derive(Debug, Clone)]
enum Op {
    Deposit(Decimal),
    Withdraw(Decimal),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        amount_strategy().prop_map(Op::Deposit),
        amount_strategy().prop_map(Op::Withdraw),
    ]
}

/// Create test service with temp directory
fn create_test_service() -> (WalletService, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    (WalletService::open(config).unwrap(), temp_dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: after any operation sequence, balance equals the ledger sum
    /// and never goes negative
    #[test]
    fn prop_ledger_sum_matches_balance(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (service, _temp) = create_test_service();
            let user_id = Uuid::new_v4();
            let client = Caller::new(user_id, Role::Client);
            let freelancer = Caller::new(user_id, Role::Freelancer);

            let mut expected = Decimal::ZERO;
            for op in &ops {
                match op {
                    Op::Deposit(amount) => {
                        let balance = service.deposit(&client, *amount).await.unwrap();
                        expected += *amount;
                        prop_assert_eq!(balance, expected);
                    }
                    Op::Withdraw(amount) => {
                        match service.withdraw(&freelancer, *amount).await {
                            Ok(balance) => {
                                expected -= *amount;
                                prop_assert_eq!(balance, expected);
                            }
                            Err(Error::InsufficientFunds { available, .. }) => {
                                // Rejected debit leaves the balance untouched
                                prop_assert!(*amount > expected);
                                prop_assert_eq!(available, expected);
                            }
                            Err(e) => return Err(TestCaseError::fail(format!("{}", e))),
                        }
                    }
                }
                prop_assert!(expected >= Decimal::ZERO);
            }

            let details = service.details(user_id).await.unwrap();
            let sum: Decimal = details.transactions.iter().map(|t| t.amount).sum();
            prop_assert_eq!(details.balance, sum);
            prop_assert_eq!(details.balance, expected);
            prop_assert!(service.verify_ledger(user_id).unwrap());

            service.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: an overdraw always fails with InsufficientFunds and changes nothing
    #[test]
    fn prop_overdraw_always_rejected(seed in amount_strategy(), excess in amount_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (service, _temp) = create_test_service();
            let user_id = Uuid::new_v4();
            let client = Caller::new(user_id, Role::Client);
            let freelancer = Caller::new(user_id, Role::Freelancer);

            service.deposit(&client, seed).await.unwrap();

            let result = service.withdraw(&freelancer, seed + excess).await;
            let is_insufficient_funds = matches!(result, Err(Error::InsufficientFunds { .. }));
            prop_assert!(is_insufficient_funds);

            let details = service.details(user_id).await.unwrap();
            prop_assert_eq!(details.balance, seed);
            prop_assert_eq!(details.transactions.len(), 1);

            service.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a transfer conserves the combined balance of both wallets
    /// and appends exactly one release entry per side
    #[test]
    fn prop_transfer_conserves_money(seed in amount_strategy(), fraction in 1u32..100) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (service, _temp) = create_test_service();
            let client = Caller::new(Uuid::new_v4(), Role::Client);
            let freelancer_id = Uuid::new_v4();

            service.deposit(&client, seed).await.unwrap();

            let amount = (seed * Decimal::from(fraction) / Decimal::from(100))
                .round_dp(2)
                .max(Decimal::new(1, 2));

            service
                .transfer(client.user_id, freelancer_id, amount, "Milestone work")
                .await
                .unwrap();

            let client_details = service.details(client.user_id).await.unwrap();
            let freelancer_details = service.details(freelancer_id).await.unwrap();

            prop_assert_eq!(client_details.balance + freelancer_details.balance, seed);
            prop_assert_eq!(freelancer_details.transactions.len(), 1);
            prop_assert_eq!(client_details.transactions.len(), 2); // deposit + debit
            prop_assert!(service.verify_ledger(client.user_id).unwrap());
            prop_assert!(service.verify_ledger(freelancer_id).unwrap());

            service.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
