mod common;

use common::World;
use creditline::domain::money::MinorUnits;
use creditline::domain::ports::{LockPolicy, WalletStore};
use creditline::domain::wallet::Entry;
use creditline::error::SpendError;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    let world = World::new();
    let (_, wallet) = world.company_with_wallet(dec!(100)).await;
    let start = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ledger = world.ledger.clone();
            let start = start.clone();
            tokio::spawn(async move {
                start.wait().await;
                ledger.debit(wallet.id, dec!(60)).await
            })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let successes = results.iter().filter(|r| r.is_ok()).count();
    // the lock holder always has 100.00 to draw from
    assert_eq!(successes, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            err,
            SpendError::InsufficientCredit { .. } | SpendError::LockContention(_)
        ));
    }

    let wallet = world.ledger.wallet(wallet.id).await.unwrap();
    assert_eq!(wallet.current_spending, MinorUnits(6_000));
    assert_eq!(wallet.available_credit, MinorUnits(4_000));
    assert!(wallet.is_consistent());
}

#[tokio::test]
async fn test_held_row_lock_fails_fast_and_leaves_wallet_untouched() {
    let world = World::new();
    let (_, wallet) = world.company_with_wallet(dec!(100)).await;

    let held = world.wallets.lock_for_update(wallet.id).await.unwrap();
    let err = world.ledger.debit(wallet.id, dec!(10)).await.unwrap_err();
    assert!(matches!(err, SpendError::LockContention(id) if id == wallet.id));
    assert!(err.is_retryable());
    assert!(!err.is_decline());
    assert_eq!(world.ledger.wallet(wallet.id).await.unwrap(), wallet);

    drop(held);
    let wallet = world.ledger.debit(wallet.id, dec!(10)).await.unwrap();
    assert_eq!(wallet.current_spending, MinorUnits(1_000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_openings_leave_one_wallet_per_company() {
    let world = World::new();
    let company_id = Uuid::new_v4();
    let start = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = world.ledger.clone();
            let start = start.clone();
            tokio::spawn(async move {
                start.wait().await;
                ledger
                    .open_wallet(company_id, &format!("acct_{i}"), "cust")
                    .await
            })
        })
        .collect();
    let mut opened = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => opened += 1,
            Err(SpendError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(opened, 1);
    let wallets = world.ledger.wallets().await.unwrap();
    assert_eq!(
        wallets.iter().filter(|w| w.company_id == company_id).count(),
        1
    );
}

#[tokio::test]
async fn test_waiting_writers_queue_behind_holder() {
    let world = World::with_policy(LockPolicy::Wait {
        timeout: Duration::from_secs(2),
    });
    let (_, wallet) = world.company_with_wallet(dec!(100)).await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ledger = world.ledger.clone();
            tokio::spawn(async move { ledger.debit(wallet.id, dec!(60)).await })
        })
        .collect();

    let mut successes = 0;
    let mut declines = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(SpendError::InsufficientCredit { .. }) => declines += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((successes, declines), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_wallets_stay_consistent() {
    let world = World::with_policy(LockPolicy::Wait {
        timeout: Duration::from_secs(5),
    });
    let mut wallets = Vec::new();
    for _ in 0..10 {
        wallets.push(world.company_with_wallet(dec!(1_000)).await.1);
    }

    let mut handles = Vec::new();
    for wallet in &wallets {
        for i in 0..20 {
            let ledger = world.ledger.clone();
            let wallet_id = wallet.id;
            handles.push(tokio::spawn(async move {
                let entry = if i % 4 == 0 { Entry::Credit } else { Entry::Debit };
                ledger
                    .update_balance_minor(wallet_id, entry, MinorUnits(2_500))
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for wallet in wallets {
        let wallet = world.ledger.wallet(wallet.id).await.unwrap();
        // 15 debits and 5 credits of 25.00 each
        assert_eq!(wallet.current_spending, MinorUnits(37_500));
        assert_eq!(wallet.cash_back_payment, MinorUnits(12_500));
        assert_eq!(wallet.available_credit, MinorUnits(75_000));
        assert!(wallet.is_consistent());
    }
}
