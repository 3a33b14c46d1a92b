mod common;

use std::sync::Arc;

use anyhow::Result;
use common::Seeded;
use remitto::application::AppError;

#[tokio::test]
async fn test_transfer_moves_money_and_records_it() -> Result<()> {
    let ledger = Seeded::pair().await?;

    let tx = ledger.service.transfer(ledger.a(), ledger.b(), 2550).await?;

    assert_eq!(tx.from_address, ledger.a());
    assert_eq!(tx.to_address, ledger.b());
    assert_eq!(tx.amount_cents, 2550);
    assert_eq!(ledger.balance(ledger.a()).await?, 7450);
    assert_eq!(ledger.balance(ledger.b()).await?, 12550);

    let recorded = ledger.service.list_recent_transactions(10).await?;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].id, tx.id);

    Ok(())
}

#[tokio::test]
async fn test_transfers_conserve_total_balance() -> Result<()> {
    let ledger = Seeded::with_wallets(3, 10_000).await?;
    let [a, b, c] = [&ledger.addresses[0], &ledger.addresses[1], &ledger.addresses[2]];

    for (from, to, amount) in [(a, b, 1000), (b, c, 3333), (c, a, 1), (a, c, 9000)] {
        let before = ledger.balance(from).await? + ledger.balance(to).await?;
        ledger.service.transfer(from, to, amount).await?;
        let after = ledger.balance(from).await? + ledger.balance(to).await?;
        assert_eq!(before, after, "pair total changed on {} -> {}", from, to);
    }

    let report = ledger.service.check_integrity().await?;
    assert_eq!(report.total_balance, 30_000);
    assert!(report.is_healthy());

    Ok(())
}

#[tokio::test]
async fn test_sender_can_send_entire_balance() -> Result<()> {
    let ledger = Seeded::pair().await?;

    ledger.service.transfer(ledger.a(), ledger.b(), 10_000).await?;

    assert_eq!(ledger.balance(ledger.a()).await?, 0);
    assert_eq!(ledger.balance(ledger.b()).await?, 20_000);
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() -> Result<()> {
    let ledger = Seeded::pair().await?;

    for amount in [0, -1, -10_000] {
        let result = ledger.service.transfer(ledger.a(), ledger.b(), amount).await;
        assert!(
            matches!(result, Err(AppError::InvalidAmount(_))),
            "amount {} gave {:?}",
            amount,
            result
        );
    }

    assert_eq!(ledger.balance(ledger.a()).await?, 10_000);
    assert_eq!(ledger.balance(ledger.b()).await?, 10_000);
    assert_eq!(ledger.transaction_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_self_transfer_is_rejected() -> Result<()> {
    let ledger = Seeded::pair().await?;

    let result = ledger.service.transfer(ledger.a(), ledger.a(), 500).await;

    assert!(matches!(result, Err(AppError::SelfTransfer)));
    assert_eq!(ledger.balance(ledger.a()).await?, 10_000);
    assert_eq!(ledger.transaction_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_mid_transfer_rolls_back() -> Result<()> {
    let ledger = Seeded::pair().await?;

    // A second connection makes every ledger insert fail, after both
    // balances have already been adjusted inside the transfer
    let pool = sqlx::SqlitePool::connect(&ledger.url()).await?;
    sqlx::query(
        r#"
        CREATE TRIGGER reject_ledger_entries BEFORE INSERT ON transactions
        BEGIN
            SELECT RAISE(ABORT, 'ledger is read-only');
        END
        "#,
    )
    .execute(&pool)
    .await?;
    pool.close().await;

    let result = ledger.service.transfer(ledger.a(), ledger.b(), 500).await;

    assert!(
        matches!(result, Err(AppError::StorageFailure(_))),
        "expected StorageFailure, got {:?}",
        result
    );
    assert_eq!(ledger.balance(ledger.a()).await?, 10_000);
    assert_eq!(ledger.balance(ledger.b()).await?, 10_000);
    assert_eq!(ledger.transaction_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_is_rejected() -> Result<()> {
    let ledger = Seeded::pair().await?;

    let result = ledger.service.transfer(ledger.a(), ledger.b(), 10_001).await;

    match result {
        Err(AppError::InsufficientFunds {
            address,
            balance,
            required,
        }) => {
            assert_eq!(address, ledger.a());
            assert_eq!(balance, 10_000);
            assert_eq!(required, 10_001);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    assert_eq!(ledger.balance(ledger.a()).await?, 10_000);
    assert_eq!(ledger.balance(ledger.b()).await?, 10_000);
    assert_eq!(ledger.transaction_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_wallets_are_rejected() -> Result<()> {
    let ledger = Seeded::pair().await?;

    let result = ledger.service.transfer("nobody", ledger.b(), 100).await;
    assert!(matches!(result, Err(AppError::SenderNotFound(ref a)) if a == "nobody"));

    let result = ledger.service.transfer(ledger.a(), "nobody", 100).await;
    assert!(matches!(result, Err(AppError::RecipientNotFound(ref a)) if a == "nobody"));

    assert_eq!(ledger.balance(ledger.a()).await?, 10_000);
    assert_eq!(ledger.balance(ledger.b()).await?, 10_000);
    assert_eq!(ledger.transaction_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_validation_order_is_fixed() -> Result<()> {
    let ledger = Seeded::pair().await?;

    // Missing sender wins over everything else
    let result = ledger.service.transfer("ghost", "phantom", 0).await;
    assert!(matches!(result, Err(AppError::SenderNotFound(_))));

    // Missing recipient wins over a bad amount
    let result = ledger.service.transfer(ledger.a(), "phantom", -5).await;
    assert!(matches!(result, Err(AppError::RecipientNotFound(_))));

    // A bad amount wins over a self-transfer
    let result = ledger.service.transfer(ledger.a(), ledger.a(), 0).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    // A self-transfer wins over insufficient funds
    let result = ledger.service.transfer(ledger.a(), ledger.a(), 1_000_000).await;
    assert!(matches!(result, Err(AppError::SelfTransfer)));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opposite_transfers_settle() -> Result<()> {
    let ledger = Arc::new(Seeded::pair().await?);

    let forward = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger
                .service
                .transfer(ledger.a(), ledger.b(), 5000)
                .await
        })
    };
    let backward = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger
                .service
                .transfer(ledger.b(), ledger.a(), 5000)
                .await
        })
    };

    forward.await??;
    backward.await??;

    assert_eq!(ledger.balance(ledger.a()).await?, 10_000);
    assert_eq!(ledger.balance(ledger.b()).await?, 10_000);
    assert_eq!(ledger.transaction_count().await?, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() -> Result<()> {
    let ledger = Arc::new(Seeded::pair().await?);

    // 20 transfers of 10.00 race for a 100.00 balance
    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger
                .service
                .transfer(ledger.a(), ledger.b(), 1000)
                .await
        }));
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientFunds { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(insufficient, 10);
    assert_eq!(ledger.balance(ledger.a()).await?, 0);
    assert_eq!(ledger.balance(ledger.b()).await?, 20_000);
    assert_eq!(ledger.transaction_count().await?, 10);
    Ok(())
}
