use std::future::Future;

use super::{err, scan_keys, seed, TestResult};
use crate::{Ledger, StorageError};

pub(super) async fn run_scan_tests<L, F, Fut>(factory: &F) -> Vec<TestResult>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    vec![
        TestResult::from_result(
            "scan",
            "scan_orders_by_raw_key_bytes",
            scan_orders_by_raw_key_bytes(factory).await,
        ),
        TestResult::from_result(
            "scan",
            "scan_end_is_exclusive",
            scan_end_is_exclusive(factory).await,
        ),
        TestResult::from_result(
            "scan",
            "scan_excludes_keys_outside_range",
            scan_excludes_keys_outside_range(factory).await,
        ),
        TestResult::from_result(
            "scan",
            "empty_range_returns_nothing",
            empty_range_returns_nothing(factory).await,
        ),
        TestResult::from_result(
            "scan",
            "inverted_range_is_invalid",
            inverted_range_is_invalid(factory).await,
        ),
        TestResult::from_result(
            "scan",
            "scan_includes_own_writes",
            scan_includes_own_writes(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Keys come back in byte order, which for zero-padded numbers is numeric order.
async fn scan_orders_by_raw_key_bytes<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0010", "x"), ("0002", "x"), ("0001", "x")]).await?;
    let keys = scan_keys(&ledger, "0001", "9999").await?;
    if keys != ["0001", "0002", "0010"] {
        return Err(format!("unexpected order: {:?}", keys));
    }
    Ok(())
}

async fn scan_end_is_exclusive<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0001", "a"), ("0002", "b"), ("0003", "c")]).await?;
    let keys = scan_keys(&ledger, "0001", "0003").await?;
    if keys != ["0001", "0002"] {
        return Err(format!("expected [0001, 0002], got {:?}", keys));
    }
    Ok(())
}

async fn scan_excludes_keys_outside_range<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(
        &ledger,
        &[
            ("0001", "t"),
            ("KI0001", "e"),
            ("foo gmbh", "s"),
            ("ticketCounter", "1"),
        ],
    )
    .await?;
    let keys = scan_keys(&ledger, "0001", "0002").await?;
    if keys != ["0001"] {
        return Err(format!("expected only 0001, got {:?}", keys));
    }
    Ok(())
}

async fn empty_range_returns_nothing<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0001", "a")]).await?;
    let keys = scan_keys(&ledger, "0001", "0001").await?;
    if !keys.is_empty() {
        return Err(format!("expected empty scan, got {:?}", keys));
    }
    Ok(())
}

async fn inverted_range_is_invalid<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    let result = ledger.range_scan(&mut snap, "0005", "0001").await;
    ledger.abort_snapshot(snap).await.map_err(err)?;
    match result {
        Err(StorageError::InvalidRange { .. }) => Ok(()),
        Err(other) => Err(format!("expected InvalidRange, got {}", other)),
        Ok(rows) => Err(format!("expected InvalidRange, got {} rows", rows.len())),
    }
}

async fn scan_includes_own_writes<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0001", "a")]).await?;
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .put_state(&mut snap, "0002", b"b".to_vec())
        .await
        .map_err(err)?;
    let rows = ledger
        .range_scan(&mut snap, "0001", "0003")
        .await
        .map_err(err)?;
    ledger.abort_snapshot(snap).await.map_err(err)?;
    let keys: Vec<&str> = rows.iter().map(|kv| kv.key.as_str()).collect();
    if keys != ["0001", "0002"] {
        return Err(format!("expected [0001, 0002], got {:?}", keys));
    }
    Ok(())
}
