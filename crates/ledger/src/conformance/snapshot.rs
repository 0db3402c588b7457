use std::future::Future;

use super::{err, read_committed, scan_keys, TestResult};
use crate::Ledger;

pub(super) async fn run_snapshot_tests<L, F, Fut>(factory: &F) -> Vec<TestResult>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    vec![
        TestResult::from_result(
            "snapshot",
            "uncommitted_write_invisible_to_others",
            uncommitted_write_invisible_to_others(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "abort_discards_writes",
            abort_discards_writes(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "drop_discards_writes",
            drop_discards_writes(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "commit_applies_all_writes",
            commit_applies_all_writes(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn uncommitted_write_invisible_to_others<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut writer = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .put_state(&mut writer, "0001", b"pending".to_vec())
        .await
        .map_err(err)?;

    let seen = read_committed(&ledger, "0001").await?;
    ledger.abort_snapshot(writer).await.map_err(err)?;
    if seen.is_some() {
        return Err("uncommitted write leaked into another snapshot".to_string());
    }
    Ok(())
}

async fn abort_discards_writes<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .put_state(&mut snap, "0001", b"x".to_vec())
        .await
        .map_err(err)?;
    ledger.abort_snapshot(snap).await.map_err(err)?;
    if read_committed(&ledger, "0001").await?.is_some() {
        return Err("aborted write is visible".to_string());
    }
    Ok(())
}

async fn drop_discards_writes<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    {
        let mut snap = ledger.begin_snapshot().await.map_err(err)?;
        ledger
            .put_state(&mut snap, "0001", b"x".to_vec())
            .await
            .map_err(err)?;
    }
    if read_committed(&ledger, "0001").await?.is_some() {
        return Err("dropped snapshot's write is visible".to_string());
    }
    Ok(())
}

async fn commit_applies_all_writes<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    for key in ["0001", "0002", "0003"] {
        ledger
            .put_state(&mut snap, key, key.as_bytes().to_vec())
            .await
            .map_err(err)?;
    }
    ledger.commit_snapshot(snap).await.map_err(err)?;
    let keys = scan_keys(&ledger, "0001", "0004").await?;
    if keys.len() != 3 {
        return Err(format!("expected 3 committed keys, got {:?}", keys));
    }
    Ok(())
}
