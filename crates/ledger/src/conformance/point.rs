use std::future::Future;

use super::{err, read_committed, seed, TestResult};
use crate::Ledger;

pub(super) async fn run_point_tests<L, F, Fut>(factory: &F) -> Vec<TestResult>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    vec![
        TestResult::from_result(
            "point",
            "absent_key_reads_none",
            absent_key_reads_none(factory).await,
        ),
        TestResult::from_result(
            "point",
            "committed_write_is_readable",
            committed_write_is_readable(factory).await,
        ),
        TestResult::from_result(
            "point",
            "own_write_visible_before_commit",
            own_write_visible_before_commit(factory).await,
        ),
        TestResult::from_result(
            "point",
            "overwrite_replaces_value",
            overwrite_replaces_value(factory).await,
        ),
        TestResult::from_result(
            "point",
            "timestamp_constant_within_snapshot",
            timestamp_constant_within_snapshot(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn absent_key_reads_none<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    match read_committed(&ledger, "ticketCounter").await? {
        None => Ok(()),
        Some(v) => Err(format!("expected None, got {} bytes", v.len())),
    }
}

async fn committed_write_is_readable<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0001", "ticket-1")]).await?;
    match read_committed(&ledger, "0001").await? {
        Some(v) if v == b"ticket-1" => Ok(()),
        other => Err(format!("expected 'ticket-1', got {:?}", other)),
    }
}

async fn own_write_visible_before_commit<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .put_state(&mut snap, "escalatorCounter", b"1".to_vec())
        .await
        .map_err(err)?;
    let seen = ledger
        .get_state(&mut snap, "escalatorCounter")
        .await
        .map_err(err)?;
    ledger.abort_snapshot(snap).await.map_err(err)?;
    if seen.as_deref() != Some(b"1".as_slice()) {
        return Err(format!("expected own write '1', got {:?}", seen));
    }
    Ok(())
}

async fn overwrite_replaces_value<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0001", "v1")]).await?;
    seed(&ledger, &[("0001", "v2")]).await?;
    match read_committed(&ledger, "0001").await? {
        Some(v) if v == b"v2" => Ok(()),
        other => Err(format!("expected 'v2', got {:?}", other)),
    }
}

async fn timestamp_constant_within_snapshot<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    let first = ledger.tx_timestamp(&snap);
    ledger
        .put_state(&mut snap, "k", b"v".to_vec())
        .await
        .map_err(err)?;
    let second = ledger.tx_timestamp(&snap);
    ledger.abort_snapshot(snap).await.map_err(err)?;
    if first != second {
        return Err(format!("timestamp moved from {} to {}", first, second));
    }
    Ok(())
}
