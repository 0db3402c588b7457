use std::future::Future;

use super::{err, read_committed, seed, TestResult};
use crate::{Ledger, StorageError};

pub(super) async fn run_conflict_tests<L, F, Fut>(factory: &F) -> Vec<TestResult>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    vec![
        TestResult::from_result(
            "conflict",
            "concurrent_counter_increment_conflicts",
            concurrent_counter_increment_conflicts(factory).await,
        ),
        TestResult::from_result(
            "conflict",
            "conflicted_commit_applies_nothing",
            conflicted_commit_applies_nothing(factory).await,
        ),
        TestResult::from_result(
            "conflict",
            "phantom_insert_conflicts_with_range_reader",
            phantom_insert_conflicts_with_range_reader(factory).await,
        ),
        TestResult::from_result(
            "conflict",
            "disjoint_writers_both_commit",
            disjoint_writers_both_commit(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Two snapshots that read the same counter and both write it back: the
/// second commit must be rejected, otherwise an ID would be handed out twice.
async fn concurrent_counter_increment_conflicts<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("ticketCounter", "4")]).await?;

    let mut a = ledger.begin_snapshot().await.map_err(err)?;
    let mut b = ledger.begin_snapshot().await.map_err(err)?;
    ledger.get_state(&mut a, "ticketCounter").await.map_err(err)?;
    ledger.get_state(&mut b, "ticketCounter").await.map_err(err)?;
    ledger
        .put_state(&mut a, "ticketCounter", b"5".to_vec())
        .await
        .map_err(err)?;
    ledger
        .put_state(&mut b, "ticketCounter", b"5".to_vec())
        .await
        .map_err(err)?;

    ledger.commit_snapshot(a).await.map_err(err)?;
    match ledger.commit_snapshot(b).await {
        Err(StorageError::ConcurrentConflict { key }) if key == "ticketCounter" => Ok(()),
        Err(other) => Err(format!("expected ConcurrentConflict, got {}", other)),
        Ok(()) => Err("second increment committed; counter value reused".to_string()),
    }
}

async fn conflicted_commit_applies_nothing<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("ticketCounter", "1")]).await?;

    let mut loser = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .get_state(&mut loser, "ticketCounter")
        .await
        .map_err(err)?;
    ledger
        .put_state(&mut loser, "ticketCounter", b"2".to_vec())
        .await
        .map_err(err)?;
    ledger
        .put_state(&mut loser, "0002", b"ticket".to_vec())
        .await
        .map_err(err)?;

    seed(&ledger, &[("ticketCounter", "2"), ("0002", "winner")]).await?;

    if ledger.commit_snapshot(loser).await.is_ok() {
        return Err("stale snapshot committed".to_string());
    }
    match read_committed(&ledger, "0002").await? {
        Some(v) if v == b"winner" => Ok(()),
        other => Err(format!("expected winner's record to survive, got {:?}", other)),
    }
}

async fn phantom_insert_conflicts_with_range_reader<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    seed(&ledger, &[("0001", "a")]).await?;

    let mut reader = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .range_scan(&mut reader, "0001", "0100")
        .await
        .map_err(err)?;
    ledger
        .put_state(&mut reader, "report", b"1 ticket".to_vec())
        .await
        .map_err(err)?;

    seed(&ledger, &[("0002", "b")]).await?;

    match ledger.commit_snapshot(reader).await {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(other) => Err(format!("expected ConcurrentConflict, got {}", other)),
        Ok(()) => Err("range reader committed despite phantom insert".to_string()),
    }
}

async fn disjoint_writers_both_commit<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let ledger = factory().await;
    let mut a = ledger.begin_snapshot().await.map_err(err)?;
    let mut b = ledger.begin_snapshot().await.map_err(err)?;
    ledger
        .put_state(&mut a, "KI0001", b"a".to_vec())
        .await
        .map_err(err)?;
    ledger
        .put_state(&mut b, "BO0002", b"b".to_vec())
        .await
        .map_err(err)?;
    ledger.commit_snapshot(a).await.map_err(err)?;
    ledger.commit_snapshot(b).await.map_err(err)?;
    Ok(())
}
