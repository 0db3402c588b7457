//! Conformance test suite for `Ledger` implementations.
//!
//! This module provides a backend-agnostic test suite that any `Ledger`
//! implementation can run to verify it honors the guarantees the chaincode
//! depends on. The suite covers:
//!
//! - **Point access**: reads of absent keys, read-your-writes, overwrites
//! - **Range scans**: raw-byte key ordering, half-open bounds, merged writes
//! - **Snapshot isolation**: uncommitted writes invisible, abort discards
//! - **Atomic commit / conflicts**: stale reads and phantoms are rejected
//!   and a rejected commit applies nothing
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty ledger for each test:
//!
//! ```ignore
//! use rolltreppe_ledger::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn my_ledger_conformance() {
//!     let report = run_conformance_suite(|| async { MyLedger::connect().await }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod conflict;
mod point;
mod scan;
mod snapshot;

use std::fmt;
use std::future::Future;

use crate::{Ledger, StorageError};

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "point", "scan", "conflict").
    pub category: String,
    /// Test name (e.g. "absent_key_reads_none").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a ledger backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// ledger instance, ensuring test isolation.
pub async fn run_conformance_suite<L, F, Fut>(factory: F) -> ConformanceReport
where
    L: Ledger,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let mut results = Vec::new();

    results.extend(point::run_point_tests(&factory).await);
    results.extend(scan::run_scan_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(conflict::run_conflict_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn err(e: StorageError) -> String {
    e.to_string()
}

/// Commit `pairs` in a single snapshot.
async fn seed<L: Ledger>(ledger: &L, pairs: &[(&str, &str)]) -> Result<(), String> {
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    for (k, v) in pairs {
        ledger
            .put_state(&mut snap, k, v.as_bytes().to_vec())
            .await
            .map_err(err)?;
    }
    ledger.commit_snapshot(snap).await.map_err(err)
}

/// Read `key` in a fresh snapshot that is aborted afterwards.
async fn read_committed<L: Ledger>(ledger: &L, key: &str) -> Result<Option<Vec<u8>>, String> {
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    let value = ledger.get_state(&mut snap, key).await.map_err(err)?;
    ledger.abort_snapshot(snap).await.map_err(err)?;
    Ok(value)
}

/// Scan `[start, end)` in a fresh snapshot and return only the keys.
async fn scan_keys<L: Ledger>(ledger: &L, start: &str, end: &str) -> Result<Vec<String>, String> {
    let mut snap = ledger.begin_snapshot().await.map_err(err)?;
    let rows = ledger.range_scan(&mut snap, start, end).await.map_err(err)?;
    ledger.abort_snapshot(snap).await.map_err(err)?;
    Ok(rows.into_iter().map(|kv| kv.key).collect())
}
