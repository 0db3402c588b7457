//! Runs the backend-agnostic conformance suite against `MemoryLedger`.

use rolltreppe_ledger::conformance::run_conformance_suite;
use rolltreppe_ledger::{ManualClock, MemoryLedger};

#[tokio::test]
async fn memory_ledger_passes_conformance_suite() {
    let report =
        run_conformance_suite(|| async { MemoryLedger::new().with_clock(ManualClock::new(0)) })
            .await;
    assert_eq!(report.failed, 0, "{report}");
    assert_eq!(report.passed, report.total);
    assert!(report.total >= 19);
}

#[tokio::test]
async fn system_clock_ledger_passes_conformance_suite() {
    let report = run_conformance_suite(|| async { MemoryLedger::new() }).await;
    assert_eq!(report.failed, 0, "{report}");
}
