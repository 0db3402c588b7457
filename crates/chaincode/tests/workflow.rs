//! End-to-end ticket workflows driven through `Chaincode::call`.

use rolltreppe_chaincode::{
    ticket, Chaincode, ChaincodeConfig, ChaincodeError, Escalator, NewTicket, RepairStatus,
    ScanPolicy, ServiceLevelAgreement, Status, Ticket,
};
use rolltreppe_ledger::{Ledger, ManualClock, MemoryLedger, StorageError};

const T0: i64 = 1_700_000_000;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

async fn setup() -> (Chaincode<MemoryLedger>, ManualClock) {
    let clock = ManualClock::new(T0);
    let cc = Chaincode::new(MemoryLedger::new().with_clock(clock.clone()));
    assert!(cc.init().await.unwrap());
    (cc, clock)
}

async fn new_ticket(cc: &Chaincode<MemoryLedger>) -> String {
    let id = cc.call("createDefaultTicket", &[]).await.unwrap();
    String::from_utf8(id).unwrap()
}

async fn step(cc: &Chaincode<MemoryLedger>, function: &str, values: &[&str]) {
    cc.call(function, &args(values))
        .await
        .unwrap_or_else(|e| panic!("{} {:?} failed: {}", function, values, e));
}

async fn full_ticket(cc: &Chaincode<MemoryLedger>, id: &str) -> Ticket {
    let raw = cc.call("getFullTicket", &args(&[id])).await.unwrap();
    serde_json::from_slice(&raw).unwrap()
}

async fn sla(cc: &Chaincode<MemoryLedger>, provider: &str) -> ServiceLevelAgreement {
    let raw = cc.call("getSLA", &args(&[provider])).await.unwrap();
    serde_json::from_slice(&raw).unwrap()
}

async fn list(cc: &Chaincode<MemoryLedger>, function: &str, values: &[&str]) -> Vec<Ticket> {
    let raw = cc.call(function, &args(values)).await.unwrap();
    serde_json::from_slice(&raw).unwrap()
}

/// Walk a ticket up to `Reparatur begonnen`, arriving `arrive_after` seconds
/// after creation.
async fn to_repair(
    cc: &Chaincode<MemoryLedger>,
    clock: &ManualClock,
    provider: &str,
    arrive_after: i64,
) -> String {
    clock.set(T0);
    let id = new_ticket(cc).await;
    step(cc, "assignTicket", &[&id, provider]).await;
    step(cc, "assignMechanic", &[&id, "Erika"]).await;
    step(cc, "startJourney", &[&id]).await;
    clock.set(T0 + arrive_after);
    step(cc, "onArrival", &[&id, "Motor defekt", "2h"]).await;
    step(cc, "startRepair", &[&id]).await;
    id
}

// ──────────────────────────────────────
// SLA evaluation
// ──────────────────────────────────────

#[tokio::test]
async fn repair_within_deadlines_counts_as_none() {
    let (cc, clock) = setup().await;
    step(&cc, "createSLA", &["Foo GmbH", "150", "300"]).await;

    let id = to_repair(&cc, &clock, "Foo GmbH", 100).await;
    clock.set(T0 + 200);
    step(&cc, "finishRepair", &[&id]).await;

    let agreement = sla(&cc, "Foo GmbH").await;
    assert_eq!((agreement.none, agreement.light, agreement.severe), (1, 0, 0));

    let t = full_ticket(&cc, &id).await;
    assert_eq!(t.time_of_arrival, Some(T0 + 100));
    assert_eq!(t.final_repair_time, Some(T0 + 200));
    assert_eq!(t.status, Status::Erledigt);
}

#[tokio::test]
async fn arrival_far_past_deadline_counts_as_severe() {
    let (cc, clock) = setup().await;
    step(&cc, "createSLA", &["Foo GmbH", "150", "300000"]).await;

    let id = to_repair(&cc, &clock, "Foo GmbH", 150 + 10_800 + 1).await;
    clock.set(T0 + 11_000);
    step(&cc, "finishRepair", &[&id]).await;

    let agreement = sla(&cc, "Foo GmbH").await;
    assert_eq!((agreement.none, agreement.light, agreement.severe), (0, 0, 1));
}

#[tokio::test]
async fn missed_deadline_within_grace_counts_as_light() {
    let (cc, clock) = setup().await;
    step(&cc, "createSLA", &["Foo GmbH", "150", "300"]).await;

    let id = to_repair(&cc, &clock, "foo gmbh", 100).await;
    clock.set(T0 + 400);
    step(&cc, "finishRepair", &[&id]).await;

    let agreement = sla(&cc, "FOO GMBH").await;
    assert_eq!((agreement.none, agreement.light, agreement.severe), (0, 1, 0));
}

#[tokio::test]
async fn maximal_deadline_does_not_wrap_into_severe() {
    let (cc, clock) = setup().await;
    let max = i64::MAX.to_string();
    step(&cc, "createSLA", &["Foo GmbH", &max, "300"]).await;

    let id = to_repair(&cc, &clock, "Foo GmbH", 60).await;
    clock.set(T0 + 400);
    step(&cc, "finishRepair", &[&id]).await;

    let agreement = sla(&cc, "Foo GmbH").await;
    assert_eq!((agreement.none, agreement.light, agreement.severe), (0, 1, 0));
}

#[tokio::test]
async fn provider_without_agreement_finishes_normally() {
    let (cc, clock) = setup().await;
    let id = to_repair(&cc, &clock, "Bar AG", 10).await;
    step(&cc, "finishRepair", &[&id]).await;
    assert_eq!(
        full_ticket(&cc, &id).await.repair_status,
        Some(RepairStatus::ReparaturAbgeschlossen)
    );
}

// ──────────────────────────────────────
// Lifecycle
// ──────────────────────────────────────

#[tokio::test]
async fn full_workflow_round_trips_every_field() {
    let (cc, clock) = setup().await;
    let id = to_repair(&cc, &clock, "Foo GmbH", 60).await;
    clock.set(T0 + 120);
    step(&cc, "finishRepair", &[&id]).await;
    step(&cc, "writeFinalReport", &[&id, "Motor getauscht"]).await;

    let t = full_ticket(&cc, &id).await;
    assert_eq!(t.ticket_id, id);
    assert_eq!(t.timestamp, T0);
    assert_eq!(t.trainstation, "Kiel Hbf");
    assert_eq!(t.platform, "Gleis 5");
    assert_eq!(t.device, "KI0001");
    assert_eq!(t.service_provider, "Foo GmbH");
    assert_eq!(t.sp_employee, "Erika");
    assert_eq!(t.spe_commentary, "Motor defekt");
    assert_eq!(t.est_repair_time, "2h");
    assert_eq!(t.final_report, "Motor getauscht");
    assert_eq!(t.status, Status::Erledigt);
    assert_eq!(t.repair_status, Some(RepairStatus::ImAbschluss));

    // Stored bytes decode to the same value a second read produces.
    let raw = cc.ledger().committed_value(&id).unwrap();
    let stored: Ticket = serde_json::from_slice(&raw).unwrap();
    assert_eq!(stored, t);
}

#[tokio::test]
async fn illegal_transition_leaves_record_byte_identical() {
    let (cc, _clock) = setup().await;
    let id = new_ticket(&cc).await;
    step(&cc, "assignTicket", &[&id, "Foo GmbH"]).await;
    let before = cc.ledger().committed_value(&id).unwrap();

    for (function, extra) in [
        ("assignTicket", vec!["Bar AG"]),
        ("startJourney", vec![]),
        ("onArrival", vec!["x", "y"]),
        ("finishRepair", vec![]),
        ("writeFinalReport", vec!["zu frueh"]),
    ] {
        let mut values = vec![id.as_str()];
        values.extend(extra);
        match cc.call(function, &args(&values)).await {
            Err(ChaincodeError::IllegalTransition { current, .. }) => {
                assert_eq!(current, "Wird geprueft", "{}", function)
            }
            other => panic!("{}: expected IllegalTransition, got {:?}", function, other),
        }
        assert_eq!(cc.ledger().committed_value(&id).unwrap(), before);
    }
}

#[tokio::test]
async fn transition_on_unknown_ticket_is_not_found() {
    let (cc, _clock) = setup().await;
    match cc.call("startJourney", &args(&["0042"])).await {
        Err(e @ ChaincodeError::NotFound { .. }) => assert_eq!(e.code(), "NotFound"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

// ──────────────────────────────────────
// Queries
// ──────────────────────────────────────

#[tokio::test]
async fn all_tickets_are_contiguous_and_ordered() {
    let (cc, _clock) = setup().await;
    for _ in 0..11 {
        new_ticket(&cc).await;
    }
    let all = list(&cc, "getAllTickets", &[]).await;
    let ids: Vec<&str> = all.iter().map(|t| t.ticket_id.as_str()).collect();
    let expected: Vec<String> = (1..=11).map(|n| format!("{:04}", n)).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn status_query_filters_by_provider_case_insensitively() {
    let (cc, _clock) = setup().await;
    assert!(list(&cc, "getTicketsByStatus", &["ZUGEWIESEN", "Foo GmbH"])
        .await
        .is_empty());

    let a = new_ticket(&cc).await;
    let b = new_ticket(&cc).await;
    let c = new_ticket(&cc).await;
    let _unassigned = new_ticket(&cc).await;
    step(&cc, "assignTicket", &[&a, "Foo GmbH"]).await;
    step(&cc, "assignTicket", &[&b, "Bar AG"]).await;
    step(&cc, "assignTicket", &[&c, "FOO GMBH"]).await;

    let found = list(&cc, "getTicketsByStatus", &["zugewiesen", "foo gmbh"]).await;
    let ids: Vec<&str> = found.iter().map(|t| t.ticket_id.as_str()).collect();
    assert_eq!(ids, [a.as_str(), c.as_str()]);

    let no_match = cc
        .call("getTicketsByStatus", &args(&["ERLEDIGT", "Foo GmbH"]))
        .await
        .unwrap();
    assert_eq!(no_match, b"[]");

    let any_provider = list(&cc, "getTicketsByStatus", &["ZUGEWIESEN"]).await;
    assert_eq!(any_provider.len(), 3);
}

#[tokio::test]
async fn provider_work_queues() {
    let (cc, clock) = setup().await;
    let fresh = new_ticket(&cc).await;
    step(&cc, "assignTicket", &[&fresh, "Foo GmbH"]).await;

    let travelling = new_ticket(&cc).await;
    step(&cc, "assignTicket", &[&travelling, "Foo GmbH"]).await;
    step(&cc, "assignMechanic", &[&travelling, "Max"]).await;
    step(&cc, "startJourney", &[&travelling]).await;

    let repairing = to_repair(&cc, &clock, "Foo GmbH", 30).await;

    let ids = |tickets: Vec<Ticket>| -> Vec<String> {
        tickets.into_iter().map(|t| t.ticket_id).collect()
    };
    assert_eq!(ids(list(&cc, "getNewSPTickets", &["Foo GmbH"]).await), [fresh.clone()]);
    assert_eq!(
        ids(list(&cc, "getAssignedSPTickets", &["Foo GmbH"]).await),
        [travelling.clone()]
    );
    assert_eq!(ids(list(&cc, "getWIPTickets", &["Foo GmbH"]).await), [repairing.clone()]);
    assert_eq!(
        ids(list(&cc, "getTicketsByServiceProvider", &["foo gmbh"]).await),
        [fresh, travelling.clone(), repairing.clone()]
    );
    assert_eq!(
        ids(list(&cc, "getTicketsByMechanic", &["Foo GmbH", "max"]).await),
        [travelling]
    );
    assert_eq!(
        ids(list(&cc, "getTicketsByMechanic", &["Foo GmbH", "Erika"]).await),
        [repairing]
    );
    assert!(list(&cc, "getWIPTickets", &["Bar AG"]).await.is_empty());
}

#[tokio::test]
async fn range_query_uses_caller_bounds() {
    let (cc, _clock) = setup().await;
    for _ in 0..5 {
        new_ticket(&cc).await;
    }
    let found = list(&cc, "getTicketsByRange", &["0002", "0005"]).await;
    let ids: Vec<&str> = found.iter().map(|t| t.ticket_id.as_str()).collect();
    assert_eq!(ids, ["0002", "0003", "0004"]);

    match cc.call("getTicketsByRange", &args(&["0005", "0002"])).await {
        Err(ChaincodeError::Storage(StorageError::InvalidRange { .. })) => {}
        other => panic!("expected InvalidRange, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_record_is_skipped_by_default_and_fatal_under_abort() {
    let ledger = MemoryLedger::new();
    let cc = Chaincode::new(ledger.clone());
    cc.init().await.unwrap();
    for _ in 0..3 {
        new_ticket(&cc).await;
    }
    let mut snap = ledger.begin_snapshot().await.unwrap();
    ledger
        .put_state(&mut snap, "0002", b"{\"broken\":".to_vec())
        .await
        .unwrap();
    ledger.commit_snapshot(snap).await.unwrap();

    assert_eq!(list(&cc, "getAllTickets", &[]).await.len(), 2);

    let strict = Chaincode::new(ledger)
        .with_config(ChaincodeConfig::default().with_scan_policy(ScanPolicy::Abort));
    match strict.call("getAllTickets", &[]).await {
        Err(e @ ChaincodeError::Encoding { .. }) => assert_eq!(e.code(), "EncodingError"),
        other => panic!("expected Encoding, got {:?}", other),
    }
    // Single-record reads fail under either policy.
    for reader in [&cc, &strict] {
        match reader.call("getFullTicket", &args(&["0002"])).await {
            Err(ChaincodeError::Encoding { key, .. }) => assert_eq!(key, "0002"),
            other => panic!("expected Encoding, got {:?}", other),
        }
    }
    let intact = full_ticket(&strict, "0003").await;
    assert_eq!(intact.ticket_id, "0003");
}

// ──────────────────────────────────────
// Escalators and atomicity
// ──────────────────────────────────────

#[tokio::test]
async fn escalator_failure_opens_ticket_at_its_station() {
    let (cc, _clock) = setup().await;
    let id = cc
        .call("createEscalator", &args(&["Hamburg Dammtor", "Gleis 3"]))
        .await
        .unwrap();
    assert_eq!(id, b"HA0002");

    let ticket_id = cc
        .call(
            "setEscalatorState",
            &args(&["HA0002", "false", "Stufe", "S-9", "Stufe gebrochen"]),
        )
        .await
        .unwrap();
    let t = full_ticket(&cc, std::str::from_utf8(&ticket_id).unwrap()).await;
    assert_eq!(t.device, "HA0002");
    assert_eq!(t.trainstation, "Hamburg Dammtor");
    assert_eq!(t.platform, "Gleis 3");
    assert_eq!(t.error_message, "Stufe gebrochen");
}

#[tokio::test]
async fn failure_report_for_unknown_escalator_creates_nothing() {
    let (cc, _clock) = setup().await;
    let entries = cc.ledger().len();
    match cc
        .call(
            "setEscalatorState",
            &args(&["ZZ0001", "false", "Stufe", "S-9", "weg"]),
        )
        .await
    {
        Err(ChaincodeError::NotFound { .. }) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert_eq!(cc.call("getTicketCounter", &[]).await.unwrap(), b"0");
    assert_eq!(cc.ledger().len(), entries);
}

#[tokio::test]
async fn racing_creations_cannot_share_an_id() {
    let ledger = MemoryLedger::new();
    let seeded = Escalator {
        escalator_id: "KI0001".to_string(),
        trainstation: "Kiel Hbf".to_string(),
        platform: "Gleis 5".to_string(),
        is_working: true,
    };
    let mut a = ledger.begin_snapshot().await.unwrap();
    let mut b = ledger.begin_snapshot().await.unwrap();
    let first = ticket::create_ticket(&ledger, &mut a, NewTicket::default_report(&seeded))
        .await
        .unwrap();
    let second = ticket::create_ticket(&ledger, &mut b, NewTicket::default_report(&seeded))
        .await
        .unwrap();
    assert_eq!(first.ticket_id, second.ticket_id);

    ledger.commit_snapshot(a).await.unwrap();
    let err: ChaincodeError = ledger.commit_snapshot(b).await.unwrap_err().into();
    assert_eq!(err.code(), "ConcurrentConflict");

    let cc = Chaincode::new(ledger);
    assert_eq!(list(&cc, "getAllTickets", &[]).await.len(), 1);
}
