//! Ticket queries.
//!
//! The ledger has no secondary indexes, so every query is a range scan over
//! the ticket key space followed by an in-memory predicate. All predicate
//! logic lives in [`TicketFilter`]; swapping in an indexed store only has to
//! change [`scan_range`].

use rolltreppe_ledger::Ledger;

use crate::allocator::{self, IdKind};
use crate::config::ScanPolicy;
use crate::store;
use crate::ticket::{RepairStatus, Ticket};
use crate::Result;

/// First key of the ticket key space.
pub const FIRST_TICKET_KEY: &str = "0001";

/// Predicate applied to every scanned ticket. String comparisons ignore case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketFilter {
    /// Every ticket.
    All,
    /// Exact `Status`, optionally also exact `ServiceProvider`.
    Status {
        status: String,
        service_provider: Option<String>,
    },
    ServiceProvider(String),
    /// Exact provider and mechanic pair.
    Mechanic {
        service_provider: String,
        employee: String,
    },
    /// Mechanic on site or repairing.
    WorkInProgress(String),
    /// Mechanic assigned or travelling, not yet on site.
    AssignedNotVisited(String),
    /// Assigned to the provider, still under review.
    NewForProvider(String),
}

fn same(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let provider_is = |p: &str| same(&ticket.service_provider, p);
        let stage_in = |wanted: &[RepairStatus]| {
            ticket
                .repair_status
                .map(|rs| wanted.contains(&rs))
                .unwrap_or(false)
        };
        match self {
            TicketFilter::All => true,
            TicketFilter::Status {
                status,
                service_provider,
            } => {
                same(ticket.status.as_str(), status)
                    && service_provider.as_deref().map_or(true, provider_is)
            }
            TicketFilter::ServiceProvider(p) => provider_is(p),
            TicketFilter::Mechanic {
                service_provider,
                employee,
            } => provider_is(service_provider) && same(&ticket.sp_employee, employee),
            TicketFilter::WorkInProgress(p) => {
                provider_is(p)
                    && stage_in(&[
                        RepairStatus::ReparaturBegonnen,
                        RepairStatus::TechnikerVorOrt,
                    ])
            }
            TicketFilter::AssignedNotVisited(p) => {
                provider_is(p)
                    && stage_in(&[
                        RepairStatus::TechnikerInAnfahrt,
                        RepairStatus::TicketErhalten,
                    ])
            }
            TicketFilter::NewForProvider(p) => {
                provider_is(p) && stage_in(&[RepairStatus::WirdGeprueft])
            }
        }
    }
}

/// Scan `[start, end)` and return the stored bytes of every matching ticket
/// in key order.
///
/// Records that do not decode as tickets are skipped with a warning under
/// [`ScanPolicy::Skip`] and fail the scan under [`ScanPolicy::Abort`].
pub async fn scan_range<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    start: &str,
    end: &str,
    filter: &TicketFilter,
    policy: ScanPolicy,
) -> Result<Vec<Vec<u8>>> {
    let entries = ledger.range_scan(snapshot, start, end).await?;
    let scanned = entries.len();
    let mut matched = Vec::new();
    for entry in entries {
        let ticket: Ticket = match store::decode(&entry.key, &entry.value) {
            Ok(ticket) => ticket,
            Err(e) => match policy {
                ScanPolicy::Skip => {
                    tracing::warn!(key = %entry.key, error = %e, "skipping malformed record");
                    continue;
                }
                ScanPolicy::Abort => return Err(e),
            },
        };
        if filter.matches(&ticket) {
            matched.push(entry.value);
        }
    }
    tracing::debug!(start, end, scanned, matched = matched.len(), "ticket scan");
    Ok(matched)
}

/// Scan every allocated ticket ID.
pub async fn scan_all<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    filter: &TicketFilter,
    policy: ScanPolicy,
) -> Result<Vec<Vec<u8>>> {
    let counter = allocator::current(ledger, snapshot, IdKind::Ticket).await?;
    if counter == 0 {
        return Ok(Vec::new());
    }
    // The end bound sorts directly after the last allocated ID.
    let end = format!("{}\0", allocator::format_sequence(counter));
    scan_range(ledger, snapshot, FIRST_TICKET_KEY, &end, filter, policy).await
}

/// Join stored JSON records into one JSON array, keeping their bytes as-is.
pub fn to_json_array(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + records.iter().map(|r| r.len() + 1).sum::<usize>());
    out.push(b'[');
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(record);
    }
    out.push(b']');
    out
}
