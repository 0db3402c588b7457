//! Service level agreements and compliance classification.
//!
//! An agreement is keyed by the lower-cased provider name and holds two
//! deadlines (seconds from ticket creation to arrival, and to finished
//! repair) plus three grow-only counters. Each `finishRepair` on a ticket
//! whose provider has an agreement increments exactly one counter.

use std::fmt;

use rolltreppe_ledger::Ledger;
use serde::{Deserialize, Serialize};

use crate::error::{ChaincodeError, RecordKind};
use crate::store;
use crate::ticket::Ticket;
use crate::Result;

/// Grace period past the arrival deadline before a miss counts as severe.
pub const ARRIVAL_GRACE_SECS: i64 = 3 * 60 * 60;

/// Grace period past the repair deadline before a miss counts as severe.
pub const REPAIR_GRACE_SECS: i64 = 4 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceLevelAgreement {
    pub service_provider: String,
    /// Arrival deadline in seconds after ticket creation.
    pub time_to_arrive: i64,
    /// Repair deadline in seconds after ticket creation.
    pub time_to_repair: i64,
    /// Closures that met both deadlines.
    pub none: u64,
    pub light: u64,
    pub severe: u64,
}

impl ServiceLevelAgreement {
    pub fn new(service_provider: &str, time_to_arrive: i64, time_to_repair: i64) -> Self {
        Self {
            service_provider: service_provider.to_string(),
            time_to_arrive,
            time_to_repair,
            none: 0,
            light: 0,
            severe: 0,
        }
    }

    fn record(&mut self, bucket: SlaBucket) {
        match bucket {
            SlaBucket::Compliant => self.none += 1,
            SlaBucket::Light => self.light += 1,
            SlaBucket::Severe => self.severe += 1,
        }
    }
}

/// Compliance bucket of one closed ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaBucket {
    /// Both deadlines met (the `None` counter).
    Compliant,
    /// A deadline missed, but within its grace period.
    Light,
    /// A deadline missed by more than its grace period.
    Severe,
}

impl SlaBucket {
    /// Name of the counter this bucket increments.
    pub fn as_str(self) -> &'static str {
        match self {
            SlaBucket::Compliant => "None",
            SlaBucket::Light => "Light",
            SlaBucket::Severe => "Severe",
        }
    }
}

impl fmt::Display for SlaBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger key of a provider's agreement.
pub fn sla_key(service_provider: &str) -> String {
    service_provider.to_lowercase()
}

/// Classify elapsed arrival and repair times against an agreement.
///
/// Precedence: compliant if both are strictly under their deadlines, else
/// severe if either exceeds its deadline plus grace, else light. Deadlines
/// near `i64::MAX` saturate instead of wrapping.
pub fn classify(
    time_to_arrive: i64,
    time_to_repair: i64,
    sla: &ServiceLevelAgreement,
) -> SlaBucket {
    if time_to_arrive < sla.time_to_arrive && time_to_repair < sla.time_to_repair {
        SlaBucket::Compliant
    } else if time_to_arrive > sla.time_to_arrive.saturating_add(ARRIVAL_GRACE_SECS)
        || time_to_repair > sla.time_to_repair.saturating_add(REPAIR_GRACE_SECS)
    {
        SlaBucket::Severe
    } else {
        SlaBucket::Light
    }
}

/// Store a new agreement. Fails if one already exists for the provider, so
/// counters are never reset.
pub async fn create_sla<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    sla: &ServiceLevelAgreement,
) -> Result<()> {
    let key = sla_key(&sla.service_provider);
    if ledger.get_state(snapshot, &key).await?.is_some() {
        return Err(ChaincodeError::AlreadyExists {
            kind: RecordKind::Sla,
            key,
        });
    }
    store::save(ledger, snapshot, &key, sla).await?;
    tracing::info!(provider = %sla.service_provider, "service level agreement created");
    Ok(())
}

/// Evaluate a just-finished ticket against its provider's agreement and
/// bump the matching counter.
///
/// Returns `None` without touching anything when the provider has no
/// agreement on file.
pub async fn evaluate<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    ticket: &Ticket,
) -> Result<Option<SlaBucket>> {
    let key = sla_key(&ticket.service_provider);
    let Some(mut sla) = store::load_opt::<L, ServiceLevelAgreement>(ledger, snapshot, &key).await?
    else {
        tracing::debug!(
            ticket_id = %ticket.ticket_id,
            provider = %ticket.service_provider,
            "no service level agreement, evaluation skipped"
        );
        return Ok(None);
    };

    let arrived = ticket
        .time_of_arrival
        .ok_or_else(|| ChaincodeError::MissingTimestamp {
            ticket_id: ticket.ticket_id.clone(),
            field: "TimeOfArrival",
        })?;
    let repaired = ticket
        .final_repair_time
        .ok_or_else(|| ChaincodeError::MissingTimestamp {
            ticket_id: ticket.ticket_id.clone(),
            field: "FinalRepairTime",
        })?;

    let bucket = classify(arrived - ticket.timestamp, repaired - ticket.timestamp, &sla);
    sla.record(bucket);
    store::save(ledger, snapshot, &key, &sla).await?;
    tracing::info!(
        ticket_id = %ticket.ticket_id,
        provider = %sla.service_provider,
        bucket = %bucket,
        "service level evaluated"
    );
    Ok(Some(bucket))
}
