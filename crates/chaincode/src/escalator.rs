//! Escalator registry.
//!
//! Escalators are looked up by exact key only, never range-scanned, so their
//! station prefix is free to break global key ordering.

use rolltreppe_ledger::Ledger;
use serde::{Deserialize, Serialize};

use crate::allocator::{self, IdKind};
use crate::error::{ChaincodeError, RecordKind};
use crate::store;
use crate::ticket::{self, NewTicket, Ticket};
use crate::Result;

/// Station of the escalator seeded into a fresh ledger.
pub const DEFAULT_STATION: &str = "Kiel Hbf";
pub const DEFAULT_PLATFORM: &str = "Gleis 5";
/// ID the seeded escalator receives on a fresh ledger.
pub const DEFAULT_ESCALATOR_ID: &str = "KI0001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Escalator {
    #[serde(rename = "EscalatorID")]
    pub escalator_id: String,
    pub trainstation: String,
    pub platform: String,
    pub is_working: bool,
}

/// Fault description attached to a broken-escalator report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub tech_part: String,
    pub error_id: String,
    pub error_message: String,
}

/// Requested working state of an escalator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalatorState {
    Working,
    Broken(Fault),
}

/// Register a new, working escalator.
pub async fn create_escalator<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    station: &str,
    platform: &str,
) -> Result<Escalator> {
    let sequence = allocator::next_id(ledger, snapshot, IdKind::Escalator).await?;
    let escalator_id = allocator::escalator_id(station, &sequence).ok_or_else(|| {
        ChaincodeError::invalid_args(
            "createEscalator",
            format!("station name '{}' is shorter than two characters", station),
        )
    })?;
    let escalator = Escalator {
        escalator_id,
        trainstation: station.to_string(),
        platform: platform.to_string(),
        is_working: true,
    };
    store::save(ledger, snapshot, &escalator.escalator_id, &escalator).await?;
    tracing::info!(escalator_id = %escalator.escalator_id, station, "escalator registered");
    Ok(escalator)
}

pub async fn load_escalator<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    escalator_id: &str,
) -> Result<Escalator> {
    store::load(ledger, snapshot, RecordKind::Escalator, escalator_id).await
}

/// Set the working state. Reporting a failure opens a ticket for the
/// escalator in the same snapshot and returns it.
pub async fn set_state<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    escalator_id: &str,
    state: EscalatorState,
) -> Result<Option<Ticket>> {
    let mut escalator = load_escalator(ledger, snapshot, escalator_id).await?;
    match state {
        EscalatorState::Working => {
            escalator.is_working = true;
            store::save(ledger, snapshot, escalator_id, &escalator).await?;
            tracing::info!(escalator_id, "escalator reported working");
            Ok(None)
        }
        EscalatorState::Broken(fault) => {
            escalator.is_working = false;
            store::save(ledger, snapshot, escalator_id, &escalator).await?;
            let ticket = ticket::create_ticket(
                ledger,
                snapshot,
                NewTicket {
                    trainstation: escalator.trainstation.clone(),
                    platform: escalator.platform.clone(),
                    device: escalator.escalator_id.clone(),
                    tech_part: fault.tech_part,
                    error_id: fault.error_id,
                    error_message: fault.error_message,
                },
            )
            .await?;
            tracing::warn!(
                escalator_id,
                ticket_id = %ticket.ticket_id,
                "escalator reported broken"
            );
            Ok(Some(ticket))
        }
    }
}

/// Seed the default escalator on a ledger that has never allocated one.
///
/// Returns `None` when escalators already exist.
pub async fn seed_default<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
) -> Result<Option<Escalator>> {
    if ledger
        .get_state(snapshot, allocator::ESCALATOR_COUNTER_KEY)
        .await?
        .is_some()
    {
        return Ok(None);
    }
    create_escalator(ledger, snapshot, DEFAULT_STATION, DEFAULT_PLATFORM)
        .await
        .map(Some)
}
