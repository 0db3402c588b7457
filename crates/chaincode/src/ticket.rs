//! Ticket records.
//!
//! A ticket is the single source of truth for one repair job. It is created
//! once, advanced in place by the workflow commands and never removed. The
//! stored JSON uses the field names the rest of the fleet tooling expects
//! (`TicketID`, `Trainstation`, `RepairStatus`, ...).

use std::fmt;

use rolltreppe_ledger::Ledger;
use serde::{Deserialize, Serialize};

use crate::allocator::{self, IdKind};
use crate::error::RecordKind;
use crate::escalator::Escalator;
use crate::store;
use crate::Result;

/// Ticket-level macro status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Reported, not yet handed to a service provider.
    #[serde(rename = "EINGETROFFEN")]
    Eingetroffen,
    /// Assigned to a service provider.
    #[serde(rename = "ZUGEWIESEN")]
    Zugewiesen,
    /// Repair finished.
    #[serde(rename = "ERLEDIGT")]
    Erledigt,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Eingetroffen => "EINGETROFFEN",
            Status::Zugewiesen => "ZUGEWIESEN",
            Status::Erledigt => "ERLEDIGT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained repair progress, strictly ordered from first to last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RepairStatus {
    #[serde(rename = "Wird geprueft")]
    WirdGeprueft,
    #[serde(rename = "Ticket erhalten")]
    TicketErhalten,
    #[serde(rename = "Techniker in Anfahrt")]
    TechnikerInAnfahrt,
    #[serde(rename = "Techniker vor Ort")]
    TechnikerVorOrt,
    #[serde(rename = "Reparatur begonnen")]
    ReparaturBegonnen,
    #[serde(rename = "Reparatur abgeschlossen")]
    ReparaturAbgeschlossen,
    #[serde(rename = "Im Abschluss")]
    ImAbschluss,
}

impl RepairStatus {
    /// The full ladder in order.
    pub const LADDER: [RepairStatus; 7] = [
        RepairStatus::WirdGeprueft,
        RepairStatus::TicketErhalten,
        RepairStatus::TechnikerInAnfahrt,
        RepairStatus::TechnikerVorOrt,
        RepairStatus::ReparaturBegonnen,
        RepairStatus::ReparaturAbgeschlossen,
        RepairStatus::ImAbschluss,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RepairStatus::WirdGeprueft => "Wird geprueft",
            RepairStatus::TicketErhalten => "Ticket erhalten",
            RepairStatus::TechnikerInAnfahrt => "Techniker in Anfahrt",
            RepairStatus::TechnikerVorOrt => "Techniker vor Ort",
            RepairStatus::ReparaturBegonnen => "Reparatur begonnen",
            RepairStatus::ReparaturAbgeschlossen => "Reparatur abgeschlossen",
            RepairStatus::ImAbschluss => "Im Abschluss",
        }
    }

    /// The rung directly below this one; `None` for the first rung, which is
    /// entered from an unassigned ticket.
    pub fn predecessor(self) -> Option<RepairStatus> {
        let idx = Self::LADDER.iter().position(|s| *s == self)?;
        idx.checked_sub(1).map(|i| Self::LADDER[i])
    }

    /// The macro status a ticket carries while on this rung.
    pub fn status(self) -> Status {
        match self {
            RepairStatus::ReparaturAbgeschlossen | RepairStatus::ImAbschluss => Status::Erledigt,
            _ => Status::Zugewiesen,
        }
    }
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repair ticket as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ticket {
    #[serde(rename = "TicketID")]
    pub ticket_id: String,
    /// Ledger transaction time at creation, epoch seconds.
    pub timestamp: i64,
    pub trainstation: String,
    pub platform: String,
    /// Escalator ID or a free-text device description.
    pub device: String,
    pub status: Status,
    #[serde(default)]
    pub repair_status: Option<RepairStatus>,
    pub tech_part: String,
    #[serde(rename = "ErrorID")]
    pub error_id: String,
    pub error_message: String,
    #[serde(default)]
    pub service_provider: String,
    /// Mechanic assigned by the service provider.
    #[serde(default)]
    pub sp_employee: String,
    #[serde(default)]
    pub spe_commentary: String,
    #[serde(default)]
    pub est_repair_time: String,
    /// Set once, when the mechanic reports arrival.
    #[serde(default)]
    pub time_of_arrival: Option<i64>,
    /// Set once, when the repair is reported finished.
    #[serde(default)]
    pub final_repair_time: Option<i64>,
    #[serde(default)]
    pub final_report: String,
}

impl Ticket {
    /// Label of the furthest state the ticket has reached: the repair status
    /// once assigned, the macro status before that.
    pub fn stage_label(&self) -> &'static str {
        match self.repair_status {
            Some(rs) => rs.as_str(),
            None => self.status.as_str(),
        }
    }
}

/// Caller-supplied fields for a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub trainstation: String,
    pub platform: String,
    pub device: String,
    pub tech_part: String,
    pub error_id: String,
    pub error_message: String,
}

impl NewTicket {
    /// Canned motor failure at `escalator`, used by `createDefaultTicket`
    /// for smoke testing a deployment.
    pub fn default_report(escalator: &Escalator) -> Self {
        Self {
            trainstation: escalator.trainstation.clone(),
            platform: escalator.platform.clone(),
            device: escalator.escalator_id.clone(),
            tech_part: "Motor RTM-X 64".to_string(),
            error_id: "#2356-102".to_string(),
            error_message: "Totalausfall".to_string(),
        }
    }
}

/// Allocate an ID and persist a fresh ticket stamped with the snapshot's
/// transaction time.
pub async fn create_ticket<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    new: NewTicket,
) -> Result<Ticket> {
    let ticket_id = allocator::next_id(ledger, snapshot, IdKind::Ticket).await?;
    let ticket = Ticket {
        ticket_id,
        timestamp: ledger.tx_timestamp(snapshot),
        trainstation: new.trainstation,
        platform: new.platform,
        device: new.device,
        status: Status::Eingetroffen,
        repair_status: None,
        tech_part: new.tech_part,
        error_id: new.error_id,
        error_message: new.error_message,
        service_provider: String::new(),
        sp_employee: String::new(),
        spe_commentary: String::new(),
        est_repair_time: String::new(),
        time_of_arrival: None,
        final_repair_time: None,
        final_report: String::new(),
    };
    save_ticket(ledger, snapshot, &ticket).await?;
    tracing::info!(
        ticket_id = %ticket.ticket_id,
        station = %ticket.trainstation,
        device = %ticket.device,
        "ticket created"
    );
    Ok(ticket)
}

pub async fn load_ticket<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    ticket_id: &str,
) -> Result<Ticket> {
    store::load(ledger, snapshot, RecordKind::Ticket, ticket_id).await
}

pub async fn save_ticket<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    ticket: &Ticket,
) -> Result<()> {
    store::save(ledger, snapshot, &ticket.ticket_id, ticket).await
}
