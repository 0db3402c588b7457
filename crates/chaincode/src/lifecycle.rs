//! Ticket lifecycle state machine.
//!
//! A ticket moves through one fixed ladder:
//!
//! | step              | requires                              | results in                          |
//! |-------------------|---------------------------------------|-------------------------------------|
//! | `assignTicket`    | `EINGETROFFEN`                        | `ZUGEWIESEN` / Wird geprueft        |
//! | `assignMechanic`  | Wird geprueft                         | Ticket erhalten                     |
//! | `startJourney`    | Ticket erhalten                       | Techniker in Anfahrt                |
//! | `onArrival`       | Techniker in Anfahrt                  | Techniker vor Ort (+ arrival time)  |
//! | `startRepair`     | Techniker vor Ort                     | Reparatur begonnen                  |
//! | `finishRepair`    | Reparatur begonnen                    | `ERLEDIGT` / Reparatur abgeschlossen|
//! | `writeFinalReport`| `ERLEDIGT` / Reparatur abgeschlossen  | Im Abschluss (terminal)             |
//!
//! Every step is checked against the stored record before anything is
//! written, so a repeated or out-of-order command fails with
//! `IllegalTransition` and leaves the record untouched.

use rolltreppe_ledger::Ledger;

use crate::error::ChaincodeError;
use crate::sla::{self, SlaBucket};
use crate::ticket::{self, RepairStatus, Status, Ticket};
use crate::Result;

/// One workflow step together with the fields it records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Assign {
        service_provider: String,
    },
    AssignMechanic {
        employee: String,
    },
    StartJourney,
    Arrive {
        commentary: String,
        estimated_repair_time: String,
    },
    StartRepair,
    FinishRepair,
    FileFinalReport {
        report: String,
    },
}

impl Transition {
    /// Command name of this step.
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Assign { .. } => "assignTicket",
            Transition::AssignMechanic { .. } => "assignMechanic",
            Transition::StartJourney => "startJourney",
            Transition::Arrive { .. } => "onArrival",
            Transition::StartRepair => "startRepair",
            Transition::FinishRepair => "finishRepair",
            Transition::FileFinalReport { .. } => "writeFinalReport",
        }
    }

    /// The repair status the ticket holds after this step.
    pub fn target(&self) -> RepairStatus {
        match self {
            Transition::Assign { .. } => RepairStatus::WirdGeprueft,
            Transition::AssignMechanic { .. } => RepairStatus::TicketErhalten,
            Transition::StartJourney => RepairStatus::TechnikerInAnfahrt,
            Transition::Arrive { .. } => RepairStatus::TechnikerVorOrt,
            Transition::StartRepair => RepairStatus::ReparaturBegonnen,
            Transition::FinishRepair => RepairStatus::ReparaturAbgeschlossen,
            Transition::FileFinalReport { .. } => RepairStatus::ImAbschluss,
        }
    }

    /// The (status, repair status) pair the ticket must hold for this step.
    pub fn requires(&self) -> (Status, Option<RepairStatus>) {
        let from = self.target().predecessor();
        let status = match from {
            Some(rs) => rs.status(),
            None => Status::Eingetroffen,
        };
        (status, from)
    }
}

/// Apply `transition` to `ticket` in memory.
///
/// `now` is the ledger transaction time; it is recorded as the arrival or
/// final repair time where the step calls for one. On a precondition
/// mismatch the ticket is left unchanged.
pub fn apply(ticket: &mut Ticket, transition: Transition, now: i64) -> Result<()> {
    let (status, repair_status) = transition.requires();
    if ticket.status != status || ticket.repair_status != repair_status {
        return Err(ChaincodeError::IllegalTransition {
            ticket_id: ticket.ticket_id.clone(),
            current: ticket.stage_label().to_string(),
            attempted: transition.target().as_str().to_string(),
        });
    }

    let target = transition.target();
    match transition {
        Transition::Assign { service_provider } => {
            ticket.service_provider = service_provider;
        }
        Transition::AssignMechanic { employee } => {
            ticket.sp_employee = employee;
        }
        Transition::Arrive {
            commentary,
            estimated_repair_time,
        } => {
            ticket.time_of_arrival = Some(now);
            ticket.spe_commentary = commentary;
            ticket.est_repair_time = estimated_repair_time;
        }
        Transition::FinishRepair => {
            ticket.final_repair_time = Some(now);
        }
        Transition::FileFinalReport { report } => {
            ticket.final_report = report;
        }
        Transition::StartJourney | Transition::StartRepair => {}
    }
    ticket.repair_status = Some(target);
    ticket.status = target.status();
    Ok(())
}

/// Outcome of a persisted workflow step.
#[derive(Debug, Clone)]
pub struct Advanced {
    pub ticket: Ticket,
    /// SLA classification, present only for `finishRepair` on a ticket whose
    /// provider has an agreement on file.
    pub sla_bucket: Option<SlaBucket>,
}

/// Load the ticket, apply the step, write it back and, for `finishRepair`,
/// run the SLA evaluation in the same snapshot.
pub async fn advance<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    ticket_id: &str,
    transition: Transition,
) -> Result<Advanced> {
    let mut ticket = ticket::load_ticket(ledger, snapshot, ticket_id).await?;
    let now = ledger.tx_timestamp(snapshot);
    let name = transition.name();
    let finishing = matches!(transition, Transition::FinishRepair);

    apply(&mut ticket, transition, now)?;
    ticket::save_ticket(ledger, snapshot, &ticket).await?;
    tracing::info!(
        ticket_id = %ticket.ticket_id,
        step = name,
        repair_status = ticket.stage_label(),
        "ticket advanced"
    );

    let sla_bucket = if finishing {
        sla::evaluate(ledger, snapshot, &ticket).await?
    } else {
        None
    };
    Ok(Advanced { ticket, sla_bucket })
}
