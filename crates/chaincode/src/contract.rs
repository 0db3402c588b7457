//! The command surface.
//!
//! Every call parses its arguments, opens one ledger snapshot, runs the
//! command against it and then commits (mutating commands) or aborts
//! (read-only commands, and any failure). Nothing is retried here.

use rolltreppe_ledger::Ledger;

use crate::allocator::{self, IdKind};
use crate::command::Command;
use crate::config::ChaincodeConfig;
use crate::error::{ChaincodeError, RecordKind};
use crate::escalator::{self, Escalator};
use crate::lifecycle;
use crate::query::{self, TicketFilter};
use crate::sla::{self, ServiceLevelAgreement};
use crate::store;
use crate::ticket::{self, NewTicket, Ticket};
use crate::Result;

pub struct Chaincode<L: Ledger> {
    ledger: L,
    config: ChaincodeConfig,
}

impl<L: Ledger> Chaincode<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            config: ChaincodeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ChaincodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &ChaincodeConfig {
        &self.config
    }

    /// Seed a fresh ledger with the default escalator and a zeroed ticket
    /// counter. Returns `false` when the ledger was already initialized.
    pub async fn init(&self) -> Result<bool> {
        let mut snapshot = self.ledger.begin_snapshot().await?;
        let outcome = self.seed(&mut snapshot).await;

        match outcome {
            Ok(Some(seeded)) => {
                self.ledger.commit_snapshot(snapshot).await?;
                tracing::info!(escalator_id = %seeded.escalator_id, "ledger initialized");
                Ok(true)
            }
            Ok(None) => {
                self.ledger.abort_snapshot(snapshot).await?;
                tracing::debug!("ledger already initialized");
                Ok(false)
            }
            Err(e) => {
                self.abort_quietly(snapshot, "init", &e).await;
                Err(e)
            }
        }
    }

    async fn seed(&self, snapshot: &mut L::Snapshot) -> Result<Option<Escalator>> {
        let counter = allocator::TICKET_COUNTER_KEY;
        if self.ledger.get_state(snapshot, counter).await?.is_none() {
            self.ledger.put_state(snapshot, counter, b"0".to_vec()).await?;
        }
        escalator::seed_default(&self.ledger, snapshot).await
    }

    /// Run any command.
    pub async fn call(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        let command = Command::parse(function, args)?;
        self.execute(function, command).await
    }

    /// Run a mutating command; read-only commands are rejected.
    pub async fn invoke(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        let command = Command::parse(function, args)?;
        if command.is_read_only() {
            return Err(ChaincodeError::invalid_args(
                function,
                "read-only function must be run as a query",
            ));
        }
        self.execute(function, command).await
    }

    /// Run a read-only command; mutating commands are rejected.
    pub async fn query(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        let command = Command::parse(function, args)?;
        if !command.is_read_only() {
            return Err(ChaincodeError::invalid_args(
                function,
                "mutating function must be run as an invoke",
            ));
        }
        self.execute(function, command).await
    }

    async fn execute(&self, function: &str, command: Command) -> Result<Vec<u8>> {
        let read_only = command.is_read_only();
        let mut snapshot = self.ledger.begin_snapshot().await?;
        tracing::debug!(function, read_only, "executing command");

        match self.dispatch(&mut snapshot, command).await {
            Ok(payload) => {
                if read_only {
                    self.ledger.abort_snapshot(snapshot).await?;
                } else {
                    self.ledger.commit_snapshot(snapshot).await?;
                }
                Ok(payload)
            }
            Err(e) => {
                self.abort_quietly(snapshot, function, &e).await;
                Err(e)
            }
        }
    }

    async fn abort_quietly(&self, snapshot: L::Snapshot, function: &str, cause: &ChaincodeError) {
        tracing::warn!(function, error = %cause, "command failed, snapshot aborted");
        if let Err(e) = self.ledger.abort_snapshot(snapshot).await {
            tracing::warn!(function, error = %e, "abort failed");
        }
    }

    async fn dispatch(&self, snapshot: &mut L::Snapshot, command: Command) -> Result<Vec<u8>> {
        let ledger = &self.ledger;
        let policy = self.config.scan_policy;

        match command {
            // ── Mutating ──────────────────────────────────────────────────────
            Command::CreateEscalator { station, platform } => {
                let created =
                    escalator::create_escalator(ledger, snapshot, &station, &platform).await?;
                Ok(created.escalator_id.into_bytes())
            }
            Command::SetEscalatorState {
                escalator_id,
                state,
            } => {
                let opened = escalator::set_state(ledger, snapshot, &escalator_id, state).await?;
                Ok(opened.map(|t| t.ticket_id.into_bytes()).unwrap_or_default())
            }
            Command::CreateSla {
                service_provider,
                time_to_arrive,
                time_to_repair,
            } => {
                let agreement =
                    ServiceLevelAgreement::new(&service_provider, time_to_arrive, time_to_repair);
                sla::create_sla(ledger, snapshot, &agreement).await?;
                Ok(Vec::new())
            }
            Command::CreateTicket(new) => {
                let created = ticket::create_ticket(ledger, snapshot, new).await?;
                Ok(created.ticket_id.into_bytes())
            }
            Command::CreateDefaultTicket => {
                let seeded =
                    escalator::load_escalator(ledger, snapshot, escalator::DEFAULT_ESCALATOR_ID)
                        .await?;
                let report = NewTicket::default_report(&seeded);
                let created = ticket::create_ticket(ledger, snapshot, report).await?;
                Ok(created.ticket_id.into_bytes())
            }
            Command::Advance {
                ticket_id,
                transition,
            } => {
                lifecycle::advance(ledger, snapshot, &ticket_id, transition).await?;
                Ok(Vec::new())
            }

            // ── Point reads ───────────────────────────────────────────────────
            Command::GetFullTicket(id) => {
                // Served as stored, but only once it decodes as a ticket.
                let raw = store::load_raw(ledger, snapshot, RecordKind::Ticket, &id).await?;
                store::decode::<Ticket>(&id, &raw)?;
                Ok(raw)
            }
            Command::GetTicketCounter => {
                let value = allocator::current(ledger, snapshot, IdKind::Ticket).await?;
                Ok(value.to_string().into_bytes())
            }
            Command::GetEscalatorState(id) => {
                store::load_raw(ledger, snapshot, RecordKind::Escalator, &id).await
            }
            Command::GetSla(provider) => {
                store::load_raw(ledger, snapshot, RecordKind::Sla, &sla::sla_key(&provider)).await
            }

            // ── Scans ─────────────────────────────────────────────────────────
            Command::GetTicketsByRange { start, end } => {
                let found =
                    query::scan_range(ledger, snapshot, &start, &end, &TicketFilter::All, policy)
                        .await?;
                Ok(query::to_json_array(&found))
            }
            Command::GetAllTickets => self.scan(snapshot, TicketFilter::All).await,
            Command::GetTicketsByStatus {
                status,
                service_provider,
            } => {
                self.scan(
                    snapshot,
                    TicketFilter::Status {
                        status,
                        service_provider,
                    },
                )
                .await
            }
            Command::GetTicketsByServiceProvider(p) => {
                self.scan(snapshot, TicketFilter::ServiceProvider(p)).await
            }
            Command::GetTicketsByMechanic {
                service_provider,
                employee,
            } => {
                self.scan(
                    snapshot,
                    TicketFilter::Mechanic {
                        service_provider,
                        employee,
                    },
                )
                .await
            }
            Command::GetAssignedSpTickets(p) => {
                self.scan(snapshot, TicketFilter::AssignedNotVisited(p)).await
            }
            Command::GetWipTickets(p) => self.scan(snapshot, TicketFilter::WorkInProgress(p)).await,
            Command::GetNewSpTickets(p) => {
                self.scan(snapshot, TicketFilter::NewForProvider(p)).await
            }
        }
    }

    async fn scan(&self, snapshot: &mut L::Snapshot, filter: TicketFilter) -> Result<Vec<u8>> {
        let found =
            query::scan_all(&self.ledger, snapshot, &filter, self.config.scan_policy).await?;
        Ok(query::to_json_array(&found))
    }
}
