//! Rolltreppe chaincode -- repair ticket workflow for a fleet of station
//! escalators, persisted as key-value records in an external ledger.
//!
//! The crate is layered leaf-first:
//!
//! - [`allocator`]: fixed-width sequential IDs whose string order matches
//!   their numeric order
//! - [`escalator`]: device registry; a failure report opens a ticket
//! - [`ticket`] + [`lifecycle`]: ticket records and the forward-only
//!   status / repair-status state machine
//! - [`sla`]: per-provider arrival and repair deadlines, violation tallies
//! - [`query`]: range scans over the ticket key space with in-memory
//!   predicates, standing in for the secondary indexes the ledger lacks
//! - [`contract`]: the command surface (function name + string arguments)
//!
//! Every command runs inside one ledger snapshot and either commits as a
//! whole or leaves the ledger untouched.

pub mod allocator;
pub mod command;
pub mod config;
pub mod contract;
pub mod error;
pub mod escalator;
pub mod lifecycle;
pub mod query;
pub mod sla;
mod store;
pub mod ticket;

pub use command::Command;
pub use config::{ChaincodeConfig, ScanPolicy};
pub use contract::Chaincode;
pub use error::{ChaincodeError, RecordKind};
pub use escalator::Escalator;
pub use lifecycle::Transition;
pub use query::TicketFilter;
pub use sla::{ServiceLevelAgreement, SlaBucket};
pub use ticket::{NewTicket, RepairStatus, Status, Ticket};

pub type Result<T> = std::result::Result<T, ChaincodeError>;
