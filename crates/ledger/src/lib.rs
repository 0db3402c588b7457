//! Ledger collaborator for the Rolltreppe chaincode.
//!
//! The chaincode persists every record as a key-value pair in an external,
//! append-style ledger. This crate defines the contract such a ledger must
//! honor ([`Ledger`]), the errors it may return, an in-memory reference
//! implementation with optimistic conflict detection ([`MemoryLedger`]) and
//! a conformance suite for checking other backends.

mod clock;
pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StorageError;
pub use memory::{MemoryLedger, MemorySnapshot};
pub use record::KeyValue;
pub use traits::Ledger;
