//! Sequential ID allocation.
//!
//! Each kind of ID has one persisted counter key. Allocation reads the
//! counter, increments it and writes it back inside the caller's snapshot;
//! two snapshots racing on the same counter are arbitrated by the ledger's
//! commit-time conflict check, not by any lock here.
//!
//! IDs are rendered as fixed-width, zero-padded decimals so that their byte
//! order equals their numeric order (`"0002" < "0010"`). The ticket query
//! layer depends on this to range-scan tickets in creation order.

use std::fmt;
use std::str::FromStr;

use rolltreppe_ledger::Ledger;

use crate::error::ChaincodeError;
use crate::Result;

/// Width of the numeric part of every allocated ID.
pub const ID_WIDTH: usize = 4;

/// Largest sequence value that still fits in [`ID_WIDTH`] digits.
pub const MAX_SEQUENCE: u32 = 9_999;

pub const TICKET_COUNTER_KEY: &str = "ticketCounter";
pub const ESCALATOR_COUNTER_KEY: &str = "escalatorCounter";

/// The kinds of identifier the allocator hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Ticket,
    Escalator,
}

impl IdKind {
    pub fn counter_key(self) -> &'static str {
        match self {
            IdKind::Ticket => TICKET_COUNTER_KEY,
            IdKind::Escalator => ESCALATOR_COUNTER_KEY,
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::Ticket => write!(f, "ticket"),
            IdKind::Escalator => write!(f, "escalator"),
        }
    }
}

impl FromStr for IdKind {
    type Err = ChaincodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ticket" => Ok(IdKind::Ticket),
            "escalator" => Ok(IdKind::Escalator),
            other => Err(ChaincodeError::InvalidAllocatorKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Render a sequence value as a fixed-width key.
pub fn format_sequence(value: u32) -> String {
    format!("{:0width$}", value, width = ID_WIDTH)
}

/// Read the current counter value. Missing or unreadable state counts as zero.
pub async fn current<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    kind: IdKind,
) -> Result<u32> {
    let raw = ledger.get_state(snapshot, kind.counter_key()).await?;
    Ok(raw
        .as_deref()
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0))
}

/// Allocate the next ID for the kind named `kind` (`"ticket"` or `"escalator"`).
///
/// An unrecognized kind fails with `InvalidAllocatorKind` before the ledger
/// is touched.
pub async fn allocate<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    kind: &str,
) -> Result<String> {
    let kind = kind.parse::<IdKind>()?;
    next_id(ledger, snapshot, kind).await
}

/// Increment the counter for `kind` and return the new value as a
/// fixed-width string.
pub async fn next_id<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    kind: IdKind,
) -> Result<String> {
    let next = match current(ledger, snapshot, kind).await?.checked_add(1) {
        Some(next) if next <= MAX_SEQUENCE => next,
        _ => return Err(ChaincodeError::IdSpaceExhausted { kind }),
    };
    ledger
        .put_state(snapshot, kind.counter_key(), next.to_string().into_bytes())
        .await?;
    let id = format_sequence(next);
    tracing::debug!(kind = %kind, id = %id, "allocated id");
    Ok(id)
}

/// Build an escalator ID: upper-cased first two characters of the station
/// name followed by the allocated sequence.
pub fn escalator_id(station: &str, sequence: &str) -> Option<String> {
    let station = station.trim();
    if station.chars().count() < 2 {
        return None;
    }
    let prefix: String = station.to_uppercase().chars().take(2).collect();
    Some(format!("{}{}", prefix, sequence))
}
