use std::fmt;

use rolltreppe_ledger::StorageError;

use crate::allocator::IdKind;

/// The kinds of record the chaincode stores in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Ticket,
    Escalator,
    Sla,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Ticket => write!(f, "ticket"),
            RecordKind::Escalator => write!(f, "escalator"),
            RecordKind::Sla => write!(f, "service level agreement"),
        }
    }
}

/// Errors returned by chaincode commands.
///
/// Errors are handed back to the caller verbatim. Nothing is retried here;
/// re-submitting a command is safe because every mutation re-checks its
/// precondition against the stored record.
#[derive(Debug, thiserror::Error)]
pub enum ChaincodeError {
    /// Wrong argument count or an argument of the wrong shape. Raised before
    /// any ledger access.
    #[error("invalid arguments for '{function}': {message}")]
    InvalidArguments { function: String, message: String },

    #[error("unknown function: '{0}'")]
    UnknownFunction(String),

    /// A key required by the command does not resolve.
    #[error("{kind} not found: '{key}'")]
    NotFound { kind: RecordKind, key: String },

    #[error("{kind} already exists: '{key}'")]
    AlreadyExists { kind: RecordKind, key: String },

    /// The ticket is not in the state the requested step starts from.
    #[error(
        "illegal transition for ticket {ticket_id}: cannot move from '{current}' to '{attempted}'"
    )]
    IllegalTransition {
        ticket_id: String,
        current: String,
        attempted: String,
    },

    #[error("invalid allocator kind: '{kind}'")]
    InvalidAllocatorKind { kind: String },

    /// The fixed-width sequence for this kind has no values left.
    #[error("{kind} id space exhausted")]
    IdSpaceExhausted { kind: IdKind },

    /// A stored record could not be decoded, or a record could not be encoded.
    #[error("malformed record under key '{key}': {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ticket {ticket_id} has no {field}")]
    MissingTimestamp {
        ticket_id: String,
        field: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ChaincodeError {
    /// Stable error name, used by the shell when rendering errors.
    pub fn code(&self) -> &'static str {
        match self {
            ChaincodeError::InvalidArguments { .. } => "InvalidArguments",
            ChaincodeError::UnknownFunction(_) => "UnknownFunction",
            ChaincodeError::NotFound { .. } => "NotFound",
            ChaincodeError::AlreadyExists { .. } => "AlreadyExists",
            ChaincodeError::IllegalTransition { .. } => "IllegalTransition",
            ChaincodeError::InvalidAllocatorKind { .. } => "InvalidAllocatorKind",
            ChaincodeError::IdSpaceExhausted { .. } => "IdSpaceExhausted",
            ChaincodeError::Encoding { .. } => "EncodingError",
            ChaincodeError::MissingTimestamp { .. } => "MissingTimestamp",
            ChaincodeError::Storage(StorageError::ConcurrentConflict { .. }) => {
                "ConcurrentConflict"
            }
            ChaincodeError::Storage(_) => "StorageError",
        }
    }

    pub(crate) fn invalid_args(function: &str, message: impl Into<String>) -> Self {
        ChaincodeError::InvalidArguments {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
