//! Chaincode behavior switches.

use serde::{Deserialize, Serialize};

/// What a scan does when a record in the scanned key range does not decode
/// as a ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPolicy {
    /// Log the key and continue with the next record.
    #[default]
    Skip,
    /// Fail the whole query with an encoding error.
    Abort,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChaincodeConfig {
    #[serde(default)]
    pub scan_policy: ScanPolicy,
}

impl ChaincodeConfig {
    pub fn with_scan_policy(mut self, scan_policy: ScanPolicy) -> Self {
        self.scan_policy = scan_policy;
        self
    }
}
