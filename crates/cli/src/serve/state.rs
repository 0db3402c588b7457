//! Application state shared across request handlers.

use std::path::PathBuf;

use rolltreppe_chaincode::Chaincode;
use rolltreppe_ledger::MemoryLedger;
use tokio::sync::Mutex;

pub(crate) struct AppState {
    pub(crate) chaincode: Chaincode<MemoryLedger>,
    /// File the ledger is written back to after each committed invoke.
    pub(crate) state_file: PathBuf,
    /// Serializes writes of `state_file`.
    pub(crate) save_lock: Mutex<()>,
}

impl AppState {
    pub(crate) fn new(chaincode: Chaincode<MemoryLedger>, state_file: PathBuf) -> Self {
        Self {
            chaincode,
            state_file,
            save_lock: Mutex::new(()),
        }
    }

    /// Persist the current committed ledger contents.
    pub(crate) async fn save(&self) -> Result<(), String> {
        let _guard = self.save_lock.lock().await;
        self.chaincode
            .ledger()
            .save(&self.state_file)
            .map_err(|e| format!("could not save '{}': {}", self.state_file.display(), e))
    }
}
