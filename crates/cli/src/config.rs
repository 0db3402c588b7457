//! `rolltreppe.toml` settings.
//!
//! Every section and key is optional; missing values fall back to the
//! defaults below. Command line flags are applied on top by `main`.

use std::path::{Path, PathBuf};

use rolltreppe_chaincode::{ChaincodeConfig, ScanPolicy};
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "rolltreppe.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) ledger: LedgerSettings,
    pub(crate) scan: ScanSettings,
    pub(crate) server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LedgerSettings {
    /// JSON file the ledger is loaded from and saved to.
    pub(crate) state_file: PathBuf,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("rolltreppe-ledger.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ScanSettings {
    /// What to do with records that do not decode during a ticket scan.
    pub(crate) malformed: ScanPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ServerSettings {
    pub(crate) port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Settings {
    /// Load settings from `explicit` if given (the file must exist), else
    /// from `./rolltreppe.toml` if present, else defaults.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Settings, String> {
        match explicit {
            Some(path) => read_settings(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    read_settings(path)
                } else {
                    Ok(Settings::default())
                }
            }
        }
    }

    pub(crate) fn chaincode_config(&self) -> ChaincodeConfig {
        ChaincodeConfig::default().with_scan_policy(self.scan.malformed)
    }
}

fn read_settings(path: &Path) -> Result<Settings, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}
