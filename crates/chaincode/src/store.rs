//! JSON record encoding on top of raw ledger bytes.

use rolltreppe_ledger::Ledger;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ChaincodeError, RecordKind};
use crate::Result;

/// Read and decode the record under `key`; absent keys are `NotFound`.
pub(crate) async fn load<L, T>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    kind: RecordKind,
    key: &str,
) -> Result<T>
where
    L: Ledger,
    T: DeserializeOwned,
{
    let bytes = load_raw(ledger, snapshot, kind, key).await?;
    decode(key, &bytes)
}

/// Read the raw bytes under `key`; absent keys are `NotFound`.
pub(crate) async fn load_raw<L: Ledger>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    kind: RecordKind,
    key: &str,
) -> Result<Vec<u8>> {
    ledger
        .get_state(snapshot, key)
        .await?
        .ok_or_else(|| ChaincodeError::NotFound {
            kind,
            key: key.to_string(),
        })
}

/// Read and decode the record under `key`, `None` if absent.
pub(crate) async fn load_opt<L, T>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    key: &str,
) -> Result<Option<T>>
where
    L: Ledger,
    T: DeserializeOwned,
{
    match ledger.get_state(snapshot, key).await? {
        Some(bytes) => decode(key, &bytes).map(Some),
        None => Ok(None),
    }
}

pub(crate) async fn save<L, T>(
    ledger: &L,
    snapshot: &mut L::Snapshot,
    key: &str,
    record: &T,
) -> Result<()>
where
    L: Ledger,
    T: Serialize,
{
    let bytes = serde_json::to_vec(record).map_err(|source| ChaincodeError::Encoding {
        key: key.to_string(),
        source,
    })?;
    ledger.put_state(snapshot, key, bytes).await?;
    Ok(())
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| ChaincodeError::Encoding {
        key: key.to_string(),
        source,
    })
}
