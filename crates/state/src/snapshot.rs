use crate::{DataStore, MemoryStore, StateError};
use alloy_primitives::{Address, U256};
use keyguard_types::DataEntry;
use std::path::Path;

/// JSON snapshot of an account and its data store
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccountSnapshot {
    /// Account address
    pub account: Address,
    /// Current owner
    pub owner: Address,
    /// Native balance held by the account
    #[serde(default)]
    pub balance: U256,
    /// Data store entries
    #[serde(default)]
    pub data: Vec<DataEntry>,
}

impl AccountSnapshot {
    /// Capture every entry of `store`
    pub fn capture(account: Address, owner: Address, balance: U256, store: &MemoryStore) -> Self {
        Self {
            account,
            owner,
            balance,
            data: store
                .iter()
                .map(|(key, value)| DataEntry::new(*key, value.clone()))
                .collect(),
        }
    }

    /// Rebuild the data store; later entries win over earlier ones
    pub fn to_store(&self) -> MemoryStore {
        let mut store = MemoryStore::new();
        for entry in &self.data {
            store.set_data(entry.key, entry.value.clone());
        }
        store.take_events();
        store
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&raw)?;
        log::info!("Loaded account snapshot {} ({} entries) from {}", snapshot.account, snapshot.data.len(), path.display());
        Ok(snapshot)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Wrote account snapshot {} to {}", self.account, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, Bytes};

    #[test]
    fn test_snapshot_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.json");

        let mut store = MemoryStore::new();
        store.set_data(B256::repeat_byte(1), Bytes::from(vec![0xaa]));
        let snapshot = AccountSnapshot::capture(Address::with_last_byte(1), Address::with_last_byte(2), U256::from(5), &store);
        snapshot.write_to(&path).unwrap();

        let loaded = AccountSnapshot::read_from(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.to_store().get_data(&B256::repeat_byte(1)), Some(Bytes::from(vec![0xaa])));
    }

    #[test]
    fn test_missing_fields_default() {
        let json = r#"{"account":"0x0000000000000000000000000000000000000001","owner":"0x0000000000000000000000000000000000000002"}"#;
        let snapshot: AccountSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.balance, U256::ZERO);
        assert!(snapshot.to_store().is_empty());
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(AccountSnapshot::read_from(&path), Err(StateError::SerializationError(_))));
    }
}
