use alloy_primitives::{Address, B256, Bytes};
use thiserror::Error;

/// Data store and registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("AddressPermissions[] length must be 16 bytes, got {0}")]
    MalformedArrayLength(Bytes),

    #[error("AddressPermissions[] entry at {key} is not an address: {value}")]
    MalformedArrayEntry { key: B256, value: Bytes },

    #[error("AddressPermissions[] length is already at its maximum")]
    ArrayLengthOverflow,

    #[error("{0} is not listed in AddressPermissions[]")]
    ControllerNotListed(Address),

    #[error("Checkpoint {0} is not the innermost open checkpoint")]
    InvalidCheckpoint(usize),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for StateError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}
