// Re-export Alloy primitives as the main types
pub use alloy_primitives::{Address, B256, Bytes, FixedBytes, Signature, U256};

// Module exports
pub mod compact_bytes;
pub mod data_keys;
pub mod permissions;

// Re-export commonly used types
pub use compact_bytes::CompactBytesError;
pub use data_keys::{DataKeyClass, KeyShape, classify};
pub use permissions::Permissions;

/// 4-byte function selector
pub type Selector = FixedBytes<4>;

/// A key/value pair written to an account's data store
#[keyguard_macros::standard]
pub struct DataEntry {
    pub key: B256,
    pub value: Bytes,
}

impl DataEntry {
    pub fn new(key: B256, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Selector of `data`, or `0x00000000` when shorter than 4 bytes
pub fn selector_of(data: &[u8]) -> Selector {
    data.get(..4).map(Selector::from_slice).unwrap_or_default()
}
