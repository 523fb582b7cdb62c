//! Allowed-ERC725Y-Data-Keys restrictions
//!
//! `AddressPermissions:AllowedERC725YDataKeys:<address>` stores a
//! `CompactBytesArray` of key prefixes, 1 to 32 bytes each.

use crate::constants::MAX_DATA_KEY_PREFIX_LEN;
use alloy_primitives::{B256, Bytes};
use keyguard_types::{CompactBytesError, compact_bytes};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowedDataKeysError {
    #[error(transparent)]
    Encoding(#[from] CompactBytesError),

    #[error("prefix {index} is {length} bytes, expected 1 to 32")]
    InvalidPrefixLength { index: usize, length: usize },
}

/// Decode a stored Allowed-Data-Keys value. The empty value is the empty list.
pub fn decode(value: &[u8]) -> Result<Vec<Bytes>, AllowedDataKeysError> {
    compact_bytes::iter(value)
        .enumerate()
        .map(|(index, element)| {
            let element = element?;
            if element.is_empty() || element.len() > MAX_DATA_KEY_PREFIX_LEN {
                return Err(AllowedDataKeysError::InvalidPrefixLength {
                    index,
                    length: element.len(),
                });
            }
            Ok(Bytes::copy_from_slice(element))
        })
        .collect()
}

pub fn encode(prefixes: &[Bytes]) -> Result<Bytes, AllowedDataKeysError> {
    for (index, prefix) in prefixes.iter().enumerate() {
        if prefix.is_empty() || prefix.len() > MAX_DATA_KEY_PREFIX_LEN {
            return Err(AllowedDataKeysError::InvalidPrefixLength {
                index,
                length: prefix.len(),
            });
        }
    }
    Ok(compact_bytes::encode(prefixes)?)
}

/// True when `key` starts with one of `prefixes`
pub fn matches(prefixes: &[Bytes], key: &B256) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && key.as_slice().starts_with(prefix))
}
