pub mod abi;
mod error;
mod types;

pub use abi::{decode_calldata, encode_calldata, encode_execute_batch, encode_return_data, function_selector};
pub use error::*;
pub use types::*;

// Re-export shared primitives
pub use keyguard_types::{Address, B256, Bytes, DataEntry, Selector, U256, selector_of};

use serde::{Deserialize, Serialize};

/// Largest payload accepted in a relay call
pub const MAX_PAYLOAD_SIZE: usize = 128 * 1024;

/// A meta-transaction signed by a controller and submitted by anyone
///
/// The signer authorizes `payload` to be executed on the account through the
/// key manager; the relayer pays for it and forwards `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCall {
    /// Signature bytes (65 bytes: r[32] + s[32] + v[1])
    #[serde(with = "signature_serde")]
    pub signature: [u8; 65],
    /// `(channel << 128) | counter`
    pub nonce: U256,
    /// `(start << 128) | end`, zero for no restriction
    pub validity_timestamps: U256,
    /// Native value sent along with the call
    pub value: U256,
    /// ERC725 calldata to execute
    pub payload: Bytes,
}

mod signature_serde {
    use alloy_primitives::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8; 65], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Bytes::copy_from_slice(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 65], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Bytes::deserialize(deserializer)?;
        <[u8; 65]>::try_from(bytes.as_ref()).map_err(|_| {
            serde::de::Error::custom(format!(
                "Invalid signature length: expected 65, got {}",
                bytes.len()
            ))
        })
    }
}

impl RelayCall {
    /// Create an unsigned relay call
    pub fn new(nonce: U256, validity_timestamps: U256, value: U256, payload: impl Into<Bytes>) -> Self {
        Self {
            signature: [0u8; 65],
            nonce,
            validity_timestamps,
            value,
            payload: payload.into(),
        }
    }

    /// Set signature bytes
    pub fn set_signature(&mut self, sig: [u8; 65]) {
        self.signature = sig;
    }

    /// Get signature bytes
    pub fn signature(&self) -> &[u8; 65] {
        &self.signature
    }

    /// Nonce channel, the high 128 bits of the nonce
    pub fn channel(&self) -> u128 {
        high_u128(self.nonce)
    }

    /// Reject oversized payloads before any signature work
    pub fn check_size(&self) -> Result<(), PayloadError> {
        // SECURITY: Prevent DoS by limiting payload size
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PayloadError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(())
    }
}

/// Upper 128 bits of a word
pub fn high_u128(word: U256) -> u128 {
    let bytes = word.to_be_bytes::<32>();
    let mut high = [0u8; 16];
    high.copy_from_slice(&bytes[..16]);
    u128::from_be_bytes(high)
}

/// Lower 128 bits of a word
pub fn low_u128(word: U256) -> u128 {
    let bytes = word.to_be_bytes::<32>();
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..]);
    u128::from_be_bytes(low)
}

/// Pack two halves into `(high << 128) | low`
pub fn pack_u128s(high: u128, low: u128) -> U256 {
    (U256::from(high) << 128) | U256::from(low)
}
