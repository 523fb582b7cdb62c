use crate::AuthError;
use alloy_primitives::{Address, B256, U256, keccak256};
use keyguard_tx::{RelayCall, high_u128, low_u128};

/// LSP25 execute-relay-call standard version, first word of every message
pub const LSP25_VERSION: u64 = 25;

/// The message a controller signs to authorize a relay call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lsp25Message<'a> {
    pub chain_id: u64,
    pub nonce: U256,
    pub validity_timestamps: U256,
    pub value: U256,
    pub payload: &'a [u8],
}

impl<'a> Lsp25Message<'a> {
    pub fn from_relay_call(chain_id: u64, call: &'a RelayCall) -> Self {
        Self {
            chain_id,
            nonce: call.nonce,
            validity_timestamps: call.validity_timestamps,
            value: call.value,
            payload: &call.payload,
        }
    }

    /// `abi.encodePacked(uint256(25), chainId, nonce, validityTimestamps, value, payload)`
    pub fn encode_packed(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(32 * 5 + self.payload.len());
        data.extend_from_slice(&U256::from(LSP25_VERSION).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        data.extend_from_slice(&self.nonce.to_be_bytes::<32>());
        data.extend_from_slice(&self.validity_timestamps.to_be_bytes::<32>());
        data.extend_from_slice(&self.value.to_be_bytes::<32>());
        data.extend_from_slice(self.payload);
        data
    }

    /// EIP-191 version 0 hash with `validator` as the intended validator:
    /// `keccak256(0x19 ‖ 0x00 ‖ validator ‖ message)`
    pub fn signing_hash(&self, validator: Address) -> B256 {
        let encoded = self.encode_packed();
        let mut data = Vec::with_capacity(2 + 20 + encoded.len());
        data.extend_from_slice(&[0x19, 0x00]);
        data.extend_from_slice(validator.as_slice());
        data.extend_from_slice(&encoded);
        keccak256(&data)
    }
}

/// Validity window of a relay call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityTimestamps {
    /// Not valid before, zero for immediately
    pub start: u128,
    /// Not valid after, zero for never expiring
    pub end: u128,
}

impl ValidityTimestamps {
    pub const fn new(start: u128, end: u128) -> Self {
        Self { start, end }
    }

    pub fn from_word(word: U256) -> Self {
        Self {
            start: high_u128(word),
            end: low_u128(word),
        }
    }

    pub fn to_word(self) -> U256 {
        keyguard_tx::pack_u128s(self.start, self.end)
    }

    /// Check `now` (unix seconds) against the window
    pub fn check(&self, now: u64) -> Result<(), AuthError> {
        let current = u128::from(now);
        if current < self.start {
            return Err(AuthError::RelayCallBeforeStartTime { start: self.start, now });
        }
        if self.end != 0 && current > self.end {
            return Err(AuthError::RelayCallExpired { end: self.end, now });
        }
        Ok(())
    }
}
