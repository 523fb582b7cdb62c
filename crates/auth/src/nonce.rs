use crate::AuthError;
use alloy_primitives::{Address, U256};
use keyguard_tx::{high_u128, low_u128, pack_u128s};
use std::collections::HashMap;

/// Per-signer relay nonces, split into independent channels
///
/// A nonce is `(channel << 128) | counter`. Each channel counts on its own, so
/// relay calls signed on different channels can be executed in any order
/// while calls on the same channel execute strictly in sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonceStore {
    counters: HashMap<(Address, u128), u128>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next valid nonce of `signer` on `channel`
    pub fn get_nonce(&self, signer: Address, channel: u128) -> U256 {
        pack_u128s(channel, self.counter(signer, channel))
    }

    fn counter(&self, signer: Address, channel: u128) -> u128 {
        self.counters.get(&(signer, channel)).copied().unwrap_or_default()
    }

    /// True when `nonce` is the next nonce of its channel
    pub fn is_valid_nonce(&self, signer: Address, nonce: U256) -> bool {
        low_u128(nonce) == self.counter(signer, high_u128(nonce))
    }

    /// Consume `nonce`, advancing its channel
    pub fn consume(&mut self, signer: Address, nonce: U256, signature: &[u8]) -> Result<(), AuthError> {
        if !self.is_valid_nonce(signer, nonce) {
            return Err(AuthError::invalid_nonce(signer, nonce, signature));
        }

        let channel = high_u128(nonce);
        let counter = self.counters.entry((signer, channel)).or_default();
        *counter = counter
            .checked_add(1)
            .ok_or(AuthError::NonceChannelExhausted { signer, channel })?;
        Ok(())
    }
}
