use alloy_primitives::{Address, Bytes, U256};
use keyguard_tx::PayloadError;
use thiserror::Error;

/// Relay verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Invalid or malformed signature
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Nonce does not match the signer's channel counter
    #[error("Invalid relay nonce {nonce} for signer {signer}")]
    InvalidRelayNonce {
        signer: Address,
        nonce: U256,
        signature: Bytes,
    },

    /// Channel counter cannot be incremented any further
    #[error("Nonce channel {channel} of {signer} is exhausted")]
    NonceChannelExhausted { signer: Address, channel: u128 },

    #[error("Relay call not valid before {start} (now {now})")]
    RelayCallBeforeStartTime { start: u128, now: u64 },

    #[error("Relay call expired at {end} (now {now})")]
    RelayCallExpired { end: u128, now: u64 },

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl AuthError {
    pub fn signature_error(msg: impl Into<String>) -> Self {
        Self::InvalidSignature(msg.into())
    }

    pub fn invalid_nonce(signer: Address, nonce: U256, signature: &[u8]) -> Self {
        Self::InvalidRelayNonce {
            signer,
            nonce,
            signature: Bytes::copy_from_slice(signature),
        }
    }
}

impl From<alloy_primitives::SignatureError> for AuthError {
    fn from(err: alloy_primitives::SignatureError) -> Self {
        Self::signature_error(err.to_string())
    }
}
