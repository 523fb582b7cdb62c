mod error;
mod lsp25;
mod nonce;
mod signer;

pub use error::AuthError;
pub use lsp25::{LSP25_VERSION, Lsp25Message, ValidityTimestamps};
pub use nonce::NonceStore;
pub use signer::RelaySigner;

use alloy_primitives::{Address, B256, Signature};
use keyguard_tx::RelayCall;

/// Verifies LSP25 relay calls addressed to one key manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayVerifier {
    /// Key manager address, the EIP-191 intended validator
    key_manager: Address,
    chain_id: u64,
}

impl RelayVerifier {
    pub const fn new(key_manager: Address, chain_id: u64) -> Self {
        Self { key_manager, chain_id }
    }

    pub const fn key_manager(&self) -> Address {
        self.key_manager
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Hash the controller signs for `call`
    pub fn signing_hash(&self, call: &RelayCall) -> B256 {
        Lsp25Message::from_relay_call(self.chain_id, call).signing_hash(self.key_manager)
    }

    /// Recover the address that signed `call`.
    ///
    /// A signature over a different message recovers to an unrelated address
    /// rather than failing; the permission check rejects it later.
    pub fn recover_signer(&self, call: &RelayCall) -> Result<Address, AuthError> {
        Signature::from_raw(call.signature())?
            .recover_address_from_prehash(&self.signing_hash(call))
            .map_err(Into::into)
    }

    /// Verify `call` and consume its nonce, returning the signer.
    ///
    /// Checks run in order: payload size, signature recovery, nonce, validity
    /// window. Nothing is consumed when a check fails.
    pub fn verify(&self, nonces: &mut NonceStore, call: &RelayCall, now: u64) -> Result<Address, AuthError> {
        call.check_size()?;
        let signer = self.recover_signer(call)?;

        if !nonces.is_valid_nonce(signer, call.nonce) {
            tracing::warn!(%signer, nonce = %call.nonce, "Relay call rejected: invalid nonce");
            return Err(AuthError::invalid_nonce(signer, call.nonce, call.signature()));
        }
        ValidityTimestamps::from_word(call.validity_timestamps).check(now)?;
        nonces.consume(signer, call.nonce, call.signature())?;

        tracing::debug!(%signer, nonce = %call.nonce, "Relay call signature verified");
        Ok(signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use alloy_signer::SignerSync;

    const CHAIN_ID: u64 = 4201;

    fn verifier() -> RelayVerifier {
        RelayVerifier::new(Address::with_last_byte(0x4b), CHAIN_ID)
    }

    fn signed_call(signer: &RelaySigner, nonce: U256, validity: U256) -> RelayCall {
        let mut call = RelayCall::new(nonce, validity, U256::ZERO, vec![0x79, 0xba, 0x50, 0x97]);
        signer.sign_relay_call(&verifier(), &mut call).unwrap();
        call
    }

    #[test]
    fn test_verify_returns_signer_and_consumes_nonce() {
        let signer = RelaySigner::random();
        let mut nonces = NonceStore::new();
        let call = signed_call(&signer, U256::ZERO, U256::ZERO);

        assert_eq!(verifier().verify(&mut nonces, &call, 0).unwrap(), signer.address());
        assert_eq!(nonces.get_nonce(signer.address(), 0), U256::from(1));
    }

    #[test]
    fn test_replay_is_rejected() {
        let signer = RelaySigner::random();
        let mut nonces = NonceStore::new();
        let call = signed_call(&signer, U256::ZERO, U256::ZERO);

        verifier().verify(&mut nonces, &call, 0).unwrap();
        let err = verifier().verify(&mut nonces, &call, 0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidRelayNonce { signer: s, .. } if s == signer.address()));
    }

    #[test]
    fn test_other_key_manager_recovers_other_address() {
        let signer = RelaySigner::random();
        let call = signed_call(&signer, U256::ZERO, U256::ZERO);

        let other = RelayVerifier::new(Address::with_last_byte(0x4c), CHAIN_ID);
        assert_ne!(other.recover_signer(&call).unwrap(), signer.address());

        let other_chain = RelayVerifier::new(Address::with_last_byte(0x4b), CHAIN_ID + 1);
        assert_ne!(other_chain.recover_signer(&call).unwrap(), signer.address());
    }

    #[test]
    fn test_personal_message_signature_recovers_other_address() {
        let signer = RelaySigner::random();
        let mut call = RelayCall::new(U256::ZERO, U256::ZERO, U256::ZERO, vec![0x79, 0xba, 0x50, 0x97]);
        let message = Lsp25Message::from_relay_call(CHAIN_ID, &call).encode_packed();
        let signature = signer.inner().sign_message_sync(&message).unwrap();
        call.set_signature(signature.as_bytes());

        assert_ne!(verifier().recover_signer(&call).unwrap(), signer.address());
    }

    #[test]
    fn test_expired_call_keeps_nonce() {
        let signer = RelaySigner::random();
        let mut nonces = NonceStore::new();
        let window = ValidityTimestamps::new(0, 100).to_word();
        let call = signed_call(&signer, U256::ZERO, window);

        let err = verifier().verify(&mut nonces, &call, 101).unwrap_err();
        assert_eq!(err, AuthError::RelayCallExpired { end: 100, now: 101 });
        assert_eq!(nonces.get_nonce(signer.address(), 0), U256::ZERO);
    }

    #[test]
    fn test_garbage_signature_is_rejected() {
        let mut call = RelayCall::new(U256::ZERO, U256::ZERO, U256::ZERO, vec![0x79, 0xba, 0x50, 0x97]);
        call.set_signature([0u8; 65]);
        assert!(matches!(
            verifier().recover_signer(&call),
            Err(AuthError::InvalidSignature(_))
        ));
    }
}
