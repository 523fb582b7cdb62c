use crate::RelayVerifier;
use alloy_primitives::{Address, B256, Signature};
use alloy_signer::{Signer, SignerSync};
use alloy_signer_local::PrivateKeySigner;
use keyguard_tx::RelayCall;

/// Signs relay calls on behalf of a controller
///
/// Thin wrapper around `alloy_signer_local::PrivateKeySigner` that knows how
/// to produce LSP25 signatures.
///
/// # Example
/// ```ignore
/// use keyguard_auth::{RelaySigner, RelayVerifier};
/// use keyguard_tx::RelayCall;
///
/// let signer = RelaySigner::random();
/// let verifier = RelayVerifier::new(key_manager, 1);
/// let mut call = RelayCall::new(nonce, U256::ZERO, U256::ZERO, payload);
/// signer.sign_relay_call(&verifier, &mut call)?;
/// ```
#[derive(Clone)]
pub struct RelaySigner {
    signer: PrivateKeySigner,
}

impl RelaySigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Create a random signer for testing
    ///
    /// # Security Warning
    /// Only use this for testing! Never use random keys for production.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a 32-byte hash asynchronously
    pub async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        self.signer.sign_hash(hash).await
    }

    pub fn sign_hash_sync(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        self.signer.sign_hash_sync(hash)
    }

    /// Sign `call` for the key manager behind `verifier` and store the
    /// signature in it
    pub fn sign_relay_call(&self, verifier: &RelayVerifier, call: &mut RelayCall) -> Result<(), alloy_signer::Error> {
        let signature = self.sign_hash_sync(&verifier.signing_hash(call))?;
        call.set_signature(signature.as_bytes());
        Ok(())
    }

    /// Async variant of [`RelaySigner::sign_relay_call`]
    pub async fn sign_relay_call_async(
        &self,
        verifier: &RelayVerifier,
        call: &mut RelayCall,
    ) -> Result<(), alloy_signer::Error> {
        let signature = self.sign_hash(&verifier.signing_hash(call)).await?;
        call.set_signature(signature.as_bytes());
        Ok(())
    }

    pub fn inner(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn into_inner(self) -> PrivateKeySigner {
        self.signer
    }
}

impl std::fmt::Debug for RelaySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
