mod account;
pub mod allowed_calls;
pub mod allowed_data_keys;
mod constants;
mod error;
mod events;
mod memory_account;
mod reentrancy;
mod services;

pub use account::*;
pub use error::*;
pub use events::*;
pub use memory_account::*;
pub use reentrancy::{Entry, ReentrancyGuard};
pub use services::*;

use alloy_primitives::{Address, Bytes, U256};
use keyguard_auth::{NonceStore, RelayVerifier};
use keyguard_tx::{
    OperationType, ProposedAction, RelayCall, decode_calldata, encode_return_data, function_selector,
    selector_of,
};
use keyguard_types::Permissions;

/// LSP6 key manager
///
/// Authorizes controllers against the permissions stored in an account and
/// executes what they ask for through the account:
/// - `Authorizer` judges each action without touching state
/// - `RelayVerifier` and `NonceStore` handle signed relay calls
/// - `ReentrancyGuard` tracks nested calls made while a request is running
///
/// Every request is atomic: all of its actions take effect or none do.
pub struct KeyManager {
    address: Address,
    authorizer: Authorizer,
    verifier: RelayVerifier,
    nonces: NonceStore,
    guard: ReentrancyGuard,
    /// Events of the requests served so far
    events: Vec<KeyManagerEvent>,
}

impl KeyManager {
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self {
            address,
            authorizer: Authorizer::new(address),
            verifier: RelayVerifier::new(address, chain_id),
            nonces: NonceStore::new(),
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn verifier(&self) -> &RelayVerifier {
        &self.verifier
    }

    /// Next relay nonce of `signer` on `channel`
    pub fn get_nonce(&self, signer: Address, channel: u128) -> U256 {
        self.nonces.get_nonce(signer, channel)
    }

    /// Check `action` without executing it
    pub fn authorize<A>(&self, account: &A, caller: Address, action: &ProposedAction) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        self.authorizer.authorize(account, caller, action)
    }

    /// Get and clear events
    pub fn take_events(&mut self) -> Vec<KeyManagerEvent> {
        std::mem::take(&mut self.events)
    }

    // ============================================================================
    // Direct Execution
    // ============================================================================

    /// Authorize and run a single action
    pub fn execute<A>(&mut self, account: &mut A, caller: Address, action: &ProposedAction) -> Result<Bytes, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let mut outputs = self.dispatch(account, caller, U256::ZERO, std::slice::from_ref(action))?;
        Ok(outputs.pop().unwrap_or_default())
    }

    /// Authorize and run `actions` in order, all or nothing
    pub fn execute_batch<A>(
        &mut self,
        account: &mut A,
        caller: Address,
        actions: &[ProposedAction],
    ) -> Result<Vec<Bytes>, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        self.dispatch(account, caller, U256::ZERO, actions)
    }

    /// Run ERC725 calldata on behalf of `caller`, forwarding `msg_value` to
    /// the account. Returns the ERC725 return data.
    pub fn execute_payload<A>(
        &mut self,
        account: &mut A,
        caller: Address,
        msg_value: U256,
        payload: &[u8],
    ) -> Result<Bytes, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let actions = decode_calldata(payload)?;
        let outputs = self.dispatch(account, caller, msg_value, &actions)?;
        Ok(encode_return_data(selector_of(payload), outputs))
    }

    /// Run several payloads, each with its own share of `msg_value`
    pub fn execute_payload_batch<A>(
        &mut self,
        account: &mut A,
        caller: Address,
        values: &[U256],
        payloads: &[Bytes],
        msg_value: U256,
    ) -> Result<Vec<Bytes>, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        if values.len() != payloads.len() {
            return Err(EngineError::BatchLengthMismatch {
                values: values.len(),
                payloads: payloads.len(),
            });
        }
        check_batch_value(values.iter().copied(), msg_value)?;

        self.atomically(account, |key_manager, account| {
            values
                .iter()
                .zip(payloads)
                .map(|(value, payload)| key_manager.execute_payload(account, caller, *value, payload))
                .collect()
        })
    }

    // ============================================================================
    // Relay Execution
    // ============================================================================

    /// Execute a relay call signed by a controller.
    ///
    /// The signer's nonce is consumed only when the whole call succeeds.
    pub fn execute_relay_call<A>(&mut self, account: &mut A, call: &RelayCall, now: u64) -> Result<Bytes, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let nonces = self.nonces.clone();
        let result = self.relay(account, call, now);
        if result.is_err() {
            self.nonces = nonces;
        }
        result
    }

    /// Execute several relay calls atomically; `msg_value` must equal the
    /// sum of their values
    pub fn execute_relay_call_batch<A>(
        &mut self,
        account: &mut A,
        calls: &[RelayCall],
        msg_value: U256,
        now: u64,
    ) -> Result<Vec<Bytes>, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        check_batch_value(calls.iter().map(|call| call.value), msg_value)?;

        let nonces = self.nonces.clone();
        let result = self.atomically(account, |key_manager, account| {
            calls
                .iter()
                .map(|call| key_manager.relay(account, call, now))
                .collect()
        });
        if result.is_err() {
            self.nonces = nonces;
        }
        result
    }

    fn relay<A>(&mut self, account: &mut A, call: &RelayCall, now: u64) -> Result<Bytes, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let signer = self.verifier.verify(&mut self.nonces, call, now)?;

        let permissions = self.authorizer.permissions_of(&*account, signer)?;
        if !permissions.has(Permissions::EXECUTE_RELAY_CALL) {
            tracing::warn!(%signer, "Relay call rejected: missing EXECUTE_RELAY_CALL");
            return Err(EngineError::not_authorised(signer, "EXECUTE_RELAY_CALL"));
        }

        tracing::info!(%signer, nonce = %call.nonce, value = %call.value, "Relay call accepted");
        self.execute_payload(account, signer, call.value, &call.payload)
    }

    // ============================================================================
    // Dispatch
    // ============================================================================

    /// Enter the reentrancy guard and run `actions` atomically
    fn dispatch<A>(
        &mut self,
        account: &mut A,
        caller: Address,
        msg_value: U256,
        actions: &[ProposedAction],
    ) -> Result<Vec<Bytes>, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let result = match self.guard.enter(caller) {
            Entry::TopLevel => {
                tracing::debug!(%caller, actions = actions.len(), "Dispatching request");
                self.atomically(account, |key_manager, account| {
                    key_manager.run(account, caller, msg_value, actions)
                })
            }
            Entry::Nested { original } => match self.check_reentrancy(&*account, original, caller) {
                Ok(()) => self.atomically(account, |key_manager, account| {
                    key_manager.run(account, original, msg_value, actions)
                }),
                Err(err) => Err(err),
            },
        };
        self.guard.exit();
        result
    }

    /// A nested request runs with the original caller's authority, which must
    /// include REENTRANCY
    fn check_reentrancy<A>(&self, account: &A, original: Address, reentrant: Address) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let permissions = self.authorizer.permissions_of(account, original)?;
        if !permissions.has(Permissions::REENTRANCY) {
            tracing::warn!(%original, %reentrant, depth = self.guard.depth(), "Reentrant call rejected");
            return Err(EngineError::not_authorised(original, "REENTRANCY"));
        }
        tracing::debug!(%original, %reentrant, depth = self.guard.depth(), "Reentrant call admitted");
        Ok(())
    }

    /// Run `f` inside an account checkpoint; on error every write and event
    /// it produced is dropped
    fn atomically<A, T>(
        &mut self,
        account: &mut A,
        f: impl FnOnce(&mut Self, &mut A) -> Result<T, EngineError>,
    ) -> Result<T, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let checkpoint = account.checkpoint();
        let events_len = self.events.len();

        match f(self, account) {
            Ok(value) => {
                account.commit(checkpoint)?;
                Ok(value)
            }
            Err(err) => {
                account.revert_to(checkpoint)?;
                self.events.truncate(events_len);
                tracing::warn!(error = %err, "Request reverted");
                Err(err)
            }
        }
    }

    fn run<A>(
        &mut self,
        account: &mut A,
        caller: Address,
        msg_value: U256,
        actions: &[ProposedAction],
    ) -> Result<Vec<Bytes>, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        if !msg_value.is_zero() {
            account.receive_value(caller, msg_value);
        }

        let mut outputs = Vec::with_capacity(actions.len());
        for action in actions {
            self.authorizer.authorize(&*account, caller, action)?;
            tracing::debug!(%caller, action = action.name(), "Action authorized");
            self.events.push(KeyManagerEvent::PermissionsVerified {
                signer: caller,
                value: msg_value,
                selector: function_selector(action),
            });
            outputs.push(self.perform(account, action)?);
        }
        Ok(outputs)
    }

    fn perform<A>(&mut self, account: &mut A, action: &ProposedAction) -> Result<Bytes, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let (operation, target, value, data) = match action {
            ProposedAction::SetData { entries } => {
                for entry in entries {
                    account.set_data(entry.key, entry.value.clone());
                }
                return Ok(Bytes::new());
            }
            ProposedAction::TransferOwnership { new_owner } => {
                account.change_ownership(OwnershipChange::Transfer(*new_owner))?;
                return Ok(Bytes::new());
            }
            ProposedAction::AcceptOwnership => {
                account.change_ownership(OwnershipChange::Accept)?;
                return Ok(Bytes::new());
            }
            ProposedAction::RenounceOwnership => {
                account.change_ownership(OwnershipChange::Renounce)?;
                return Ok(Bytes::new());
            }
            ProposedAction::TransferValue { to, value } => (OperationType::Call, *to, *value, Bytes::new()),
            ProposedAction::Call { target, value, data } => (OperationType::Call, *target, *value, data.clone()),
            ProposedAction::StaticCall { target, value, data } => {
                (OperationType::StaticCall, *target, *value, data.clone())
            }
            ProposedAction::DelegateCall { target, value, data } => {
                (OperationType::DelegateCall, *target, *value, data.clone())
            }
            ProposedAction::Deploy {
                kind,
                value,
                init_code,
            } => ((*kind).into(), Address::ZERO, *value, init_code.clone()),
        };

        let call = OutgoingCall {
            operation,
            target,
            value,
            data,
        };
        let mut hook = NestedDispatch { key_manager: self };
        Ok(account.perform_call(&call, &mut hook)?)
    }
}

/// Routes calls a callee makes back into the key manager
struct NestedDispatch<'a> {
    key_manager: &'a mut KeyManager,
}

impl ReentryHook for NestedDispatch<'_> {
    fn reenter(
        &mut self,
        account: &mut dyn ControlledAccount,
        caller: Address,
        payload: &[u8],
    ) -> Result<Bytes, EngineError> {
        self.key_manager
            .execute_payload(account, caller, U256::ZERO, payload)
    }
}

fn check_batch_value(values: impl Iterator<Item = U256>, msg_value: U256) -> Result<(), EngineError> {
    let total = values.fold(U256::ZERO, |total, value| total.saturating_add(value));
    if total > msg_value {
        return Err(EngineError::BatchInsufficientValueSent { total, msg_value });
    }
    if total < msg_value {
        return Err(EngineError::BatchExcessiveValueSent { total, msg_value });
    }
    Ok(())
}
