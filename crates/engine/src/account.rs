use crate::{AccountError, EngineError};
use alloy_primitives::{Address, Bytes, U256};
use keyguard_state::DataStore;
use keyguard_tx::{OperationType, Selector};

/// A call the account performs on behalf of an authorized controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingCall {
    pub operation: OperationType,
    /// Ignored for deployments
    pub target: Address,
    pub value: U256,
    /// Call data, or init code for deployments
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipChange {
    Transfer(Address),
    Accept,
    Renounce,
}

/// Path back into the key manager while an account call is in flight
///
/// The account hands it every callee that calls the key manager again; the
/// key manager decides whether the nested request may proceed.
pub trait ReentryHook {
    fn reenter(
        &mut self,
        account: &mut dyn ControlledAccount,
        caller: Address,
        payload: &[u8],
    ) -> Result<Bytes, EngineError>;
}

/// The ERC725 account a key manager controls
///
/// The key manager only reads permission data through [`DataStore`] and only
/// acts through the methods below.
pub trait ControlledAccount: DataStore {
    fn address(&self) -> Address;

    fn owner(&self) -> Address;

    fn balance(&self) -> U256;

    /// Credit value forwarded with a key manager call
    fn receive_value(&mut self, from: Address, value: U256);

    /// Execute an authorized call; `hook` serves callees that call back
    fn perform_call(&mut self, call: &OutgoingCall, hook: &mut dyn ReentryHook) -> Result<Bytes, AccountError>;

    fn change_ownership(&mut self, change: OwnershipChange) -> Result<(), AccountError>;

    /// ERC165 lookup on `target`
    fn supports_interface(&self, target: Address, interface_id: Selector) -> bool;
}
