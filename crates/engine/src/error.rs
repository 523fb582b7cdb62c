use alloy_primitives::{Address, B256, Bytes, U256};
use keyguard_auth::AuthError;
use keyguard_state::StateError;
use keyguard_tx::{PayloadError, Selector};
use thiserror::Error;

/// Key manager errors
///
/// Every variant is terminal for the request that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No permissions set for {0}")]
    NoPermissionsSet(Address),

    #[error("{caller} is not authorised for {permission}")]
    NotAuthorised { caller: Address, permission: &'static str },

    #[error("{caller} is not allowed to call {target} with selector {selector}")]
    NotAllowedCall {
        caller: Address,
        target: Address,
        selector: Selector,
    },

    #[error("No calls allowed for {0}")]
    NoCallsAllowed(Address),

    #[error("{caller} is not allowed to set data key {key}")]
    NotAllowedERC725YDataKey { caller: Address, key: B256 },

    #[error("No ERC725Y data keys allowed for {0}")]
    NoERC725YDataKeysAllowed(Address),

    #[error("Invalid encoded allowed calls: {0}")]
    InvalidEncodedAllowedCalls(Bytes),

    #[error("Invalid encoded allowed ERC725Y data keys: {0}")]
    InvalidEncodedAllowedERC725YDataKeys(Bytes),

    #[error("Unrecognized permission key: {0}")]
    UnrecognizedPermissionKey(B256),

    #[error("Value {value} under {key} is not an address")]
    AddressPermissionArrayIndexValueNotAnAddress { key: B256, value: Bytes },

    #[error("Value {value} under {key} is not a valid array length")]
    InvalidArrayLengthValue { key: B256, value: Bytes },

    #[error("Value not allowed in static call")]
    MsgValueDisallowedInStaticCall,

    #[error("Value not allowed in delegate call")]
    MsgValueDisallowedInDelegateCall,

    #[error("Calling the key manager through the account is not allowed")]
    CallingKeyManagerNotAllowed,

    #[error("Batch length mismatch: {values} values, {payloads} payloads")]
    BatchLengthMismatch { values: usize, payloads: usize },

    #[error("Insufficient value sent: batch needs {total}, got {msg_value}")]
    BatchInsufficientValueSent { total: U256, msg_value: U256 },

    #[error("Excessive value sent: batch needs {total}, got {msg_value}")]
    BatchExcessiveValueSent { total: U256, msg_value: U256 },

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Relay error: {0}")]
    Relay(#[from] AuthError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Account error: {0}")]
    Account(AccountError),
}

impl EngineError {
    pub(crate) fn not_authorised(caller: Address, permission: &'static str) -> Self {
        Self::NotAuthorised { caller, permission }
    }
}

impl From<AccountError> for EngineError {
    fn from(err: AccountError) -> Self {
        match err {
            // Surface the nested failure itself, not the call that carried it
            AccountError::Reentered(inner) => *inner,
            other => Self::Account(other),
        }
    }
}

/// Errors raised by a controlled account while executing an authorized action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Call to {target} failed: {reason}")]
    CallFailed { target: Address, reason: String },

    #[error("No pending owner")]
    NoPendingOwner,

    #[error("Nested key manager call failed: {0}")]
    Reentered(Box<EngineError>),

    #[error("State error: {0}")]
    State(#[from] StateError),
}
