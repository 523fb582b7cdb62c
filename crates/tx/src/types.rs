use crate::{Address, Bytes, DataEntry, PayloadError, Selector, U256, selector_of};
use keyguard_macros::{standard, standard_enum};

/// ERC725X operation type
#[standard_enum(u8)]
pub enum OperationType {
    Call = 0,
    Create = 1,
    Create2 = 2,
    StaticCall = 3,
    DelegateCall = 4,
}

impl OperationType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<U256> for OperationType {
    type Error = PayloadError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        match value.as_limbs() {
            [0, 0, 0, 0] => Ok(Self::Call),
            [1, 0, 0, 0] => Ok(Self::Create),
            [2, 0, 0, 0] => Ok(Self::Create2),
            [3, 0, 0, 0] => Ok(Self::StaticCall),
            [4, 0, 0, 0] => Ok(Self::DelegateCall),
            _ => Err(PayloadError::UnknownOperationType(value)),
        }
    }
}

impl From<OperationType> for U256 {
    fn from(op: OperationType) -> Self {
        U256::from(op.as_u8())
    }
}

/// Contract creation flavour
#[standard_enum(u8)]
pub enum DeployKind {
    Create = 1,
    /// `init_code` carries the 32-byte salt as its last word
    Create2 = 2,
}

impl From<DeployKind> for OperationType {
    fn from(kind: DeployKind) -> Self {
        match kind {
            DeployKind::Create => Self::Create,
            DeployKind::Create2 => Self::Create2,
        }
    }
}

/// An action a controller asks the account to perform
///
/// This is the closed set of things the authorization engine knows how to
/// judge. Calldata sent to the key manager decodes into one or more of these.
#[standard]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposedAction {
    /// Native value transfer without calldata
    TransferValue { to: Address, value: U256 },
    /// Regular call, optionally carrying value
    Call {
        target: Address,
        value: U256,
        data: Bytes,
    },
    StaticCall {
        target: Address,
        value: U256,
        data: Bytes,
    },
    DelegateCall {
        target: Address,
        value: U256,
        data: Bytes,
    },
    Deploy {
        kind: DeployKind,
        value: U256,
        init_code: Bytes,
    },
    /// One or many data store writes, applied all-or-nothing
    SetData { entries: Vec<DataEntry> },
    TransferOwnership { new_owner: Address },
    AcceptOwnership,
    RenounceOwnership,
}

impl ProposedAction {
    pub fn set_data(key: crate::B256, value: impl Into<Bytes>) -> Self {
        Self::SetData {
            entries: vec![DataEntry::new(key, value)],
        }
    }

    pub fn call(target: Address, data: impl Into<Bytes>) -> Self {
        Self::Call {
            target,
            value: U256::ZERO,
            data: data.into(),
        }
    }

    /// Native value leaving the account
    pub fn value(&self) -> U256 {
        match self {
            Self::TransferValue { value, .. }
            | Self::Call { value, .. }
            | Self::StaticCall { value, .. }
            | Self::DelegateCall { value, .. }
            | Self::Deploy { value, .. } => *value,
            Self::SetData { .. }
            | Self::TransferOwnership { .. }
            | Self::AcceptOwnership
            | Self::RenounceOwnership => U256::ZERO,
        }
    }

    /// Call target, if the action is a call
    pub fn target(&self) -> Option<Address> {
        match self {
            Self::TransferValue { to, .. } => Some(*to),
            Self::Call { target, .. }
            | Self::StaticCall { target, .. }
            | Self::DelegateCall { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Selector of the forwarded calldata, `0x00000000` when there is none
    pub fn call_selector(&self) -> Selector {
        match self {
            Self::Call { data, .. } | Self::StaticCall { data, .. } | Self::DelegateCall { data, .. } => {
                selector_of(data)
            }
            _ => Selector::ZERO,
        }
    }

    /// Short human readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TransferValue { .. } => "transfer_value",
            Self::Call { .. } => "call",
            Self::StaticCall { .. } => "static_call",
            Self::DelegateCall { .. } => "delegate_call",
            Self::Deploy { .. } => "deploy",
            Self::SetData { .. } => "set_data",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::AcceptOwnership => "accept_ownership",
            Self::RenounceOwnership => "renounce_ownership",
        }
    }

    /// ERC725X view of the action: operation type, target, value and data
    pub fn as_execute_params(&self) -> Option<(OperationType, Address, U256, Bytes)> {
        match self {
            Self::TransferValue { to, value } => Some((OperationType::Call, *to, *value, Bytes::new())),
            Self::Call { target, value, data } => Some((OperationType::Call, *target, *value, data.clone())),
            Self::StaticCall { target, value, data } => {
                Some((OperationType::StaticCall, *target, *value, data.clone()))
            }
            Self::DelegateCall { target, value, data } => {
                Some((OperationType::DelegateCall, *target, *value, data.clone()))
            }
            Self::Deploy {
                kind,
                value,
                init_code,
            } => Some(((*kind).into(), Address::ZERO, *value, init_code.clone())),
            _ => None,
        }
    }

    /// Build an action from ERC725X `execute` parameters
    pub fn from_execute_params(op: OperationType, target: Address, value: U256, data: Bytes) -> Self {
        match op {
            OperationType::Call if data.is_empty() && !value.is_zero() => Self::TransferValue { to: target, value },
            OperationType::Call => Self::Call { target, value, data },
            OperationType::StaticCall => Self::StaticCall { target, value, data },
            OperationType::DelegateCall => Self::DelegateCall { target, value, data },
            OperationType::Create => Self::Deploy {
                kind: DeployKind::Create,
                value,
                init_code: data,
            },
            OperationType::Create2 => Self::Deploy {
                kind: DeployKind::Create2,
                value,
                init_code: data,
            },
        }
    }
}
