//! ERC725 calldata codec
//!
//! The key manager accepts raw ERC725X/ERC725Y calldata. This module turns it
//! into [`ProposedAction`]s and back.

use crate::{Address, Bytes, DataEntry, OperationType, PayloadError, ProposedAction, Selector, U256};
use alloy_sol_types::{SolCall, SolInterface, SolValue, sol};

sol! {
    interface IERC725 {
        function setData(bytes32 dataKey, bytes dataValue) external payable;
        function setDataBatch(bytes32[] dataKeys, bytes[] dataValues) external payable;
        function execute(uint256 operationType, address target, uint256 value, bytes data) external payable returns (bytes);
        function executeBatch(uint256[] operationsType, address[] targets, uint256[] values, bytes[] datas) external payable returns (bytes[]);
        function transferOwnership(address newOwner) external;
        function acceptOwnership() external;
        function renounceOwnership() external;
    }
}

pub use IERC725::IERC725Calls;

fn abi_error(function: &'static str) -> impl FnOnce(alloy_sol_types::Error) -> PayloadError {
    move |err| PayloadError::AbiDecode {
        function,
        reason: err.to_string(),
    }
}

/// Decode ERC725 calldata into the actions it requests.
///
/// `executeBatch` expands into one action per element, everything else yields
/// a single action.
pub fn decode_calldata(data: &[u8]) -> Result<Vec<ProposedAction>, PayloadError> {
    let Some(selector) = data.get(..4) else {
        return Err(PayloadError::InvalidPayload(Bytes::copy_from_slice(data)));
    };
    let selector: [u8; 4] = [selector[0], selector[1], selector[2], selector[3]];
    if !IERC725Calls::valid_selector(selector) {
        return Err(PayloadError::InvalidERC725Function(Selector::from(selector)));
    }

    let call = IERC725Calls::abi_decode(data).map_err(abi_error("ERC725"))?;
    let actions = match call {
        IERC725Calls::setData(call) => vec![ProposedAction::set_data(call.dataKey, call.dataValue)],
        IERC725Calls::setDataBatch(call) => {
            if call.dataKeys.len() != call.dataValues.len() {
                return Err(PayloadError::DataKeysValuesLengthMismatch);
            }
            if call.dataKeys.is_empty() {
                return Err(PayloadError::EmptyBatch);
            }
            let entries = call
                .dataKeys
                .into_iter()
                .zip(call.dataValues)
                .map(|(key, value)| DataEntry::new(key, value))
                .collect();
            vec![ProposedAction::SetData { entries }]
        }
        IERC725Calls::execute(call) => {
            let op = OperationType::try_from(call.operationType)?;
            vec![ProposedAction::from_execute_params(op, call.target, call.value, call.data)]
        }
        IERC725Calls::executeBatch(call) => {
            let len = call.operationsType.len();
            if call.targets.len() != len || call.values.len() != len || call.datas.len() != len {
                return Err(PayloadError::ExecuteParametersLengthMismatch);
            }
            if len == 0 {
                return Err(PayloadError::EmptyBatch);
            }
            call.operationsType
                .into_iter()
                .zip(call.targets)
                .zip(call.values)
                .zip(call.datas)
                .map(|(((op, target), value), data)| {
                    Ok(ProposedAction::from_execute_params(
                        OperationType::try_from(op)?,
                        target,
                        value,
                        data,
                    ))
                })
                .collect::<Result<Vec<_>, PayloadError>>()?
        }
        IERC725Calls::transferOwnership(call) => vec![ProposedAction::TransferOwnership {
            new_owner: call.newOwner,
        }],
        IERC725Calls::acceptOwnership(_) => vec![ProposedAction::AcceptOwnership],
        IERC725Calls::renounceOwnership(_) => vec![ProposedAction::RenounceOwnership],
    };

    Ok(actions)
}

/// Encode a single action as the ERC725 calldata that requests it
pub fn encode_calldata(action: &ProposedAction) -> Bytes {
    let encoded = match action {
        ProposedAction::SetData { entries } if entries.len() == 1 => IERC725::setDataCall {
            dataKey: entries[0].key,
            dataValue: entries[0].value.clone(),
        }
        .abi_encode(),
        ProposedAction::SetData { entries } => IERC725::setDataBatchCall {
            dataKeys: entries.iter().map(|entry| entry.key).collect(),
            dataValues: entries.iter().map(|entry| entry.value.clone()).collect(),
        }
        .abi_encode(),
        ProposedAction::TransferOwnership { new_owner } => IERC725::transferOwnershipCall {
            newOwner: *new_owner,
        }
        .abi_encode(),
        ProposedAction::AcceptOwnership => IERC725::acceptOwnershipCall {}.abi_encode(),
        ProposedAction::RenounceOwnership => IERC725::renounceOwnershipCall {}.abi_encode(),
        ProposedAction::TransferValue { to, value } => execute(OperationType::Call, *to, *value, Bytes::new()),
        ProposedAction::Call { target, value, data } => execute(OperationType::Call, *target, *value, data.clone()),
        ProposedAction::StaticCall { target, value, data } => {
            execute(OperationType::StaticCall, *target, *value, data.clone())
        }
        ProposedAction::DelegateCall { target, value, data } => {
            execute(OperationType::DelegateCall, *target, *value, data.clone())
        }
        ProposedAction::Deploy {
            kind,
            value,
            init_code,
        } => execute((*kind).into(), Address::ZERO, *value, init_code.clone()),
    };
    encoded.into()
}

fn execute(op: OperationType, target: Address, value: U256, data: Bytes) -> Vec<u8> {
    IERC725::executeCall {
        operationType: op.into(),
        target,
        value,
        data,
    }
    .abi_encode()
}

/// Encode several execute-style actions as one `executeBatch` call
pub fn encode_execute_batch(actions: &[ProposedAction]) -> Result<Bytes, PayloadError> {
    if actions.is_empty() {
        return Err(PayloadError::EmptyBatch);
    }

    let mut call = IERC725::executeBatchCall {
        operationsType: Vec::with_capacity(actions.len()),
        targets: Vec::with_capacity(actions.len()),
        values: Vec::with_capacity(actions.len()),
        datas: Vec::with_capacity(actions.len()),
    };
    for action in actions {
        let (op, target, value, data) = action
            .as_execute_params()
            .ok_or(PayloadError::NotBatchable(action.name()))?;
        call.operationsType.push(op.into());
        call.targets.push(target);
        call.values.push(value);
        call.datas.push(data);
    }

    Ok(call.abi_encode().into())
}

/// ERC725 function an action is requested through
pub fn function_selector(action: &ProposedAction) -> Selector {
    let selector = match action {
        ProposedAction::SetData { entries } if entries.len() == 1 => IERC725::setDataCall::SELECTOR,
        ProposedAction::SetData { .. } => IERC725::setDataBatchCall::SELECTOR,
        ProposedAction::TransferOwnership { .. } => IERC725::transferOwnershipCall::SELECTOR,
        ProposedAction::AcceptOwnership => IERC725::acceptOwnershipCall::SELECTOR,
        ProposedAction::RenounceOwnership => IERC725::renounceOwnershipCall::SELECTOR,
        _ => IERC725::executeCall::SELECTOR,
    };
    Selector::from(selector)
}

/// Return data of an ERC725 call given the output of each action it ran.
///
/// `executeBatch` returns `bytes[]`, every other function returns the output
/// of its single action (empty for data and ownership functions).
pub fn encode_return_data(selector: Selector, mut outputs: Vec<Bytes>) -> Bytes {
    if selector == IERC725::executeBatchCall::SELECTOR {
        return outputs.abi_encode().into();
    }
    outputs.pop().unwrap_or_default()
}

/// Selector of every function the key manager understands
pub fn known_selectors() -> &'static [[u8; 4]] {
    IERC725Calls::SELECTORS
}
