use crate::{Selector, U256};
use alloy_primitives::Bytes;
use thiserror::Error;

/// Calldata decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid payload {0}: shorter than a function selector")]
    InvalidPayload(Bytes),

    #[error("function {0} is not part of the ERC725 interface")]
    InvalidERC725Function(Selector),

    #[error("failed to decode {function} arguments: {reason}")]
    AbiDecode {
        function: &'static str,
        reason: String,
    },

    #[error("unknown ERC725X operation type {0}")]
    UnknownOperationType(U256),

    #[error("executeBatch parameter lengths differ")]
    ExecuteParametersLengthMismatch,

    #[error("setDataBatch keys and values lengths differ")]
    DataKeysValuesLengthMismatch,

    #[error("batch must contain at least one element")]
    EmptyBatch,

    #[error("payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("{0} cannot be encoded inside executeBatch")]
    NotBatchable(&'static str),
}
