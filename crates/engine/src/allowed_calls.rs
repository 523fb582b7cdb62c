//! Allowed-Calls restrictions
//!
//! A controller's `AddressPermissions:AllowedCalls:<address>` value is a
//! `CompactBytesArray` of 32-byte entries:
//!
//! ```text
//! bytes4 callTypes ‖ bytes20 address ‖ bytes4 interfaceId ‖ bytes4 selector
//! ```
//!
//! `address`, `interfaceId` and `selector` accept an all-`0xff` wildcard.

use crate::constants::ALLOWED_CALL_ENTRY_LEN;
use alloy_primitives::{Address, Bytes, address, fixed_bytes};
use keyguard_tx::Selector;
use keyguard_types::{CompactBytesError, compact_bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Matches any target address
pub const ANY_ADDRESS: Address = address!("ffffffffffffffffffffffffffffffffffffffff");

/// Matches any target, ERC165 support is not checked
pub const ANY_STANDARD: Selector = fixed_bytes!("ffffffff");

/// Matches any function selector
pub const ANY_FUNCTION: Selector = fixed_bytes!("ffffffff");

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowedCallsError {
    #[error(transparent)]
    Encoding(#[from] CompactBytesError),

    #[error("entry {index} is {length} bytes, expected 32")]
    InvalidEntryLength { index: usize, length: usize },
}

/// Call-type bits of an Allowed-Calls entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallTypes(pub u32);

impl CallTypes {
    pub const VALUE: Self = Self(0x01);
    pub const CALL: Self = Self(0x02);
    pub const STATIC_CALL: Self = Self(0x04);
    pub const DELEGATE_CALL: Self = Self(0x08);

    pub const fn empty() -> Self {
        Self(0)
    }

    /// True when every bit of `required` is set
    pub const fn contains(&self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for CallTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for CallTypes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One whitelisted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowedCall {
    pub call_types: CallTypes,
    pub address: Address,
    /// ERC165 interface id the target must support
    pub standard: Selector,
    pub function: Selector,
}

impl AllowedCall {
    pub const fn new(call_types: CallTypes, address: Address, standard: Selector, function: Selector) -> Self {
        Self {
            call_types,
            address,
            standard,
            function,
        }
    }

    /// Any function of any contract at `address`
    pub const fn any_function_of(call_types: CallTypes, address: Address) -> Self {
        Self::new(call_types, address, ANY_STANDARD, ANY_FUNCTION)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ALLOWED_CALL_ENTRY_LEN {
            return None;
        }
        Some(Self {
            call_types: CallTypes(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            address: Address::from_slice(&bytes[4..24]),
            standard: Selector::from_slice(&bytes[24..28]),
            function: Selector::from_slice(&bytes[28..32]),
        })
    }

    pub fn to_bytes(&self) -> [u8; ALLOWED_CALL_ENTRY_LEN] {
        let mut out = [0u8; ALLOWED_CALL_ENTRY_LEN];
        out[..4].copy_from_slice(&self.call_types.0.to_be_bytes());
        out[4..24].copy_from_slice(self.address.as_slice());
        out[24..28].copy_from_slice(self.standard.as_slice());
        out[28..].copy_from_slice(self.function.as_slice());
        out
    }

    /// An entry restricting nothing at all is a broken whitelist entry
    pub fn is_malformed(&self) -> bool {
        self.address.is_zero() && self.standard.is_zero() && self.function.is_zero()
    }

    fn matches(&self, request: &CallRequest, supports_interface: &impl Fn(Address, Selector) -> bool) -> bool {
        if self.is_malformed() || !self.call_types.contains(request.required) {
            return false;
        }
        (self.address == ANY_ADDRESS || self.address == request.target)
            && (self.function == ANY_FUNCTION || self.function == request.selector)
            && (self.standard == ANY_STANDARD || supports_interface(request.target, self.standard))
    }
}

/// The call a controller asks the account to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRequest {
    pub target: Address,
    /// `0x00000000` when the call data is shorter than 4 bytes
    pub selector: Selector,
    /// Call-type bits an entry must grant
    pub required: CallTypes,
}

/// Decode a stored Allowed-Calls value. The empty value is the empty list.
pub fn decode(value: &[u8]) -> Result<Vec<AllowedCall>, AllowedCallsError> {
    compact_bytes::iter(value)
        .enumerate()
        .map(|(index, element)| {
            let element = element?;
            AllowedCall::from_bytes(element).ok_or(AllowedCallsError::InvalidEntryLength {
                index,
                length: element.len(),
            })
        })
        .collect()
}

pub fn encode(entries: &[AllowedCall]) -> Bytes {
    let mut out = Vec::with_capacity(entries.len() * (2 + ALLOWED_CALL_ENTRY_LEN));
    for entry in entries {
        out.extend_from_slice(&(ALLOWED_CALL_ENTRY_LEN as u16).to_be_bytes());
        out.extend_from_slice(&entry.to_bytes());
    }
    out.into()
}

/// First entry permitting `request`
pub fn find_match<'a>(
    entries: &'a [AllowedCall],
    request: &CallRequest,
    supports_interface: impl Fn(Address, Selector) -> bool,
) -> Option<&'a AllowedCall> {
    entries
        .iter()
        .find(|entry| entry.matches(request, &supports_interface))
}
