//! LSP2 data keys used by the permission system
//!
//! Keys are 32-byte values built from keccak-256 hashes of their names:
//!
//! - Singleton: `keccak256(name)`
//! - Array: length key `keccak256("Name[]")`, element keys
//!   `bytes16(keccak256("Name[]")) ‖ uint128(index)`
//! - Mapping: `bytes10(keccak256(first)) ‖ 0x0000 ‖ bytes20(second)`
//! - MappingWithGrouping: `bytes6(keccak256(first)) ‖ bytes4(keccak256(second)) ‖ 0x0000 ‖ bytes20(suffix)`

use crate::{Address, B256};
use alloy_primitives::{b256, hex, keccak256};
use keyguard_macros::{standard, standard_enum};

/// `AddressPermissions[]` length key
pub const ADDRESS_PERMISSIONS_ARRAY_KEY: B256 =
    b256!("df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3");

/// First 16 bytes of the `AddressPermissions[]` key, shared by every index key
pub const ADDRESS_PERMISSIONS_ARRAY_PREFIX: [u8; 16] = hex!("df30dba06db6a30e65354d9a64c60986");

/// `bytes6(keccak256("AddressPermissions"))`
pub const PERMISSIONS_NAMESPACE: [u8; 6] = hex!("4b80742de2bf");

/// `AddressPermissions:Permissions:<address>`
pub const PERMISSIONS_PREFIX: [u8; 12] = hex!("4b80742de2bf82acb3630000");

/// `AddressPermissions:AllowedCalls:<address>`
pub const ALLOWED_CALLS_PREFIX: [u8; 12] = hex!("4b80742de2bf393a64c70000");

/// `AddressPermissions:AllowedERC725YDataKeys:<address>`
pub const ALLOWED_DATA_KEYS_PREFIX: [u8; 12] = hex!("4b80742de2bf866c29110000");

/// `LSP1UniversalReceiverDelegate`
pub const UNIVERSAL_RECEIVER_DELEGATE_KEY: B256 =
    b256!("0cfc51aec37c55a4d0b1a65c6255c4bf2fbdf6277f3cc0730c45b828b6db8b47");

/// `LSP1UniversalReceiverDelegate:<typeId>`
pub const UNIVERSAL_RECEIVER_DELEGATE_PREFIX: [u8; 12] = hex!("0cfc51aec37c55a4d0b10000");

/// `LSP17Extension:<bytes4 selector>`
pub const EXTENSION_PREFIX: [u8; 12] = hex!("cee78b4094da860110960000");

/// The four LSP2 key layouts
#[standard_enum(u8)]
pub enum KeyShape {
    Singleton = 0,
    Array = 1,
    Mapping = 2,
    MappingWithGrouping = 3,
}

/// What a data key means to the permission system
///
/// The class decides which permission a write to that key requires.
#[standard]
#[derive(Copy, Hash)]
pub enum DataKeyClass {
    /// `AddressPermissions[]`
    PermissionsArrayLength,
    /// `AddressPermissions[index]`
    PermissionsArrayIndex(u128),
    /// `AddressPermissions:Permissions:<address>`
    Permissions(Address),
    /// `AddressPermissions:AllowedCalls:<address>`
    AllowedCalls(Address),
    /// `AddressPermissions:AllowedERC725YDataKeys:<address>`
    AllowedDataKeys(Address),
    /// Inside the `AddressPermissions` namespace but not a known sub-key
    UnrecognizedPermission,
    /// `LSP1UniversalReceiverDelegate` or one of its typeId mappings
    UniversalReceiverDelegate,
    /// `LSP17Extension:<selector>`
    Extension,
    /// Any other key
    Regular,
}

impl DataKeyClass {
    /// True for keys managed through ADD_CONTROLLER / EDIT_PERMISSIONS
    pub const fn is_permission_key(&self) -> bool {
        matches!(
            self,
            Self::PermissionsArrayLength
                | Self::PermissionsArrayIndex(_)
                | Self::Permissions(_)
                | Self::AllowedCalls(_)
                | Self::AllowedDataKeys(_)
                | Self::UnrecognizedPermission
        )
    }

    /// LSP2 layout of the key, `None` when the layout cannot be told
    pub const fn shape(&self) -> Option<KeyShape> {
        match self {
            Self::PermissionsArrayLength | Self::PermissionsArrayIndex(_) => Some(KeyShape::Array),
            Self::Permissions(_) | Self::AllowedCalls(_) | Self::AllowedDataKeys(_) => {
                Some(KeyShape::MappingWithGrouping)
            }
            Self::Extension => Some(KeyShape::Mapping),
            Self::UniversalReceiverDelegate => None,
            Self::UnrecognizedPermission | Self::Regular => None,
        }
    }
}

// ============================================================================
// Derivation
// ============================================================================

/// `keccak256(name)`
pub fn singleton(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

/// Length key of an LSP2 array, `name` includes the trailing `[]`
pub fn array_length(name: &str) -> B256 {
    singleton(name)
}

/// Element key of an LSP2 array
pub fn array_index(name: &str, index: u128) -> B256 {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&keccak256(name.as_bytes())[..16]);
    key[16..].copy_from_slice(&index.to_be_bytes());
    B256::from(key)
}

/// LSP2 mapping key. `second` is left-aligned in the last 20 bytes and
/// truncated past 20 bytes.
pub fn mapping(first: &str, second: &[u8]) -> B256 {
    let mut key = [0u8; 32];
    key[..10].copy_from_slice(&keccak256(first.as_bytes())[..10]);
    let len = second.len().min(20);
    key[12..12 + len].copy_from_slice(&second[..len]);
    B256::from(key)
}

/// LSP2 mapping-with-grouping key ending in an address
pub fn mapping_with_grouping(first: &str, second: &str, suffix: Address) -> B256 {
    let mut key = [0u8; 32];
    key[..6].copy_from_slice(&keccak256(first.as_bytes())[..6]);
    key[6..10].copy_from_slice(&keccak256(second.as_bytes())[..4]);
    key[12..].copy_from_slice(suffix.as_slice());
    B256::from(key)
}

fn with_address(prefix: &[u8; 12], address: Address) -> B256 {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(prefix);
    key[12..].copy_from_slice(address.as_slice());
    B256::from(key)
}

/// `AddressPermissions:Permissions:<address>`
pub fn permissions_key(controller: Address) -> B256 {
    with_address(&PERMISSIONS_PREFIX, controller)
}

/// `AddressPermissions:AllowedCalls:<address>`
pub fn allowed_calls_key(controller: Address) -> B256 {
    with_address(&ALLOWED_CALLS_PREFIX, controller)
}

/// `AddressPermissions:AllowedERC725YDataKeys:<address>`
pub fn allowed_data_keys_key(controller: Address) -> B256 {
    with_address(&ALLOWED_DATA_KEYS_PREFIX, controller)
}

/// `AddressPermissions[index]`
pub fn permissions_array_index_key(index: u128) -> B256 {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&ADDRESS_PERMISSIONS_ARRAY_PREFIX);
    key[16..].copy_from_slice(&index.to_be_bytes());
    B256::from(key)
}

/// `LSP17Extension:<selector>`
pub fn extension_key(selector: [u8; 4]) -> B256 {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(&EXTENSION_PREFIX);
    key[12..16].copy_from_slice(&selector);
    B256::from(key)
}

// ============================================================================
// Classification
// ============================================================================

/// Classify a data key for permission resolution
pub fn classify(key: &B256) -> DataKeyClass {
    let bytes = key.as_slice();

    if bytes.starts_with(&PERMISSIONS_NAMESPACE) {
        let controller = || Address::from_slice(&bytes[12..]);
        return if bytes.starts_with(&PERMISSIONS_PREFIX) {
            DataKeyClass::Permissions(controller())
        } else if bytes.starts_with(&ALLOWED_CALLS_PREFIX) {
            DataKeyClass::AllowedCalls(controller())
        } else if bytes.starts_with(&ALLOWED_DATA_KEYS_PREFIX) {
            DataKeyClass::AllowedDataKeys(controller())
        } else {
            DataKeyClass::UnrecognizedPermission
        };
    }

    if *key == ADDRESS_PERMISSIONS_ARRAY_KEY {
        return DataKeyClass::PermissionsArrayLength;
    }

    if bytes.starts_with(&ADDRESS_PERMISSIONS_ARRAY_PREFIX) {
        let mut index = [0u8; 16];
        index.copy_from_slice(&bytes[16..]);
        return DataKeyClass::PermissionsArrayIndex(u128::from_be_bytes(index));
    }

    if *key == UNIVERSAL_RECEIVER_DELEGATE_KEY || bytes.starts_with(&UNIVERSAL_RECEIVER_DELEGATE_PREFIX) {
        return DataKeyClass::UniversalReceiverDelegate;
    }

    if bytes.starts_with(&EXTENSION_PREFIX) {
        return DataKeyClass::Extension;
    }

    DataKeyClass::Regular
}
