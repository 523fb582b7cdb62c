// Byte lengths of values stored under permission keys

/// `AddressPermissions[index]` value (`address`)
pub(crate) const ARRAY_INDEX_VALUE_LEN: usize = 20;

/// One Allowed-Calls entry: call types, address, interface id, selector
pub(crate) const ALLOWED_CALL_ENTRY_LEN: usize = 32;

/// Longest Allowed-Data-Keys prefix
pub(crate) const MAX_DATA_KEY_PREFIX_LEN: usize = 32;
