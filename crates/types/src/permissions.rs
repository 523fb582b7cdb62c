use crate::U256;
use alloy_primitives::hex;
use serde::{Deserialize, Serialize};

const fn flag(bit: u32) -> U256 {
    U256::from_limbs([1u64 << bit, 0, 0, 0])
}

/// Controller permission bitmap
///
/// A 256-bit value stored as 32 big-endian bytes under
/// `AddressPermissions:Permissions:<address>`. Only the low 23 bits carry
/// meaning today; unknown bits are preserved but never grant anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub U256);

impl Permissions {
    pub const CHANGE_OWNER: Self = Self(flag(0));
    pub const ADD_CONTROLLER: Self = Self(flag(1));
    pub const EDIT_PERMISSIONS: Self = Self(flag(2));
    pub const ADD_EXTENSIONS: Self = Self(flag(3));
    pub const CHANGE_EXTENSIONS: Self = Self(flag(4));
    pub const ADD_UNIVERSAL_RECEIVER_DELEGATE: Self = Self(flag(5));
    pub const CHANGE_UNIVERSAL_RECEIVER_DELEGATE: Self = Self(flag(6));
    pub const REENTRANCY: Self = Self(flag(7));
    pub const SUPER_TRANSFER_VALUE: Self = Self(flag(8));
    pub const TRANSFER_VALUE: Self = Self(flag(9));
    pub const SUPER_CALL: Self = Self(flag(10));
    pub const CALL: Self = Self(flag(11));
    pub const SUPER_STATIC_CALL: Self = Self(flag(12));
    pub const STATIC_CALL: Self = Self(flag(13));
    pub const SUPER_DELEGATE_CALL: Self = Self(flag(14));
    pub const DELEGATE_CALL: Self = Self(flag(15));
    pub const DEPLOY: Self = Self(flag(16));
    pub const SUPER_SET_DATA: Self = Self(flag(17));
    pub const SET_DATA: Self = Self(flag(18));
    pub const ENCRYPT: Self = Self(flag(19));
    pub const DECRYPT: Self = Self(flag(20));
    pub const SIGN: Self = Self(flag(21));
    pub const EXECUTE_RELAY_CALL: Self = Self(flag(22));

    /// Every permission except `REENTRANCY`, `SUPER_DELEGATE_CALL` and
    /// `DELEGATE_CALL`, which must always be granted explicitly.
    pub const ALL_PERMISSIONS: Self = Self(U256::from_limbs([0x7f3f7f, 0, 0, 0]));

    /// Flag table in bit order, used for naming and parsing.
    pub const NAMED: [(Self, &'static str); 23] = [
        (Self::CHANGE_OWNER, "CHANGE_OWNER"),
        (Self::ADD_CONTROLLER, "ADD_CONTROLLER"),
        (Self::EDIT_PERMISSIONS, "EDIT_PERMISSIONS"),
        (Self::ADD_EXTENSIONS, "ADD_EXTENSIONS"),
        (Self::CHANGE_EXTENSIONS, "CHANGE_EXTENSIONS"),
        (Self::ADD_UNIVERSAL_RECEIVER_DELEGATE, "ADD_UNIVERSAL_RECEIVER_DELEGATE"),
        (Self::CHANGE_UNIVERSAL_RECEIVER_DELEGATE, "CHANGE_UNIVERSAL_RECEIVER_DELEGATE"),
        (Self::REENTRANCY, "REENTRANCY"),
        (Self::SUPER_TRANSFER_VALUE, "SUPER_TRANSFER_VALUE"),
        (Self::TRANSFER_VALUE, "TRANSFER_VALUE"),
        (Self::SUPER_CALL, "SUPER_CALL"),
        (Self::CALL, "CALL"),
        (Self::SUPER_STATIC_CALL, "SUPER_STATIC_CALL"),
        (Self::STATIC_CALL, "STATIC_CALL"),
        (Self::SUPER_DELEGATE_CALL, "SUPER_DELEGATE_CALL"),
        (Self::DELEGATE_CALL, "DELEGATE_CALL"),
        (Self::DEPLOY, "DEPLOY"),
        (Self::SUPER_SET_DATA, "SUPER_SET_DATA"),
        (Self::SET_DATA, "SET_DATA"),
        (Self::ENCRYPT, "ENCRYPT"),
        (Self::DECRYPT, "DECRYPT"),
        (Self::SIGN, "SIGN"),
        (Self::EXECUTE_RELAY_CALL, "EXECUTE_RELAY_CALL"),
    ];

    pub const fn new(bits: U256) -> Self {
        Self(bits)
    }

    pub const fn empty() -> Self {
        Self(U256::ZERO)
    }

    pub const fn all() -> Self {
        Self::ALL_PERMISSIONS
    }

    /// Bitwise OR of all given flags
    pub fn combine(flags: impl IntoIterator<Item = Self>) -> Self {
        flags.into_iter().fold(Self::empty(), |acc, flag| acc | flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_zero()
    }

    /// True when any bit of `permission` is set
    pub fn has(&self, permission: Self) -> bool {
        !(self.0 & permission.0).is_zero()
    }

    /// True when every bit of `permissions` is set
    pub fn has_all(&self, permissions: Self) -> bool {
        (self.0 & permissions.0) == permissions.0
    }

    pub fn has_any(&self, permissions: Self) -> bool {
        self.has(permissions)
    }

    pub fn with(self, permission: Self) -> Self {
        self | permission
    }

    pub fn without(self, permission: Self) -> Self {
        Self(self.0 & !permission.0)
    }

    /// Name of a single flag, `None` for composite or unknown values
    pub fn name_of(permission: Self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(flag, _)| *flag == permission)
            .map(|(_, name)| *name)
    }

    /// Look up a flag by its name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, flag_name)| flag_name.eq_ignore_ascii_case(name))
            .map(|(flag, _)| *flag)
    }

    /// Names of every known flag set in this bitmap, in bit order
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.has(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Read a stored value with `bytes32` semantics: shorter values are
    /// right-padded with zeros, longer values are truncated.
    pub fn from_data_value(value: &[u8]) -> Self {
        let mut word = [0u8; 32];
        let len = value.len().min(32);
        word[..len].copy_from_slice(&value[..len]);
        Self(U256::from_be_bytes(word))
    }

    /// The 32-byte big-endian value stored in the account
    pub fn to_data_value(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }
}

impl core::fmt::Display for Permissions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode_prefixed(self.to_data_value()))
    }
}

impl From<U256> for Permissions {
    fn from(bits: U256) -> Self {
        Self(bits)
    }
}

impl From<u64> for Permissions {
    fn from(bits: u64) -> Self {
        Self(U256::from(bits))
    }
}

impl From<Permissions> for U256 {
    fn from(perms: Permissions) -> Self {
        perms.0
    }
}

impl core::ops::BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::ops::BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl core::ops::BitAndAssign for Permissions {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}
