use super::require;
use crate::EngineError;
use alloy_primitives::Address;
use keyguard_types::Permissions;

/// Ownership service judges LSP14 ownership actions
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnershipService;

impl OwnershipService {
    /// Transfer, accept and renounce all need CHANGE_OWNER
    pub fn verify(&self, caller: Address, permissions: Permissions) -> Result<(), EngineError> {
        require(caller, permissions, Permissions::CHANGE_OWNER)
    }
}
