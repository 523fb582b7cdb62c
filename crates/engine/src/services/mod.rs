// Authorization services - each service judges one family of actions
//
// Services only read the account. They never write, so an authorization
// check can run before anything is executed and be repeated freely.

mod call_service;
mod data_service;
mod ownership_service;

pub use call_service::CallService;
pub use data_service::DataService;
pub use ownership_service::OwnershipService;

use crate::{ControlledAccount, EngineError};
use alloy_primitives::Address;
use keyguard_state::ControllerRegistry;
use keyguard_tx::ProposedAction;
use keyguard_types::Permissions;

/// Fail with `NotAuthorised` unless `granted` includes `needed`
pub(crate) fn require(caller: Address, granted: Permissions, needed: Permissions) -> Result<(), EngineError> {
    if granted.has_all(needed) {
        return Ok(());
    }
    let missing = needed.without(granted);
    let name = missing
        .names()
        .first()
        .copied()
        .unwrap_or("UNKNOWN_PERMISSION");
    Err(EngineError::not_authorised(caller, name))
}

/// Decides whether a controller may perform an action on an account
#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    key_manager: Address,
    call_service: CallService,
    data_service: DataService,
    ownership_service: OwnershipService,
}

impl Authorizer {
    pub fn new(key_manager: Address) -> Self {
        Self {
            key_manager,
            call_service: CallService,
            data_service: DataService,
            ownership_service: OwnershipService,
        }
    }

    /// Permissions of `caller`; absent and all-zero bitmaps are both rejected
    pub fn permissions_of<A>(&self, account: &A, caller: Address) -> Result<Permissions, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        ControllerRegistry::new(account)
            .permissions_of(caller)
            .ok_or(EngineError::NoPermissionsSet(caller))
    }

    /// Check `action` against the permissions `caller` holds on `account`
    pub fn authorize<A>(&self, account: &A, caller: Address, action: &ProposedAction) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let permissions = self.permissions_of(account, caller)?;

        match action {
            ProposedAction::TransferValue { to, value } => {
                self.call_service
                    .verify_call(account, self.key_manager, caller, permissions, *to, *value, &[])
            }
            ProposedAction::Call { target, value, data } => {
                self.call_service
                    .verify_call(account, self.key_manager, caller, permissions, *target, *value, data)
            }
            ProposedAction::StaticCall { target, value, data } => {
                self.call_service
                    .verify_static_call(account, caller, permissions, *target, *value, data)
            }
            ProposedAction::DelegateCall { target, value, data } => {
                self.call_service
                    .verify_delegate_call(account, caller, permissions, *target, *value, data)
            }
            ProposedAction::Deploy { value, .. } => self.call_service.verify_deploy(caller, permissions, *value),
            ProposedAction::SetData { entries } => {
                self.data_service
                    .verify_set_data(account, caller, permissions, entries)
            }
            ProposedAction::TransferOwnership { .. }
            | ProposedAction::AcceptOwnership
            | ProposedAction::RenounceOwnership => self.ownership_service.verify(caller, permissions),
        }
    }
}
