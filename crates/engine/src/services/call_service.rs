use super::require;
use crate::{
    ControlledAccount, EngineError,
    allowed_calls::{self, CallRequest, CallTypes},
};
use alloy_primitives::{Address, U256};
use keyguard_state::ControllerRegistry;
use keyguard_types::{Permissions, selector_of};

/// Call service judges value transfers, calls and deployments
#[derive(Debug, Default, Clone, Copy)]
pub struct CallService;

impl CallService {
    /// Value transfers and regular calls.
    ///
    /// Value needs TRANSFER_VALUE, data (or no value at all) needs CALL. A
    /// SUPER_ permission stands in for its base flag and takes that part out
    /// of the Allowed-Calls check.
    #[allow(clippy::too_many_arguments)]
    pub fn verify_call<A>(
        &self,
        account: &A,
        key_manager: Address,
        caller: Address,
        permissions: Permissions,
        target: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        if target == key_manager {
            return Err(EngineError::CallingKeyManagerNotAllowed);
        }

        let transfers_value = !value.is_zero();
        let calls = !data.is_empty() || !transfers_value;

        let mut needed = Permissions::empty();
        let mut call_types = CallTypes::empty();
        if transfers_value && !permissions.has(Permissions::SUPER_TRANSFER_VALUE) {
            needed |= Permissions::TRANSFER_VALUE;
            call_types |= CallTypes::VALUE;
        }
        if calls && !permissions.has(Permissions::SUPER_CALL) {
            needed |= Permissions::CALL;
            call_types |= CallTypes::CALL;
        }

        require(caller, permissions, needed)?;
        if call_types.is_empty() {
            return Ok(());
        }
        self.verify_allowed_call(account, caller, target, data, call_types)
    }

    pub fn verify_static_call<A>(
        &self,
        account: &A,
        caller: Address,
        permissions: Permissions,
        target: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        if !value.is_zero() {
            return Err(EngineError::MsgValueDisallowedInStaticCall);
        }
        if permissions.has(Permissions::SUPER_STATIC_CALL) {
            return Ok(());
        }
        require(caller, permissions, Permissions::STATIC_CALL)?;
        self.verify_allowed_call(account, caller, target, data, CallTypes::STATIC_CALL)
    }

    pub fn verify_delegate_call<A>(
        &self,
        account: &A,
        caller: Address,
        permissions: Permissions,
        target: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        if !value.is_zero() {
            return Err(EngineError::MsgValueDisallowedInDelegateCall);
        }
        if permissions.has(Permissions::SUPER_DELEGATE_CALL) {
            return Ok(());
        }
        require(caller, permissions, Permissions::DELEGATE_CALL)?;
        self.verify_allowed_call(account, caller, target, data, CallTypes::DELEGATE_CALL)
    }

    /// Deployments ignore Allowed-Calls; a funded one also needs
    /// SUPER_TRANSFER_VALUE
    pub fn verify_deploy(&self, caller: Address, permissions: Permissions, value: U256) -> Result<(), EngineError> {
        require(caller, permissions, Permissions::DEPLOY)?;
        if !value.is_zero() {
            require(caller, permissions, Permissions::SUPER_TRANSFER_VALUE)?;
        }
        Ok(())
    }

    fn verify_allowed_call<A>(
        &self,
        account: &A,
        caller: Address,
        target: Address,
        data: &[u8],
        required: CallTypes,
    ) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let stored = ControllerRegistry::new(account)
            .allowed_calls_of(caller)
            .ok_or(EngineError::NoCallsAllowed(caller))?;
        let entries =
            allowed_calls::decode(&stored).map_err(|_| EngineError::InvalidEncodedAllowedCalls(stored.clone()))?;
        if entries.is_empty() {
            return Err(EngineError::NoCallsAllowed(caller));
        }

        let request = CallRequest {
            target,
            selector: selector_of(data),
            required,
        };
        match allowed_calls::find_match(&entries, &request, |target, id| account.supports_interface(target, id)) {
            Some(entry) => {
                tracing::trace!(%caller, %target, call_types = entry.call_types.0, "Allowed call matched");
                Ok(())
            }
            None => {
                tracing::warn!(%caller, %target, selector = %request.selector, "Call not in allowed calls");
                Err(EngineError::NotAllowedCall {
                    caller,
                    target,
                    selector: request.selector,
                })
            }
        }
    }
}
