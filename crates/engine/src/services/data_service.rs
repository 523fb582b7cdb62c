use super::require;
use crate::{
    ControlledAccount, EngineError, allowed_calls, allowed_data_keys,
    constants::ARRAY_INDEX_VALUE_LEN,
};
use alloy_primitives::{Address, Bytes};
use keyguard_state::{ControllerRegistry, decode_array_length};
use keyguard_types::{DataEntry, DataKeyClass, Permissions, classify};

/// Data service judges ERC725Y writes
///
/// Permission keys are guarded by ADD_CONTROLLER / EDIT_PERMISSIONS, LSP1
/// and LSP17 keys by their ADD_ / CHANGE_ pairs, and every other key by
/// SET_DATA plus the caller's Allowed-Data-Keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataService;

impl DataService {
    /// Check every entry in order; the first failure rejects the whole write
    pub fn verify_set_data<A>(
        &self,
        account: &A,
        caller: Address,
        permissions: Permissions,
        entries: &[DataEntry],
    ) -> Result<(), EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let mut allowed_keys: Option<Vec<Bytes>> = None;

        for entry in entries {
            match classify(&entry.key) {
                DataKeyClass::Regular => {
                    if permissions.has(Permissions::SUPER_SET_DATA) {
                        continue;
                    }
                    require(caller, permissions, Permissions::SET_DATA)?;

                    if allowed_keys.is_none() {
                        allowed_keys = Some(self.allowed_data_keys(account, caller)?);
                    }
                    let prefixes = allowed_keys.as_deref().unwrap_or_default();
                    if !allowed_data_keys::matches(prefixes, &entry.key) {
                        tracing::warn!(%caller, key = %entry.key, "Data key not allowed");
                        return Err(EngineError::NotAllowedERC725YDataKey { caller, key: entry.key });
                    }
                }
                class => {
                    let needed = self.permission_for(account, class, entry)?;
                    require(caller, permissions, needed)?;
                }
            }
        }

        Ok(())
    }

    /// Permission needed to write a non-regular key
    fn permission_for<A>(&self, account: &A, class: DataKeyClass, entry: &DataEntry) -> Result<Permissions, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let registry = ControllerRegistry::new(account);
        let key = entry.key;
        let value = &entry.value;

        let permission = match class {
            DataKeyClass::PermissionsArrayLength => {
                let new_length = decode_array_length(value).ok_or_else(|| EngineError::InvalidArrayLengthValue {
                    key,
                    value: value.clone(),
                })?;
                add_or_edit(new_length > registry.len()?)
            }
            DataKeyClass::PermissionsArrayIndex(_) => {
                if value.len() != ARRAY_INDEX_VALUE_LEN && !value.is_empty() {
                    return Err(EngineError::AddressPermissionArrayIndexValueNotAnAddress {
                        key,
                        value: value.clone(),
                    });
                }
                add_or_edit(account.get_data(&key).is_none())
            }
            DataKeyClass::Permissions(controller) => add_or_edit(registry.permissions_of(controller).is_none()),
            DataKeyClass::AllowedCalls(controller) => {
                if !value.is_empty() {
                    allowed_calls::decode(value).map_err(|_| EngineError::InvalidEncodedAllowedCalls(value.clone()))?;
                }
                add_or_edit(registry.permissions_of(controller).is_none())
            }
            DataKeyClass::AllowedDataKeys(controller) => {
                if !value.is_empty() {
                    allowed_data_keys::decode(value)
                        .map_err(|_| EngineError::InvalidEncodedAllowedERC725YDataKeys(value.clone()))?;
                }
                add_or_edit(registry.permissions_of(controller).is_none())
            }
            DataKeyClass::UnrecognizedPermission => return Err(EngineError::UnrecognizedPermissionKey(key)),
            DataKeyClass::UniversalReceiverDelegate => {
                if account.get_data(&key).is_none() {
                    Permissions::ADD_UNIVERSAL_RECEIVER_DELEGATE
                } else {
                    Permissions::CHANGE_UNIVERSAL_RECEIVER_DELEGATE
                }
            }
            DataKeyClass::Extension => {
                if account.get_data(&key).is_none() {
                    Permissions::ADD_EXTENSIONS
                } else {
                    Permissions::CHANGE_EXTENSIONS
                }
            }
            DataKeyClass::Regular => Permissions::SET_DATA,
        };

        Ok(permission)
    }

    fn allowed_data_keys<A>(&self, account: &A, caller: Address) -> Result<Vec<Bytes>, EngineError>
    where
        A: ControlledAccount + ?Sized,
    {
        let stored = ControllerRegistry::new(account)
            .allowed_data_keys_of(caller)
            .ok_or(EngineError::NoERC725YDataKeysAllowed(caller))?;
        let prefixes = allowed_data_keys::decode(&stored)
            .map_err(|_| EngineError::InvalidEncodedAllowedERC725YDataKeys(stored.clone()))?;
        if prefixes.is_empty() {
            return Err(EngineError::NoERC725YDataKeysAllowed(caller));
        }
        Ok(prefixes)
    }
}

fn add_or_edit(adds: bool) -> Permissions {
    if adds {
        Permissions::ADD_CONTROLLER
    } else {
        Permissions::EDIT_PERMISSIONS
    }
}
