use crate::{DataStore, StateError};
use alloy_primitives::{Address, Bytes};
use keyguard_types::{
    DataEntry, Permissions,
    data_keys::{
        ADDRESS_PERMISSIONS_ARRAY_KEY, allowed_calls_key, allowed_data_keys_key, permissions_array_index_key,
        permissions_key,
    },
};

/// Encode an `AddressPermissions[]` length value
pub fn encode_array_length(length: u128) -> Bytes {
    Bytes::copy_from_slice(&length.to_be_bytes())
}

/// Decode an `AddressPermissions[]` length value; empty means zero
pub fn decode_array_length(value: &[u8]) -> Option<u128> {
    match value.len() {
        0 => Some(0),
        16 => {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(value);
            Some(u128::from_be_bytes(buf))
        }
        _ => None,
    }
}

/// Read-only view over the controllers recorded in an account
///
/// Controllers are listed in the `AddressPermissions[]` array and each has a
/// permission bitmap under `AddressPermissions:Permissions:<address>`.
pub struct ControllerRegistry<'a, S: DataStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DataStore + ?Sized> ControllerRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Number of listed controllers
    pub fn len(&self) -> Result<u128, StateError> {
        let value = self.store.get_data(&ADDRESS_PERMISSIONS_ARRAY_KEY).unwrap_or_default();
        decode_array_length(&value).ok_or(StateError::MalformedArrayLength(value))
    }

    pub fn is_empty(&self) -> Result<bool, StateError> {
        Ok(self.len()? == 0)
    }

    /// Controller at `index`, `None` when the slot is empty
    pub fn at(&self, index: u128) -> Result<Option<Address>, StateError> {
        let key = permissions_array_index_key(index);
        match self.store.get_data(&key) {
            None => Ok(None),
            Some(value) if value.len() == 20 => Ok(Some(Address::from_slice(&value))),
            Some(value) => Err(StateError::MalformedArrayEntry { key, value }),
        }
    }

    /// Every listed controller in index order
    pub fn controllers(&self) -> Result<Vec<Address>, StateError> {
        let len = self.len()?;
        let mut controllers = Vec::new();
        for index in 0..len {
            let controller = self.at(index)?.ok_or_else(|| StateError::MalformedArrayEntry {
                key: permissions_array_index_key(index),
                value: Bytes::new(),
            })?;
            controllers.push(controller);
        }
        Ok(controllers)
    }

    /// Permission bitmap of `controller`, `None` when absent or zero
    pub fn permissions_of(&self, controller: Address) -> Option<Permissions> {
        self.store
            .get_data(&permissions_key(controller))
            .map(|value| Permissions::from_data_value(&value))
            .filter(|permissions| !permissions.is_empty())
    }

    /// Raw Allowed-Calls value of `controller`
    pub fn allowed_calls_of(&self, controller: Address) -> Option<Bytes> {
        self.store.get_data(&allowed_calls_key(controller))
    }

    /// Raw Allowed-Data-Keys value of `controller`
    pub fn allowed_data_keys_of(&self, controller: Address) -> Option<Bytes> {
        self.store.get_data(&allowed_data_keys_key(controller))
    }

    /// Array index of `controller`; the scan stops at the first empty slot
    pub fn position_of(&self, controller: Address) -> Result<Option<u128>, StateError> {
        let len = self.len()?;
        for index in 0..len {
            match self.at(index)? {
                Some(listed) if listed == controller => return Ok(Some(index)),
                Some(_) => {}
                None => break,
            }
        }
        Ok(None)
    }

    /// Listed controllers that hold no permissions
    pub fn orphaned(&self) -> Result<Vec<Address>, StateError> {
        Ok(self
            .controllers()?
            .into_iter()
            .filter(|controller| self.permissions_of(*controller).is_none())
            .collect())
    }

    /// Writes that register `controller` with `permissions`.
    ///
    /// A controller that is already listed only gets its bitmap replaced.
    pub fn plan_add(&self, controller: Address, permissions: Permissions) -> Result<Vec<DataEntry>, StateError> {
        let mut plan = Vec::with_capacity(3);
        if self.position_of(controller)?.is_none() {
            let len = self.len()?;
            let new_len = len.checked_add(1).ok_or(StateError::ArrayLengthOverflow)?;
            plan.push(DataEntry::new(ADDRESS_PERMISSIONS_ARRAY_KEY, encode_array_length(new_len)));
            plan.push(DataEntry::new(
                permissions_array_index_key(len),
                Bytes::copy_from_slice(controller.as_slice()),
            ));
        }
        plan.push(DataEntry::new(
            permissions_key(controller),
            Bytes::copy_from_slice(&permissions.to_data_value()),
        ));
        Ok(plan)
    }

    /// Writes that unlist `controller` and clear its permission records.
    ///
    /// The last entry is moved into the freed slot so the array stays dense.
    pub fn plan_remove(&self, controller: Address) -> Result<Vec<DataEntry>, StateError> {
        let position = self
            .position_of(controller)?
            .ok_or(StateError::ControllerNotListed(controller))?;
        let last = self.len()? - 1;

        let mut plan = Vec::with_capacity(6);
        if position != last
            && let Some(moved) = self.at(last)?
        {
            plan.push(DataEntry::new(
                permissions_array_index_key(position),
                Bytes::copy_from_slice(moved.as_slice()),
            ));
        }
        plan.push(DataEntry::new(permissions_array_index_key(last), Bytes::new()));
        plan.push(DataEntry::new(ADDRESS_PERMISSIONS_ARRAY_KEY, encode_array_length(last)));
        plan.push(DataEntry::new(permissions_key(controller), Bytes::new()));
        if self.allowed_calls_of(controller).is_some() {
            plan.push(DataEntry::new(allowed_calls_key(controller), Bytes::new()));
        }
        if self.allowed_data_keys_of(controller).is_some() {
            plan.push(DataEntry::new(allowed_data_keys_key(controller), Bytes::new()));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn apply(store: &mut MemoryStore, plan: Vec<DataEntry>) {
        for entry in plan {
            store.set_data(entry.key, entry.value);
        }
    }

    #[test]
    fn test_empty_registry() {
        let store = MemoryStore::new();
        let registry = ControllerRegistry::new(&store);
        assert_eq!(registry.len().unwrap(), 0);
        assert!(registry.controllers().unwrap().is_empty());
        assert_eq!(registry.permissions_of(Address::ZERO), None);
    }

    #[test]
    fn test_add_then_remove_controllers() {
        let alice = Address::with_last_byte(0xa1);
        let bob = Address::with_last_byte(0xb0);
        let carol = Address::with_last_byte(0xc0);
        let mut store = MemoryStore::new();

        for controller in [alice, bob, carol] {
            let plan = ControllerRegistry::new(&store)
                .plan_add(controller, Permissions::CALL)
                .unwrap();
            apply(&mut store, plan);
        }

        let registry = ControllerRegistry::new(&store);
        assert_eq!(registry.controllers().unwrap(), vec![alice, bob, carol]);
        assert_eq!(registry.permissions_of(bob), Some(Permissions::CALL));

        let plan = registry.plan_remove(alice).unwrap();
        apply(&mut store, plan);

        let registry = ControllerRegistry::new(&store);
        assert_eq!(registry.controllers().unwrap(), vec![carol, bob]);
        assert_eq!(registry.permissions_of(alice), None);
        assert_eq!(registry.at(2).unwrap(), None);
    }

    #[test]
    fn test_re_adding_only_updates_permissions() {
        let alice = Address::with_last_byte(0xa1);
        let mut store = MemoryStore::new();
        let plan = ControllerRegistry::new(&store).plan_add(alice, Permissions::CALL).unwrap();
        apply(&mut store, plan);

        let plan = ControllerRegistry::new(&store)
            .plan_add(alice, Permissions::SET_DATA)
            .unwrap();
        assert_eq!(plan.len(), 1);
        apply(&mut store, plan);
        assert_eq!(ControllerRegistry::new(&store).len().unwrap(), 1);
    }

    #[test]
    fn test_malformed_values_are_reported() {
        let mut store = MemoryStore::new();
        store.set_data(ADDRESS_PERMISSIONS_ARRAY_KEY, Bytes::from(vec![1, 2, 3]));
        assert!(matches!(
            ControllerRegistry::new(&store).len(),
            Err(StateError::MalformedArrayLength(_))
        ));

        store.set_data(ADDRESS_PERMISSIONS_ARRAY_KEY, encode_array_length(1));
        store.set_data(permissions_array_index_key(0), Bytes::from(vec![0xaa; 19]));
        assert!(matches!(
            ControllerRegistry::new(&store).controllers(),
            Err(StateError::MalformedArrayEntry { .. })
        ));
    }

    #[test]
    fn test_add_to_full_array_is_refused() {
        let alice = Address::with_last_byte(0xa1);
        let mut store = MemoryStore::new();
        store.set_data(ADDRESS_PERMISSIONS_ARRAY_KEY, encode_array_length(u128::MAX));
        store.set_data(permissions_array_index_key(0), Bytes::copy_from_slice(alice.as_slice()));

        let registry = ControllerRegistry::new(&store);
        assert!(matches!(
            registry.plan_add(Address::with_last_byte(0xb0), Permissions::CALL),
            Err(StateError::ArrayLengthOverflow)
        ));
        // Listed controllers can still be updated
        assert_eq!(registry.plan_add(alice, Permissions::SET_DATA).unwrap().len(), 1);
    }

    #[test]
    fn test_orphaned_controllers() {
        let alice = Address::with_last_byte(0xa1);
        let mut store = MemoryStore::new();
        store.set_data(ADDRESS_PERMISSIONS_ARRAY_KEY, encode_array_length(1));
        store.set_data(permissions_array_index_key(0), Bytes::copy_from_slice(alice.as_slice()));

        assert_eq!(ControllerRegistry::new(&store).orphaned().unwrap(), vec![alice]);
    }

    #[test]
    fn test_remove_unknown_controller() {
        let store = MemoryStore::new();
        let err = ControllerRegistry::new(&store)
            .plan_remove(Address::with_last_byte(1))
            .unwrap_err();
        assert_eq!(err, StateError::ControllerNotListed(Address::with_last_byte(1)));
    }
}
