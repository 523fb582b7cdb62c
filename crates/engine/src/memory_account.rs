use crate::{AccountError, ControlledAccount, OutgoingCall, OwnershipChange, ReentryHook};
use alloy_primitives::{Address, B256, Bytes, U256};
use keyguard_state::{AccountSnapshot, Checkpoint, ControllerRegistry, DataChanged, DataStore, MemoryStore, StateError};
use keyguard_tx::{OperationType, Selector};
use keyguard_types::{
    DataEntry, Permissions,
    data_keys::{allowed_calls_key, allowed_data_keys_key},
};
use std::collections::{HashMap, HashSet};

/// How a simulated contract responds when the account calls it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetBehavior {
    /// Return these bytes
    Return(Bytes),
    /// Revert with a reason
    Revert(String),
    /// Call the key manager back with this ERC725 payload
    CallBack(Bytes),
}

#[derive(Debug, Clone)]
struct Savepoint {
    balance: U256,
    owner: Address,
    pending_owner: Option<Address>,
    executed: usize,
    deploy_nonce: u64,
}

/// In-memory ERC725 account
///
/// Simulates everything the key manager needs from an account: a journaled
/// data store, a native balance, LSP14 ownership and scripted callees.
#[derive(Debug, Clone)]
pub struct MemoryAccount {
    address: Address,
    owner: Address,
    pending_owner: Option<Address>,
    balance: U256,
    store: MemoryStore,
    targets: HashMap<Address, TargetBehavior>,
    interfaces: HashSet<(Address, Selector)>,
    executed: Vec<OutgoingCall>,
    deploy_nonce: u64,
    savepoints: Vec<Savepoint>,
}

impl MemoryAccount {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            pending_owner: None,
            balance: U256::ZERO,
            store: MemoryStore::new(),
            targets: HashMap::new(),
            interfaces: HashSet::new(),
            executed: Vec::new(),
            deploy_nonce: 1,
            savepoints: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Self {
        Self {
            balance: snapshot.balance,
            store: snapshot.to_store(),
            ..Self::new(snapshot.account, snapshot.owner)
        }
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot::capture(self.address, self.owner, self.balance, &self.store)
    }

    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    // ============================================================================
    // Setup (bypasses the key manager)
    // ============================================================================

    /// Register `controller` with `permissions`
    pub fn grant(&mut self, controller: Address, permissions: Permissions) -> Result<(), StateError> {
        let plan = ControllerRegistry::new(&self.store).plan_add(controller, permissions)?;
        self.apply(plan);
        Ok(())
    }

    /// Unlist `controller` and clear its permission records
    pub fn revoke(&mut self, controller: Address) -> Result<(), StateError> {
        let plan = ControllerRegistry::new(&self.store).plan_remove(controller)?;
        self.apply(plan);
        Ok(())
    }

    pub fn set_allowed_calls(&mut self, controller: Address, value: Bytes) {
        self.store.set_data(allowed_calls_key(controller), value);
    }

    pub fn set_allowed_data_keys(&mut self, controller: Address, value: Bytes) {
        self.store.set_data(allowed_data_keys_key(controller), value);
    }

    fn apply(&mut self, plan: Vec<DataEntry>) {
        for entry in plan {
            self.store.set_data(entry.key, entry.value);
        }
    }

    /// Script the response of the contract at `target`
    pub fn set_target(&mut self, target: Address, behavior: TargetBehavior) {
        self.targets.insert(target, behavior);
    }

    /// Declare that `target` supports the ERC165 interface `interface_id`
    pub fn register_interface(&mut self, target: Address, interface_id: Selector) {
        self.interfaces.insert((target, interface_id));
    }

    // ============================================================================
    // Inspection
    // ============================================================================

    /// Calls performed so far, oldest first
    pub fn executed(&self) -> &[OutgoingCall] {
        &self.executed
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn take_data_events(&mut self) -> Vec<DataChanged> {
        self.store.take_events()
    }

    fn next_contract_address(&self, call: &OutgoingCall) -> Address {
        match call.operation {
            OperationType::Create2 => {
                // init code ‖ bytes32 salt
                let split = call.data.len().saturating_sub(32);
                let (code, salt) = call.data.split_at(split);
                let mut word = [0u8; 32];
                word[32 - salt.len()..].copy_from_slice(salt);
                self.address.create2_from_code(word, code)
            }
            _ => self.address.create(self.deploy_nonce),
        }
    }

    fn debit(&mut self, value: U256) -> Result<(), AccountError> {
        self.balance = self
            .balance
            .checked_sub(value)
            .ok_or(AccountError::InsufficientBalance {
                required: value,
                available: self.balance,
            })?;
        Ok(())
    }
}

impl DataStore for MemoryAccount {
    fn get_data(&self, key: &B256) -> Option<Bytes> {
        self.store.get_data(key)
    }

    fn set_data(&mut self, key: B256, value: Bytes) {
        self.store.set_data(key, value);
    }

    fn checkpoint(&mut self) -> Checkpoint {
        let checkpoint = self.store.checkpoint();
        self.savepoints.push(Savepoint {
            balance: self.balance,
            owner: self.owner,
            pending_owner: self.pending_owner,
            executed: self.executed.len(),
            deploy_nonce: self.deploy_nonce,
        });
        checkpoint
    }

    fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), StateError> {
        self.store.commit(checkpoint)?;
        self.savepoints.pop();
        Ok(())
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) -> Result<(), StateError> {
        self.store.revert_to(checkpoint)?;
        let savepoint = self
            .savepoints
            .pop()
            .ok_or(StateError::InvalidCheckpoint(checkpoint.depth()))?;
        self.balance = savepoint.balance;
        self.owner = savepoint.owner;
        self.pending_owner = savepoint.pending_owner;
        self.executed.truncate(savepoint.executed);
        self.deploy_nonce = savepoint.deploy_nonce;
        Ok(())
    }
}

impl ControlledAccount for MemoryAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn balance(&self) -> U256 {
        self.balance
    }

    fn receive_value(&mut self, _from: Address, value: U256) {
        self.balance = self.balance.saturating_add(value);
    }

    fn perform_call(&mut self, call: &OutgoingCall, hook: &mut dyn ReentryHook) -> Result<Bytes, AccountError> {
        self.debit(call.value)?;
        self.executed.push(call.clone());

        if matches!(call.operation, OperationType::Create | OperationType::Create2) {
            let deployed = self.next_contract_address(call);
            self.deploy_nonce += 1;
            tracing::debug!(account = %self.address, %deployed, "Contract deployed");
            return Ok(Bytes::copy_from_slice(deployed.as_slice()));
        }

        match self.targets.get(&call.target).cloned() {
            None => Ok(Bytes::new()),
            Some(TargetBehavior::Return(output)) => Ok(output),
            Some(TargetBehavior::Revert(reason)) => Err(AccountError::CallFailed {
                target: call.target,
                reason,
            }),
            Some(TargetBehavior::CallBack(payload)) => hook
                .reenter(self, call.target, &payload)
                .map_err(|err| AccountError::Reentered(Box::new(err))),
        }
    }

    fn change_ownership(&mut self, change: OwnershipChange) -> Result<(), AccountError> {
        match change {
            OwnershipChange::Transfer(new_owner) => self.pending_owner = Some(new_owner),
            OwnershipChange::Accept => {
                self.owner = self.pending_owner.take().ok_or(AccountError::NoPendingOwner)?;
            }
            OwnershipChange::Renounce => {
                self.owner = Address::ZERO;
                self.pending_owner = None;
            }
        }
        Ok(())
    }

    fn supports_interface(&self, target: Address, interface_id: Selector) -> bool {
        self.interfaces.contains(&(target, interface_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;

    struct NoReentry;

    impl ReentryHook for NoReentry {
        fn reenter(
            &mut self,
            _account: &mut dyn ControlledAccount,
            _caller: Address,
            _payload: &[u8],
        ) -> Result<Bytes, EngineError> {
            Err(EngineError::CallingKeyManagerNotAllowed)
        }
    }

    fn call_to(target: Address, value: u64) -> OutgoingCall {
        OutgoingCall {
            operation: OperationType::Call,
            target,
            value: U256::from(value),
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_revert_restores_balance_and_data() {
        let mut account = MemoryAccount::new(Address::with_last_byte(0xaa), Address::ZERO).with_balance(U256::from(10));
        let checkpoint = account.checkpoint();

        account.set_data(B256::repeat_byte(1), Bytes::from(vec![1]));
        account
            .perform_call(&call_to(Address::with_last_byte(1), 4), &mut NoReentry)
            .unwrap();
        assert_eq!(account.balance(), U256::from(6));

        account.revert_to(checkpoint).unwrap();
        assert_eq!(account.balance(), U256::from(10));
        assert_eq!(account.get_data(&B256::repeat_byte(1)), None);
        assert!(account.executed().is_empty());
    }

    #[test]
    fn test_overdraft_fails() {
        let mut account = MemoryAccount::new(Address::with_last_byte(0xaa), Address::ZERO);
        let err = account
            .perform_call(&call_to(Address::with_last_byte(1), 1), &mut NoReentry)
            .unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientBalance {
                required: U256::from(1),
                available: U256::ZERO
            }
        );
    }

    #[test]
    fn test_callback_failure_is_wrapped() {
        let callee = Address::with_last_byte(7);
        let mut account = MemoryAccount::new(Address::with_last_byte(0xaa), Address::ZERO);
        account.set_target(callee, TargetBehavior::CallBack(Bytes::new()));

        let err = account.perform_call(&call_to(callee, 0), &mut NoReentry).unwrap_err();
        assert_eq!(err, AccountError::Reentered(Box::new(EngineError::CallingKeyManagerNotAllowed)));
        assert_eq!(EngineError::from(err), EngineError::CallingKeyManagerNotAllowed);
    }

    #[test]
    fn test_deployments_get_fresh_addresses() {
        let mut account = MemoryAccount::new(Address::with_last_byte(0xaa), Address::ZERO);
        let deploy = OutgoingCall {
            operation: OperationType::Create,
            target: Address::ZERO,
            value: U256::ZERO,
            data: Bytes::from(vec![0x60, 0x00]),
        };
        let first = account.perform_call(&deploy, &mut NoReentry).unwrap();
        let second = account.perform_call(&deploy, &mut NoReentry).unwrap();
        assert_eq!(first.len(), 20);
        assert_ne!(first, second);
    }

    #[test]
    fn test_two_step_ownership() {
        let new_owner = Address::with_last_byte(9);
        let mut account = MemoryAccount::new(Address::with_last_byte(0xaa), Address::with_last_byte(1));

        assert_eq!(
            account.change_ownership(OwnershipChange::Accept),
            Err(AccountError::NoPendingOwner)
        );
        account.change_ownership(OwnershipChange::Transfer(new_owner)).unwrap();
        assert_eq!(account.owner(), Address::with_last_byte(1));
        account.change_ownership(OwnershipChange::Accept).unwrap();
        assert_eq!(account.owner(), new_owner);
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_permissions() {
        let controller = Address::with_last_byte(3);
        let mut account = MemoryAccount::new(Address::with_last_byte(0xaa), Address::ZERO);
        account.grant(controller, Permissions::CALL).unwrap();

        let restored = MemoryAccount::from_snapshot(&account.snapshot());
        assert_eq!(
            ControllerRegistry::new(&restored).permissions_of(controller),
            Some(Permissions::CALL)
        );
    }
}
