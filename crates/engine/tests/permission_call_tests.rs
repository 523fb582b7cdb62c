//! Authorization tests for value transfers, calls, deployments and ownership
use alloy_primitives::{Address, Bytes, U256, address, fixed_bytes, hex};
use keyguard_engine::{
    ControlledAccount, EngineError, KeyManager, MemoryAccount,
    allowed_calls::{self, ANY_ADDRESS, ANY_FUNCTION, AllowedCall, CallTypes},
};
use keyguard_tx::{DeployKind, ProposedAction, Selector};
use keyguard_types::Permissions;

const KEY_MANAGER: Address = address!("00000000000000000000000000000000000004b4");
const ACCOUNT: Address = address!("000000000000000000000000000000000000acc0");
const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
const CAFE: Address = address!("000000000000000000000000000000000000cafe");
const BEEF: Address = address!("000000000000000000000000000000000000beef");
const TRANSFER: Selector = fixed_bytes!("a9059cbb");

fn setup(permissions: Permissions) -> (KeyManager, MemoryAccount) {
    let key_manager = KeyManager::new(KEY_MANAGER, 42);
    let mut account = MemoryAccount::new(ACCOUNT, KEY_MANAGER).with_balance(U256::from(1_000));
    account.grant(ALICE, permissions).unwrap();
    (key_manager, account)
}

fn transfer(to: Address, value: u64) -> ProposedAction {
    ProposedAction::TransferValue {
        to,
        value: U256::from(value),
    }
}

#[test]
fn test_unknown_caller_has_no_permissions() {
    let (mut km, mut account) = setup(Permissions::SUPER_CALL);
    let stranger = Address::with_last_byte(0x99);

    let err = km
        .execute(&mut account, stranger, &ProposedAction::call(CAFE, Bytes::new()))
        .unwrap_err();
    assert_eq!(err, EngineError::NoPermissionsSet(stranger));
}

#[test]
fn test_value_entry_only_allows_listed_address() {
    let (mut km, mut account) = setup(Permissions::TRANSFER_VALUE);
    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::any_function_of(CallTypes::VALUE, CAFE)]),
    );

    km.execute(&mut account, ALICE, &transfer(CAFE, 10)).unwrap();
    assert_eq!(account.balance(), U256::from(990));

    let err = km.execute(&mut account, ALICE, &transfer(BEEF, 10)).unwrap_err();
    assert_eq!(
        err,
        EngineError::NotAllowedCall {
            caller: ALICE,
            target: BEEF,
            selector: Selector::ZERO,
        }
    );
    assert_eq!(account.balance(), U256::from(990));
}

#[test]
fn test_missing_allowed_calls_denies() {
    let (km, account) = setup(Permissions::CALL);
    let err = km
        .authorize(&account, ALICE, &ProposedAction::call(CAFE, TRANSFER.to_vec()))
        .unwrap_err();
    assert_eq!(err, EngineError::NoCallsAllowed(ALICE));
}

#[test]
fn test_super_call_skips_allowed_calls() {
    let (km, account) = setup(Permissions::CALL | Permissions::SUPER_CALL);
    km.authorize(&account, ALICE, &ProposedAction::call(BEEF, TRANSFER.to_vec()))
        .unwrap();

    // SUPER_CALL alone does not cover the value part
    let call_with_value = ProposedAction::Call {
        target: BEEF,
        value: U256::from(1),
        data: Bytes::from(TRANSFER.to_vec()),
    };
    assert_eq!(
        km.authorize(&account, ALICE, &call_with_value).unwrap_err(),
        EngineError::NotAuthorised {
            caller: ALICE,
            permission: "TRANSFER_VALUE",
        }
    );
}

#[test]
fn test_super_transfer_value_alone_sends_anywhere() {
    let (mut km, mut account) = setup(Permissions::SUPER_TRANSFER_VALUE);
    km.execute(&mut account, ALICE, &transfer(BEEF, 1)).unwrap();
    km.execute(&mut account, ALICE, &transfer(CAFE, 1)).unwrap();
    assert_eq!(account.balance(), U256::from(998));
}

#[test]
fn test_super_call_alone_calls_anywhere() {
    let (km, account) = setup(Permissions::SUPER_CALL);
    km.authorize(&account, ALICE, &ProposedAction::call(BEEF, TRANSFER.to_vec()))
        .unwrap();
    km.authorize(&account, ALICE, &ProposedAction::call(CAFE, Bytes::new()))
        .unwrap();
}

#[test]
fn test_super_static_and_delegate_call_alone() {
    let static_call = ProposedAction::StaticCall {
        target: BEEF,
        value: U256::ZERO,
        data: Bytes::from(TRANSFER.to_vec()),
    };
    let delegate_call = ProposedAction::DelegateCall {
        target: BEEF,
        value: U256::ZERO,
        data: Bytes::from(TRANSFER.to_vec()),
    };

    let (km, account) = setup(Permissions::SUPER_STATIC_CALL);
    km.authorize(&account, ALICE, &static_call).unwrap();
    assert_eq!(
        km.authorize(&account, ALICE, &delegate_call).unwrap_err(),
        EngineError::NotAuthorised {
            caller: ALICE,
            permission: "DELEGATE_CALL",
        }
    );

    let (km, account) = setup(Permissions::SUPER_DELEGATE_CALL);
    km.authorize(&account, ALICE, &delegate_call).unwrap();
}

#[test]
fn test_super_transfer_value_leaves_only_the_call_part_to_match() {
    let (km, mut account) = setup(Permissions::SUPER_TRANSFER_VALUE | Permissions::CALL);
    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::any_function_of(CallTypes::CALL, CAFE)]),
    );
    let paying_call = |target| ProposedAction::Call {
        target,
        value: U256::from(1),
        data: Bytes::from(TRANSFER.to_vec()),
    };

    km.authorize(&account, ALICE, &paying_call(CAFE)).unwrap();
    assert_eq!(
        km.authorize(&account, ALICE, &paying_call(BEEF)).unwrap_err(),
        EngineError::NotAllowedCall {
            caller: ALICE,
            target: BEEF,
            selector: TRANSFER,
        }
    );
}

#[test]
fn test_value_and_data_need_both_call_types() {
    let (km, mut account) = setup(Permissions::TRANSFER_VALUE | Permissions::CALL);
    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::any_function_of(CallTypes::CALL, CAFE)]),
    );
    let paying_call = ProposedAction::Call {
        target: CAFE,
        value: U256::from(1),
        data: Bytes::from(TRANSFER.to_vec()),
    };
    assert!(matches!(
        km.authorize(&account, ALICE, &paying_call),
        Err(EngineError::NotAllowedCall { .. })
    ));

    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::new(
            CallTypes::VALUE | CallTypes::CALL,
            CAFE,
            fixed_bytes!("ffffffff"),
            TRANSFER,
        )]),
    );
    km.authorize(&account, ALICE, &paying_call).unwrap();
}

#[test]
fn test_missing_call_permission_is_named() {
    let (km, account) = setup(Permissions::TRANSFER_VALUE | Permissions::SUPER_TRANSFER_VALUE);
    let paying_call = ProposedAction::Call {
        target: CAFE,
        value: U256::from(1),
        data: Bytes::from(TRANSFER.to_vec()),
    };
    assert_eq!(
        km.authorize(&account, ALICE, &paying_call).unwrap_err(),
        EngineError::NotAuthorised {
            caller: ALICE,
            permission: "CALL",
        }
    );
}

#[test]
fn test_interface_restricted_entry() {
    let lsp7: Selector = fixed_bytes!("c52d6008");
    let (km, mut account) = setup(Permissions::CALL);
    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::new(CallTypes::CALL, ANY_ADDRESS, lsp7, ANY_FUNCTION)]),
    );
    let call = ProposedAction::call(CAFE, hex!("a9059cbb0000").to_vec());

    assert!(km.authorize(&account, ALICE, &call).is_err());
    account.register_interface(CAFE, lsp7);
    km.authorize(&account, ALICE, &call).unwrap();
}

#[test]
fn test_value_in_static_call_is_rejected_even_with_super_call() {
    let (km, account) = setup(Permissions::SUPER_CALL | Permissions::SUPER_STATIC_CALL | Permissions::STATIC_CALL);
    let static_call = ProposedAction::StaticCall {
        target: CAFE,
        value: U256::from(1),
        data: Bytes::from(TRANSFER.to_vec()),
    };
    assert_eq!(
        km.authorize(&account, ALICE, &static_call).unwrap_err(),
        EngineError::MsgValueDisallowedInStaticCall
    );

    let delegate_call = ProposedAction::DelegateCall {
        target: CAFE,
        value: U256::from(1),
        data: Bytes::new(),
    };
    assert_eq!(
        km.authorize(&account, ALICE, &delegate_call).unwrap_err(),
        EngineError::MsgValueDisallowedInDelegateCall
    );
}

#[test]
fn test_static_call_needs_its_own_permission() {
    let (km, mut account) = setup(Permissions::SUPER_CALL | Permissions::CALL);
    let static_call = ProposedAction::StaticCall {
        target: CAFE,
        value: U256::ZERO,
        data: Bytes::from(TRANSFER.to_vec()),
    };
    assert_eq!(
        km.authorize(&account, ALICE, &static_call).unwrap_err(),
        EngineError::NotAuthorised {
            caller: ALICE,
            permission: "STATIC_CALL",
        }
    );

    account.grant(ALICE, Permissions::STATIC_CALL).unwrap();
    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::any_function_of(CallTypes::STATIC_CALL, CAFE)]),
    );
    km.authorize(&account, ALICE, &static_call).unwrap();
}

#[test]
fn test_calling_the_key_manager_is_rejected() {
    let (km, account) = setup(Permissions::CALL | Permissions::SUPER_CALL);
    assert_eq!(
        km.authorize(&account, ALICE, &ProposedAction::call(KEY_MANAGER, TRANSFER.to_vec()))
            .unwrap_err(),
        EngineError::CallingKeyManagerNotAllowed
    );
}

#[test]
fn test_funded_deployment_needs_super_transfer_value() {
    let (mut km, mut account) = setup(Permissions::DEPLOY);
    let deploy = |value: u64| ProposedAction::Deploy {
        kind: DeployKind::Create,
        value: U256::from(value),
        init_code: Bytes::from(vec![0x60, 0x80]),
    };

    let deployed = km.execute(&mut account, ALICE, &deploy(0)).unwrap();
    assert_eq!(deployed.len(), 20);

    assert_eq!(
        km.execute(&mut account, ALICE, &deploy(5)).unwrap_err(),
        EngineError::NotAuthorised {
            caller: ALICE,
            permission: "SUPER_TRANSFER_VALUE",
        }
    );
}

#[test]
fn test_ownership_actions_need_change_owner() {
    let new_owner = Address::with_last_byte(0x0e);
    let (mut km, mut account) = setup(Permissions::SUPER_CALL);
    let action = ProposedAction::TransferOwnership { new_owner };

    assert_eq!(
        km.execute(&mut account, ALICE, &action).unwrap_err(),
        EngineError::NotAuthorised {
            caller: ALICE,
            permission: "CHANGE_OWNER",
        }
    );

    account.grant(ALICE, Permissions::CHANGE_OWNER).unwrap();
    km.execute(&mut account, ALICE, &action).unwrap();
    assert_eq!(account.pending_owner(), Some(new_owner));
}

#[test]
fn test_authorization_is_deterministic() {
    let (km, mut account) = setup(Permissions::TRANSFER_VALUE);
    account.set_allowed_calls(
        ALICE,
        allowed_calls::encode(&[AllowedCall::any_function_of(CallTypes::VALUE, CAFE)]),
    );

    for action in [transfer(CAFE, 1), transfer(BEEF, 1), ProposedAction::call(CAFE, Bytes::new())] {
        let first = km.authorize(&account, ALICE, &action);
        let copy = account.clone();
        let other = KeyManager::new(KEY_MANAGER, 42);
        assert_eq!(first, other.authorize(&copy, ALICE, &action));
    }
}
