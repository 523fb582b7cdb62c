//! Relay call (LSP25) execution through the key manager
use alloy_primitives::{Address, B256, Bytes, U256, address, b256};
use alloy_signer::SignerSync;
use keyguard_auth::{AuthError, Lsp25Message, RelaySigner, ValidityTimestamps};
use keyguard_engine::{ControlledAccount, EngineError, KeyManager, KeyManagerEvent, MemoryAccount};
use keyguard_state::DataStore;
use keyguard_tx::{ProposedAction, RelayCall, Selector, encode_calldata};
use keyguard_types::Permissions;

const CHAIN_ID: u64 = 4201;
const NOW: u64 = 1_700_000_000;
const KEY_MANAGER: Address = address!("00000000000000000000000000000000000004b4");
const ACCOUNT: Address = address!("000000000000000000000000000000000000acc0");
const KEY: B256 = b256!("deba1e292f8ba88238e10ab3c7f88bd4be4fac56cad5194b6ecceaf653468af1");

fn setup(signer: &RelaySigner, permissions: Permissions) -> (KeyManager, MemoryAccount) {
    let key_manager = KeyManager::new(KEY_MANAGER, CHAIN_ID);
    let mut account = MemoryAccount::new(ACCOUNT, KEY_MANAGER);
    account.grant(signer.address(), permissions).unwrap();
    (key_manager, account)
}

fn set_data_payload(byte: u8) -> Bytes {
    encode_calldata(&ProposedAction::set_data(KEY, vec![byte]))
}

fn signed(km: &KeyManager, signer: &RelaySigner, nonce: U256, value: U256, payload: Bytes) -> RelayCall {
    let mut call = RelayCall::new(nonce, U256::ZERO, value, payload);
    signer.sign_relay_call(km.verifier(), &mut call).unwrap();
    call
}

fn relayer_permissions() -> Permissions {
    Permissions::EXECUTE_RELAY_CALL | Permissions::SUPER_SET_DATA
}

#[test]
fn test_relay_call_executes_as_signer() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());
    let call = signed(&km, &signer, km.get_nonce(signer.address(), 0), U256::ZERO, set_data_payload(1));

    km.execute_relay_call(&mut account, &call, NOW).unwrap();

    assert_eq!(account.get_data(&KEY), Some(Bytes::from(vec![1])));
    assert_eq!(km.get_nonce(signer.address(), 0), U256::from(1));
    assert_eq!(
        km.take_events(),
        vec![KeyManagerEvent::PermissionsVerified {
            signer: signer.address(),
            value: U256::ZERO,
            selector: Selector::from(alloy_primitives::hex!("7f23690c")),
        }]
    );
}

#[test]
fn test_reused_nonce_is_rejected() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());
    let call = signed(&km, &signer, U256::ZERO, U256::ZERO, set_data_payload(1));

    km.execute_relay_call(&mut account, &call, NOW).unwrap();
    let err = km.execute_relay_call(&mut account, &call, NOW).unwrap_err();

    assert!(matches!(
        err,
        EngineError::Relay(AuthError::InvalidRelayNonce { signer: s, nonce, .. })
            if s == signer.address() && nonce == U256::ZERO
    ));
}

#[test]
fn test_personal_message_signature_has_no_permissions() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());

    let mut call = RelayCall::new(U256::ZERO, U256::ZERO, U256::ZERO, set_data_payload(1));
    let message = Lsp25Message::from_relay_call(CHAIN_ID, &call).encode_packed();
    let signature = signer.inner().sign_message_sync(&message).unwrap();
    call.set_signature(signature.as_bytes());

    let err = km.execute_relay_call(&mut account, &call, NOW).unwrap_err();
    assert!(matches!(err, EngineError::NoPermissionsSet(recovered) if recovered != signer.address()));
    assert_eq!(account.get_data(&KEY), None);
}

#[test]
fn test_missing_relay_permission_keeps_nonce() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, Permissions::SUPER_SET_DATA);
    let call = signed(&km, &signer, U256::ZERO, U256::ZERO, set_data_payload(1));

    assert_eq!(
        km.execute_relay_call(&mut account, &call, NOW).unwrap_err(),
        EngineError::NotAuthorised {
            caller: signer.address(),
            permission: "EXECUTE_RELAY_CALL",
        }
    );
    assert_eq!(km.get_nonce(signer.address(), 0), U256::ZERO);
}

#[test]
fn test_failed_payload_can_be_retried() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, Permissions::EXECUTE_RELAY_CALL);
    let call = signed(&km, &signer, U256::ZERO, U256::ZERO, set_data_payload(1));

    assert!(matches!(
        km.execute_relay_call(&mut account, &call, NOW),
        Err(EngineError::NotAuthorised { permission: "SET_DATA", .. })
    ));
    assert_eq!(km.get_nonce(signer.address(), 0), U256::ZERO);

    account.grant(signer.address(), relayer_permissions()).unwrap();
    km.execute_relay_call(&mut account, &call, NOW).unwrap();
    assert_eq!(km.get_nonce(signer.address(), 0), U256::from(1));
}

#[test]
fn test_nonce_channels_are_independent() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());

    let on_channel_5 = signed(&km, &signer, km.get_nonce(signer.address(), 5), U256::ZERO, set_data_payload(5));
    let on_channel_0 = signed(&km, &signer, km.get_nonce(signer.address(), 0), U256::ZERO, set_data_payload(0));

    km.execute_relay_call(&mut account, &on_channel_5, NOW).unwrap();
    km.execute_relay_call(&mut account, &on_channel_0, NOW).unwrap();

    assert_eq!(km.get_nonce(signer.address(), 5), (U256::from(5) << 128) | U256::from(1));
    assert_eq!(km.get_nonce(signer.address(), 0), U256::from(1));
    assert_eq!(km.get_nonce(signer.address(), 1), U256::from(1) << 128);
}

#[test]
fn test_validity_window() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());

    let mut early = RelayCall::new(
        U256::ZERO,
        ValidityTimestamps::new(u128::from(NOW) + 10, 0).to_word(),
        U256::ZERO,
        set_data_payload(1),
    );
    signer.sign_relay_call(km.verifier(), &mut early).unwrap();

    assert_eq!(
        km.execute_relay_call(&mut account, &early, NOW).unwrap_err(),
        EngineError::Relay(AuthError::RelayCallBeforeStartTime {
            start: u128::from(NOW) + 10,
            now: NOW,
        })
    );
    km.execute_relay_call(&mut account, &early, NOW + 10).unwrap();
}

#[test]
fn test_relay_value_is_forwarded() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());
    let call = signed(&km, &signer, U256::ZERO, U256::from(7), set_data_payload(1));

    km.execute_relay_call(&mut account, &call, NOW).unwrap();
    assert_eq!(account.balance(), U256::from(7));
}

#[test]
fn test_relay_batch_value_must_match() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());
    let calls = vec![
        signed(&km, &signer, U256::ZERO, U256::from(1), set_data_payload(1)),
        signed(&km, &signer, U256::from(1), U256::from(2), set_data_payload(2)),
    ];

    assert_eq!(
        km.execute_relay_call_batch(&mut account, &calls, U256::from(2), NOW)
            .unwrap_err(),
        EngineError::BatchInsufficientValueSent {
            total: U256::from(3),
            msg_value: U256::from(2),
        }
    );
    assert_eq!(
        km.execute_relay_call_batch(&mut account, &calls, U256::from(4), NOW)
            .unwrap_err(),
        EngineError::BatchExcessiveValueSent {
            total: U256::from(3),
            msg_value: U256::from(4),
        }
    );

    let outputs = km
        .execute_relay_call_batch(&mut account, &calls, U256::from(3), NOW)
        .unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(account.balance(), U256::from(3));
    assert_eq!(account.get_data(&KEY), Some(Bytes::from(vec![2])));
    assert_eq!(km.get_nonce(signer.address(), 0), U256::from(2));
}

#[test]
fn test_failed_relay_batch_rolls_back_everything() {
    let signer = RelaySigner::random();
    let (mut km, mut account) = setup(&signer, relayer_permissions());
    let first = signed(&km, &signer, U256::ZERO, U256::ZERO, set_data_payload(1));
    // replays the first nonce
    let second = signed(&km, &signer, U256::ZERO, U256::ZERO, set_data_payload(2));

    let err = km
        .execute_relay_call_batch(&mut account, &[first, second], U256::ZERO, NOW)
        .unwrap_err();

    assert!(matches!(err, EngineError::Relay(AuthError::InvalidRelayNonce { .. })));
    assert_eq!(account.get_data(&KEY), None);
    assert_eq!(km.get_nonce(signer.address(), 0), U256::ZERO);
    assert!(km.take_events().is_empty());
}
