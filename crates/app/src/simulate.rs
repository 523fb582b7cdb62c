//! Offline execution of payloads and relay calls against account snapshots
use crate::config::{KeyManagerConfig, RelayCallConfig, RelayCommand, RelayExecuteConfig, SimulateConfig};
use crate::init::{load_account, parse_hex, save_account};
use alloy_primitives::U256;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use keyguard_auth::{RelaySigner, ValidityTimestamps};
use keyguard_engine::{KeyManager, KeyManagerEvent};
use keyguard_tx::{RelayCall, decode_calldata};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn simulate(key_manager: KeyManagerConfig, config: &SimulateConfig) -> Result<String> {
    let mut account = load_account(&config.state)?;
    let mut km = KeyManager::new(key_manager.address, key_manager.chain_id);
    let payload = parse_hex(&config.payload)?;

    if config.dry_run {
        for action in decode_calldata(&payload)? {
            km.authorize(&account, config.caller, &action)
                .with_context(|| format!("{} denied", action.name()))?;
        }
        return Ok("authorized".to_string());
    }

    let output = km.execute_payload(&mut account, config.caller, config.value, &payload)?;
    let mut lines = vec![format!("output: {output}")];
    lines.extend(km.take_events().iter().map(format_event));
    lines.extend(
        account
            .take_data_events()
            .iter()
            .map(|event| format!("DataChanged {} = {}", event.key, event.value)),
    );

    if config.write {
        save_account(&config.state, &account)?;
    }
    Ok(lines.join("\n"))
}

pub async fn relay(key_manager: KeyManagerConfig, command: &RelayCommand) -> Result<String> {
    let km = KeyManager::new(key_manager.address, key_manager.chain_id);
    match command {
        RelayCommand::Digest(config) => {
            let call = build_call(config)?;
            Ok(km.verifier().signing_hash(&call).to_string())
        }
        RelayCommand::Sign { call, private_key } => {
            let signer: PrivateKeySigner = private_key.trim().parse().context("invalid private key")?;
            let signer = RelaySigner::new(signer);
            let mut call = build_call(call)?;
            signer.sign_relay_call_async(km.verifier(), &mut call).await?;
            tracing::info!(signer = %signer.address(), nonce = %call.nonce, "Relay call signed");
            Ok(serde_json::to_string_pretty(&call)?)
        }
        RelayCommand::Execute(config) => execute_relay(km, config),
    }
}

fn execute_relay(mut km: KeyManager, config: &RelayExecuteConfig) -> Result<String> {
    let mut account = load_account(&config.state)?;
    let calls = config
        .calls
        .iter()
        .map(|path| read_call(path))
        .collect::<Result<Vec<_>>>()?;
    let now = match config.now {
        Some(now) => now,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };

    let outputs = match calls.as_slice() {
        [call] => vec![km.execute_relay_call(&mut account, call, now)?],
        calls => {
            let total = calls
                .iter()
                .fold(U256::ZERO, |total, call| total.saturating_add(call.value));
            km.execute_relay_call_batch(&mut account, calls, total, now)?
        }
    };

    let mut lines: Vec<_> = outputs.iter().map(|output| format!("output: {output}")).collect();
    lines.extend(km.take_events().iter().map(format_event));

    if config.write {
        save_account(&config.state, &account)?;
    }
    Ok(lines.join("\n"))
}

fn build_call(config: &RelayCallConfig) -> Result<RelayCall> {
    let validity = ValidityTimestamps::new(config.valid_from, config.valid_until);
    let call = RelayCall::new(config.nonce, validity.to_word(), config.value, parse_hex(&config.payload)?);
    call.check_size()?;
    Ok(call)
}

fn read_call(path: &Path) -> Result<RelayCall> {
    let json = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid relay call in {}", path.display()))
}

fn format_event(event: &KeyManagerEvent) -> String {
    match event {
        KeyManagerEvent::PermissionsVerified { signer, value, selector } => {
            format!("PermissionsVerified signer={signer} value={value} selector={selector}")
        }
    }
}
