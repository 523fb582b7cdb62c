use alloy_primitives::Bytes;
use anyhow::{Context, Result};
use keyguard_engine::MemoryAccount;
use keyguard_state::AccountSnapshot;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber
pub fn init_tracing(debug: bool) {
    // RUST_LOG always wins over the default level
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a hex string, with or without `0x`
pub fn parse_hex(input: &str) -> Result<Bytes> {
    let digits = input.trim().trim_start_matches("0x");
    let bytes = hex::decode(digits).with_context(|| format!("invalid hex: {input}"))?;
    Ok(bytes.into())
}

/// Load the account described by a JSON snapshot
pub fn load_account(path: &Path) -> Result<MemoryAccount> {
    let snapshot =
        AccountSnapshot::read_from(path).with_context(|| format!("failed to load snapshot {}", path.display()))?;
    tracing::debug!(
        account = %snapshot.account,
        entries = snapshot.data.len(),
        "Loaded account snapshot"
    );
    Ok(MemoryAccount::from_snapshot(&snapshot))
}

pub fn save_account(path: &Path, account: &MemoryAccount) -> Result<()> {
    account
        .snapshot()
        .write_to(path)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), "Account snapshot updated");
    Ok(())
}
