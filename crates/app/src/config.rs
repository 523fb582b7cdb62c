use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keyguard")]
#[command(version, about = "Keyguard - LSP6 key manager toolkit", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long = "log.debug", global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub key_manager: KeyManagerConfig,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identity of the simulated key manager
#[derive(Args, Clone, Copy)]
pub struct KeyManagerConfig {
    /// Chain ID bound into relay signatures
    #[arg(long = "chain.id", global = true, default_value = "42")]
    pub chain_id: u64,

    /// Key manager address bound into relay signatures
    #[arg(
        long = "key-manager",
        global = true,
        default_value = "0x0000000000000000000000000000000000000001"
    )]
    pub address: Address,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode or decode permission bitmaps
    #[command(subcommand)]
    Permissions(PermissionsCommand),
    /// Encode or decode Allowed-Calls values
    #[command(subcommand)]
    AllowedCalls(AllowedCallsCommand),
    /// Encode or decode Allowed-ERC725Y-Data-Keys values
    #[command(subcommand)]
    AllowedKeys(AllowedKeysCommand),
    /// Inspect ERC725Y data keys
    #[command(subcommand)]
    Key(KeyCommand),
    /// Run an ERC725 payload against an account snapshot
    Simulate(Box<SimulateConfig>),
    /// Build, sign and execute relay calls
    #[command(subcommand)]
    Relay(RelayCommand),
    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum PermissionsCommand {
    /// List the flags set in a 32-byte permission value
    Decode { value: String },
    /// Combine flag names into a 32-byte permission value
    Encode {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AllowedCallsCommand {
    /// Print every entry of an Allowed-Calls value
    Decode { value: String },
    /// Encode entries written as `<callTypes>:<address>:<interfaceId>:<selector>`
    Encode {
        #[arg(required = true)]
        entries: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AllowedKeysCommand {
    /// Print every prefix of an Allowed-ERC725Y-Data-Keys value
    Decode { value: String },
    /// Encode hex prefixes (1 to 32 bytes each)
    Encode {
        #[arg(required = true)]
        prefixes: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Tell what a data key means to the permission system
    Classify { key: String },
    /// Derive the permission keys of a controller
    Derive { controller: Address },
}

#[derive(Args)]
pub struct SimulateConfig {
    /// Account snapshot (JSON)
    #[arg(long = "state")]
    pub state: PathBuf,

    /// Controller calling the key manager
    #[arg(long = "caller")]
    pub caller: Address,

    /// ERC725 calldata (hex)
    #[arg(long = "payload")]
    pub payload: String,

    /// Native value sent with the call
    #[arg(long = "value", default_value = "0")]
    pub value: U256,

    /// Only check permissions, do not execute
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Write the resulting state back to the snapshot
    #[arg(long = "write")]
    pub write: bool,
}

#[derive(Subcommand)]
pub enum RelayCommand {
    /// Print the LSP25 digest a controller must sign
    Digest(RelayCallConfig),
    /// Sign a relay call and print it as JSON
    Sign {
        #[command(flatten)]
        call: RelayCallConfig,

        /// Signer private key (hex)
        #[arg(long = "private-key")]
        private_key: String,
    },
    /// Execute signed relay calls (JSON files) against an account snapshot
    Execute(Box<RelayExecuteConfig>),
}

#[derive(Args)]
pub struct RelayCallConfig {
    /// `(channel << 128) | counter`
    #[arg(long = "nonce", default_value = "0")]
    pub nonce: U256,

    /// Earliest execution time (unix seconds)
    #[arg(long = "valid.from", default_value = "0")]
    pub valid_from: u128,

    /// Latest execution time (unix seconds), 0 for no expiry
    #[arg(long = "valid.until", default_value = "0")]
    pub valid_until: u128,

    /// Native value the relayer forwards
    #[arg(long = "value", default_value = "0")]
    pub value: U256,

    /// ERC725 calldata (hex)
    #[arg(long = "payload")]
    pub payload: String,
}

#[derive(Args)]
pub struct RelayExecuteConfig {
    /// Account snapshot (JSON)
    #[arg(long = "state")]
    pub state: PathBuf,

    /// Signed relay calls, executed as one batch when more than one is given
    #[arg(long = "call", required = true)]
    pub calls: Vec<PathBuf>,

    /// Current time (unix seconds), defaults to the system clock
    #[arg(long = "now")]
    pub now: Option<u64>,

    /// Write the resulting state back to the snapshot
    #[arg(long = "write")]
    pub write: bool,
}
