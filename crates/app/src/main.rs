mod codec;
mod config;
mod init;
mod simulate;

use clap::Parser;
use config::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init::init_tracing(cli.debug);

    let output = match &cli.command {
        Commands::Permissions(command) => codec::permissions(command)?,
        Commands::AllowedCalls(command) => codec::allowed_calls(command)?,
        Commands::AllowedKeys(command) => codec::allowed_keys(command)?,
        Commands::Key(command) => codec::key(command)?,
        Commands::Simulate(config) => simulate::simulate(cli.key_manager, config)?,
        Commands::Relay(command) => simulate::relay(cli.key_manager, command).await?,
        Commands::Version => format!(
            "Keyguard v{}\nLSP6 key manager authorization toolkit",
            env!("CARGO_PKG_VERSION")
        ),
    };
    println!("{output}");
    Ok(())
}
