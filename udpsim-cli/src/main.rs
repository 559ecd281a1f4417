//! ## udpsim-cli
//! **Command-line front end for the UDP network-condition simulator**
//!
//! `udpsim` with no subcommand runs the simulator. `show-config` and
//! `save-config` resolve the layered configuration without starting it.

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
