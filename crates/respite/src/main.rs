//! respite - temporary-access gate for blocked destinations

use clap::Parser;
use color_eyre::eyre::Result;
use respite::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::Status(cmd) => cmd.run().await,
        Command::Free(cmd) => cmd.run().await,
        Command::Code(cmd) => cmd.run().await,
        Command::Expire(cmd) => cmd.run().await,
    }
}
