//! command-line interface for respite.
//!
//! `serve` runs the gate daemon; the other subcommands are thin http
//! clients against a running daemon.

pub mod grant;
pub mod serve;
pub mod status;

use clap::{Args, Parser, Subcommand};

/// respite - temporary-access gate for blocked destinations
#[derive(Parser, Debug)]
#[command(name = "respite", version, about)]
pub struct Cli {
    /// subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// top-level subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the gate server
    Serve(serve::ServeCommand),

    /// show the gate's current status
    Status(status::StatusCommand),

    /// start a free grant out of the daily quota
    Free(grant::FreeCommand),

    /// redeem a grant code
    Code(grant::CodeCommand),

    /// end the current grant immediately
    Expire(grant::ExpireCommand),
}

/// arguments shared by the client subcommands
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// base url of the running respite server
    #[arg(
        long,
        env = "RESPITE_SERVER_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    pub server_url: String,
}
