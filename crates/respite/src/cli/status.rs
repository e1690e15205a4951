//! the `status` subcommand - query a running gate.

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};

use super::ServerArgs;
use crate::handlers::StatusResponse;

/// show the gate's current status
#[derive(Args, Debug)]
pub struct StatusCommand {
    #[command(flatten)]
    server: ServerArgs,
}

impl StatusCommand {
    /// run the status command
    pub async fn run(self) -> Result<()> {
        let url = format!("{}/gate/status", self.server.server_url);
        let resp = reqwest::get(&url)
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        if !resp.status().is_success() {
            bail!("server answered {}", resp.status());
        }

        let status: StatusResponse = resp.json().await.context("failed to parse status")?;

        match status.remaining_seconds {
            Some(remaining) => {
                println!("state: granted");
                println!("time remaining: {}", format_clock(remaining));
                if let Some(total) = status.grant_duration_seconds {
                    println!("grant length: {}", format_clock(total));
                }
            }
            None => println!("state: blocked"),
        }

        println!("free grants remaining today: {}", status.quota_remaining);
        if let Some(cooldown) = status.cooldown_remaining_seconds {
            println!("code cooldown: {} left", format_clock(cooldown));
        }

        Ok(())
    }
}

/// format seconds as m:ss (or h:mm:ss past the hour).
pub(crate) fn format_clock(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
