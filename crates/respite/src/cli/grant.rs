//! the `free`, `code` and `expire` subcommands - drive a running gate.

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use reqwest::Client;

use super::ServerArgs;
use crate::handlers::{ExpireResponse, GrantResponse, StartCodeRequest, StartFreeRequest};

/// start a free grant out of the daily quota
#[derive(Args, Debug)]
pub struct FreeCommand {
    #[command(flatten)]
    server: ServerArgs,

    /// grant length in minutes
    #[arg(short, long, default_value_t = 30)]
    minutes: i64,
}

impl FreeCommand {
    /// run the free command
    pub async fn run(self) -> Result<()> {
        let url = format!("{}/gate/free", self.server.server_url);
        let resp = Client::new()
            .post(&url)
            .json(&StartFreeRequest {
                duration_seconds: self.minutes * 60,
            })
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        print_grant_reply(resp).await
    }
}

/// redeem a grant code
#[derive(Args, Debug)]
pub struct CodeCommand {
    #[command(flatten)]
    server: ServerArgs,

    /// the grant code to redeem
    code: String,

    /// grant length in minutes (the code may override this)
    #[arg(short, long, default_value_t = 60)]
    minutes: i64,
}

impl CodeCommand {
    /// run the code command
    pub async fn run(self) -> Result<()> {
        let url = format!("{}/gate/code", self.server.server_url);
        let resp = Client::new()
            .post(&url)
            .json(&StartCodeRequest {
                duration_seconds: self.minutes * 60,
                code: self.code,
            })
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        print_grant_reply(resp).await
    }
}

/// end the current grant immediately
#[derive(Args, Debug)]
pub struct ExpireCommand {
    #[command(flatten)]
    server: ServerArgs,
}

impl ExpireCommand {
    /// run the expire command
    pub async fn run(self) -> Result<()> {
        let url = format!("{}/gate/expire", self.server.server_url);
        let resp = Client::new()
            .post(&url)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        if !resp.status().is_success() {
            bail!("server answered {}", resp.status());
        }

        let reply: ExpireResponse = resp.json().await.context("failed to parse reply")?;
        if reply.ok {
            println!("grant expired; destinations blocked again");
        }
        Ok(())
    }
}

/// print the outcome of a grant request.
async fn print_grant_reply(resp: reqwest::Response) -> Result<()> {
    if !resp.status().is_success() {
        bail!("server answered {}", resp.status());
    }

    let reply: GrantResponse = resp.json().await.context("failed to parse reply")?;
    if reply.granted {
        match reply.expiry_time {
            Some(expiry) => println!("granted until {}", expiry),
            None => println!("granted"),
        }
    } else {
        let reason = reply.reason.as_deref().unwrap_or("refused");
        match reason {
            "quota_exceeded" => println!("refused: the daily free-grant quota is used up"),
            "in_cooldown" => println!("refused: code redemption is cooling down"),
            "invalid_code" => println!("refused: the ledger rejected that code"),
            other => println!("refused: {}", other),
        }
    }
    Ok(())
}
