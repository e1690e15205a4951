//! http redemption ledger client.
//!
//! POSTs the code to a remote ledger and maps its verdict. the remote
//! call is treated as atomic: either the ledger accepts the code (and
//! has marked it used) or it rejects it. the gate never learns about
//! partially-redeemed codes.

use reqwest::Client;
use respite_gate::ledger::{LedgerError, RedemptionLedger};
use respite_types::{GrantKind, Redemption};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// redemption ledger backed by a remote http service.
pub struct HttpLedger {
    client: Client,
    url: String,
    token: Option<SecretString>,
}

/// wire format of the remote ledger's reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedeemReply {
    /// `valid`, `invalid` or `used`.
    result: String,
    kind: Option<GrantKind>,
    duration_secs: Option<u64>,
}

impl HttpLedger {
    /// create a client redeeming against `url`.
    pub fn new(url: String, token: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            url,
            token,
        }
    }
}

impl RedemptionLedger for HttpLedger {
    async fn redeem(&self, code: String) -> Result<Option<Redemption>, LedgerError> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "code": code }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token.expose_secret());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "ledger answered {}",
                resp.status()
            )));
        }

        let reply: RedeemReply = resp
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        match reply.result.as_str() {
            "valid" => {
                let kind = reply.kind.ok_or_else(|| {
                    LedgerError::InvalidResponse("valid reply without a kind".to_string())
                })?;
                Ok(Some(Redemption {
                    kind,
                    duration_secs: reply.duration_secs,
                }))
            }
            "invalid" | "used" => Ok(None),
            other => Err(LedgerError::InvalidResponse(format!(
                "unknown result: {other}"
            ))),
        }
    }
}
