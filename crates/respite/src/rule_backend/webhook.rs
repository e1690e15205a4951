//! webhook rule backend.
//!
//! POSTs blocking changes as JSON to a user-configured controller URL.
//! optionally signs requests with HMAC-SHA256.

use reqwest::Client;
use respite_gate::gateway::{GatewayError, RuleGateway};
use secrecy::{ExposeSecret, SecretString};

/// rule backend that drives a remote controller over http.
pub struct WebhookBackend {
    client: Client,
    url: String,
    secret: Option<SecretString>,
    destinations: Vec<String>,
}

impl WebhookBackend {
    /// create a backend posting to `url` for the given destinations.
    pub fn new(url: String, secret: Option<SecretString>, destinations: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            secret,
            destinations,
        }
    }

    /// compute HMAC-SHA256 signature of the request body
    fn sign(&self, body: &[u8]) -> Option<String> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let secret = self.secret.as_ref()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
        mac.update(body);
        let result = mac.finalize();
        Some(hex::encode(result.into_bytes()))
    }
}

impl RuleGateway for WebhookBackend {
    async fn set_blocking(&self, enabled: bool) -> Result<(), GatewayError> {
        let payload = serde_json::json!({
            "action": if enabled { "block" } else { "unblock" },
            "destinations": self.destinations,
        });
        let body = serde_json::to_vec(&payload)
            .map_err(|e| GatewayError::Backend(format!("json serialisation: {e}")))?;

        let mut req = self.client.post(&self.url).json(&payload);
        if let Some(sig) = self.sign(&body) {
            req = req.header("X-Signature", sig);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Backend(format!("webhook {status}: {text}")));
        }

        Ok(())
    }
}
