//! concrete rule backends implementing the gate's blocking interface.
//!
//! the backend is the external mechanism that actually blocks or
//! unblocks the configured destinations: a firewall script, a dns
//! filter's api, a browser extension's controller. respite only ever
//! asks it to flip one way or the other.

mod command;
mod webhook;

pub use command::CommandBackend;
pub use webhook::WebhookBackend;

use respite_gate::RuleGatewayBoxed;
use respite_types::RuleBackendConfig;

/// construct a boxed rule backend from config.
pub fn from_config(config: &RuleBackendConfig, destinations: &[String]) -> Box<dyn RuleGatewayBoxed> {
    match config {
        RuleBackendConfig::Command {
            enable_command,
            disable_command,
        } => Box::new(CommandBackend::new(
            enable_command.clone(),
            disable_command.clone(),
        )),
        RuleBackendConfig::Webhook { url, secret } => Box::new(WebhookBackend::new(
            url.clone(),
            secret.clone(),
            destinations.to_vec(),
        )),
    }
}
