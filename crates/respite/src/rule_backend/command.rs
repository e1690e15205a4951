//! command rule backend.
//!
//! runs a user-configured command pair through `/bin/sh -c` - typically
//! a firewall or dns-filter script. an empty command is a logged no-op
//! so a fresh install works before any backend is wired up.

use respite_gate::gateway::{GatewayError, RuleGateway};
use tracing::debug;

/// rule backend that shells out to configured commands.
pub struct CommandBackend {
    enable_command: String,
    disable_command: String,
}

impl CommandBackend {
    /// create a backend from an enable/disable command pair.
    pub fn new(enable_command: String, disable_command: String) -> Self {
        Self {
            enable_command,
            disable_command,
        }
    }
}

impl RuleGateway for CommandBackend {
    async fn set_blocking(&self, enabled: bool) -> Result<(), GatewayError> {
        let command = if enabled {
            &self.enable_command
        } else {
            &self.disable_command
        };

        if command.is_empty() {
            debug!(enabled, "no rule command configured, skipping");
            return Ok(());
        }

        let status = tokio::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .status()
            .await?;

        if !status.success() {
            return Err(GatewayError::Backend(format!(
                "rule command exited with {status}"
            )));
        }

        debug!(enabled, "rule command applied");
        Ok(())
    }
}
