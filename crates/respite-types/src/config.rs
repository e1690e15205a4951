//! configuration types for respite

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::GrantKind;

/// main configuration for respite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// url clients use to reach this server.
    pub server_url: String,

    /// address to bind the http server to.
    pub listen_addr: String,

    /// destinations the rule backend keeps blocked outside a grant.
    ///
    /// the gate never interprets these - they are handed to the rule
    /// backend verbatim and shown to the ui.
    pub blocked_destinations: Vec<String>,

    /// database configuration.
    pub database: DatabaseConfig,

    /// gate policy: quota, cooldown, grant limits.
    pub gate: GateConfig,

    /// rule backend used to enable/disable blocking.
    pub rule_backend: RuleBackendConfig,

    /// redemption ledger used to validate grant codes.
    pub ledger: LedgerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            blocked_destinations: vec![],
            database: DatabaseConfig::default(),
            gate: GateConfig::default(),
            rule_backend: RuleBackendConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

/// database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// database type: "sqlite" or "postgres".
    pub db_type: String,

    /// database connection string or file path.
    pub connection_string: String,

    /// enable write-ahead logging for sqlite.
    pub write_ahead_log: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            connection_string: "/var/lib/respite/db.sqlite".to_string(),
            write_ahead_log: true,
        }
    }
}

/// gate policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// free grants permitted per quota window.
    pub max_free_grants: u32,

    /// seconds after a privileged grant before another code is accepted.
    pub cooldown_window_secs: u64,

    /// length of the free-grant quota window in seconds.
    pub quota_window_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_free_grants: 3,
            cooldown_window_secs: 6 * 60 * 60,
            quota_window_secs: 24 * 60 * 60,
        }
    }
}

/// rule backend selection and settings.
///
/// the backend is the external mechanism that actually blocks or unblocks
/// the configured destinations. respite only tells it which way to flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RuleBackendConfig {
    /// run a configured command pair to enable/disable blocking.
    Command {
        /// command run to enable blocking (restore the blocked state).
        enable_command: String,
        /// command run to disable blocking (open the gate).
        disable_command: String,
    },

    /// POST `{action, destinations}` json to a remote controller.
    Webhook {
        /// controller endpoint url.
        url: String,
        /// optional shared secret for hmac-sha256 request signing.
        /// never serialized back out.
        #[serde(default, skip_serializing)]
        secret: Option<SecretString>,
    },
}

impl Default for RuleBackendConfig {
    fn default() -> Self {
        // empty commands are treated as no-ops by the command backend;
        // serve warns about this at startup
        Self::Command {
            enable_command: String::new(),
            disable_command: String::new(),
        }
    }
}

/// redemption ledger selection and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ledger", rename_all = "lowercase")]
pub enum LedgerConfig {
    /// redeem codes against a remote http ledger.
    Http {
        /// ledger endpoint url.
        url: String,
        /// optional bearer token. never serialized back out.
        #[serde(default, skip_serializing)]
        token: Option<SecretString>,
    },

    /// validate codes against a list from this config file.
    ///
    /// useful for air-gapped deployments and tests. each code is
    /// single-use per process lifetime.
    Static {
        /// accepted codes.
        codes: Vec<StaticCode>,
    },
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::Static { codes: vec![] }
    }
}

/// one entry in the static ledger's code list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCode {
    /// the code string.
    pub code: String,

    /// grant kind this code unlocks.
    pub kind: GrantKind,

    /// grant length in seconds; absent means "use the requested duration".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}
