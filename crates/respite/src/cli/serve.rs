//! the `serve` subcommand - runs the gate server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use color_eyre::eyre::{Context, Result};
use respite_db::RespiteDb;
use respite_gate::{AccessGate, GatePolicy, SystemClock};
use respite_types::{Config, RuleBackendConfig};
use tokio::net::TcpListener;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::{create_app, ledger_client, rule_backend};

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &["/etc/respite/config.toml", "./config.toml"];

/// run the respite gate server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// path to config file (toml format)
    #[arg(short, long, env = "RESPITE_CONFIG")]
    config: Option<PathBuf>,

    /// database url (sqlite path or postgres://)
    #[arg(long, env = "RESPITE_DATABASE_URL")]
    database_url: Option<String>,

    /// address to listen on
    #[arg(long, env = "RESPITE_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// server url (for client configuration)
    #[arg(long, env = "RESPITE_SERVER_URL")]
    server_url: Option<String>,

    /// free grants permitted per quota window
    #[arg(long, env = "RESPITE_MAX_FREE_GRANTS")]
    max_free_grants: Option<u32>,

    /// log level
    #[arg(long, env = "RESPITE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl ServeCommand {
    /// find and load config file, returning none if no config file is found.
    fn load_config_file(config_path: Option<&PathBuf>) -> Result<Option<Config>> {
        // if explicit path provided, it must exist
        if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {:?}", path))?;
            return Ok(Some(config));
        }

        // search default paths
        for path_str in CONFIG_SEARCH_PATHS {
            let path = PathBuf::from(path_str);
            if path.exists() {
                debug!("Found config file at {:?}", path);
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file: {:?}", path))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("failed to parse config file: {:?}", path))?;
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// convert cli arguments into a config struct, merging with config file if present.
    ///
    /// priority order: defaults -> config file -> cli flags
    fn into_config(self) -> Result<Config> {
        // start with defaults, then overlay config file if found
        let mut config = match Self::load_config_file(self.config.as_ref())? {
            Some(file_config) => {
                info!("Loaded configuration from file");
                file_config
            }
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };

        // cli overrides (only if explicitly set)
        if let Some(database_url) = self.database_url {
            config.database = parse_database_url(&database_url);
        }
        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if let Some(server_url) = self.server_url {
            config.server_url = server_url;
        }
        if let Some(max_free_grants) = self.max_free_grants {
            config.gate.max_free_grants = max_free_grants;
        }

        Ok(config)
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        // initialize logging (use CLI override or default to info)
        let log_level_str = self.log_level.clone().unwrap_or_else(|| "info".to_string());
        let log_level = match log_level_str.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        info!("Starting respite...");

        let config = self.into_config()?;

        if config.blocked_destinations.is_empty() {
            warn!("no blocked destinations configured");
        }
        if let RuleBackendConfig::Command {
            enable_command,
            disable_command,
        } = &config.rule_backend
        {
            if enable_command.is_empty() || disable_command.is_empty() {
                warn!("rule backend has no commands configured; blocking is a no-op");
            }
        }

        // connect to database and run migrations
        let db = RespiteDb::new(&config.database)
            .await
            .context("failed to open database")?;

        // build collaborators from config
        let gateway = rule_backend::from_config(&config.rule_backend, &config.blocked_destinations);
        let ledger = ledger_client::from_config(&config.ledger);
        let policy = GatePolicy::from_config(&config.gate);

        let gate = AccessGate::new(db.clone(), gateway, ledger, Arc::new(SystemClock), policy);

        // reconcile persisted state with the clock before serving anything
        let status = gate
            .initialize()
            .await
            .context("failed to initialize access gate")?;
        info!(state = ?status.state, quota_remaining = status.quota_remaining, "gate initialized");

        let app = create_app(gate.clone(), db, config.clone());

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;
        info!("listening on {}", config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        // the persisted expiry survives; the next start picks it up
        gate.shutdown().await;
        info!("shut down");

        Ok(())
    }
}

/// parse a database url into a database config.
fn parse_database_url(url: &str) -> respite_types::DatabaseConfig {
    let mut database = respite_types::DatabaseConfig::default();
    if let Some(path) = url.strip_prefix("sqlite://") {
        database.db_type = "sqlite".to_string();
        database.connection_string = path.to_string();
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        database.db_type = "postgres".to_string();
        database.connection_string = url.to_string();
    } else {
        // bare path: treat as sqlite file
        database.db_type = "sqlite".to_string();
        database.connection_string = url.to_string();
    }
    database
}

/// wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
