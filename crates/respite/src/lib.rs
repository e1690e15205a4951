//! respite library - http handlers and application setup.
//!
//! this crate wires the access gate to the outside world:
//! - [`handlers`]: http request handlers (the gate protocol adapter)
//! - [`rule_backend`]: concrete blocking backends (command, webhook)
//! - [`ledger_client`]: concrete redemption ledgers (http, static)
//! - [`cli`]: command-line interface implementation

#![warn(missing_docs)]

pub mod cli;
pub mod handlers;
pub mod ledger_client;
pub mod rule_backend;

use axum::{
    Router,
    routing::{get, post},
};
use respite_db::RespiteDb;
use respite_gate::AccessGate;
use respite_types::Config;

/// shared state for http handlers.
#[derive(Clone)]
pub struct AppState {
    /// the access gate core. sole writer of the persisted state.
    pub gate: AccessGate<RespiteDb>,
    /// database handle, used by health checks.
    pub db: RespiteDb,
    /// server configuration.
    pub config: Config,
}

/// build the axum application router.
///
/// used by `respite serve` and, with in-memory fixtures, by the
/// integration tests.
pub fn create_app(gate: AccessGate<RespiteDb>, db: RespiteDb, config: Config) -> Router {
    let state = AppState { gate, db, config };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/gate/status", get(handlers::status))
        .route("/gate/destinations", get(handlers::destinations))
        .route("/gate/free", post(handlers::start_free))
        .route("/gate/code", post(handlers::apply_code))
        .route("/gate/expire", post(handlers::force_expire))
        // every request gets an answer; unknown paths get an explicit
        // "unsupported" reply rather than silence
        .fallback(handlers::unsupported)
        .with_state(state)
}
