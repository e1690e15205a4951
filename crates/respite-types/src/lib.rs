//! core types for respite - a temporary-access gate for blocked destinations.
//!
//! this crate provides the fundamental data structures used throughout respite:
//! - [`config`]: application configuration
//! - [`grant`]: grant kinds and redemption results

#![warn(missing_docs)]

mod config;
mod grant;

pub use config::{
    Config, DatabaseConfig, GateConfig, LedgerConfig, RuleBackendConfig, StaticCode,
};
pub use grant::{GrantKind, Redemption};
