//! error types for respite-gate.
//!
//! quota exhaustion, cooldown and bad codes are expected outcomes, not
//! errors - they live in [`StartOutcome`](crate::StartOutcome). the
//! variants here are infrastructure failures.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::ledger::LedgerError;

/// infrastructure failures surfaced by gate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// the durable state store failed. the transition was aborted and
    /// no partial state was written.
    #[error("state store unavailable: {0}")]
    Store(#[from] respite_db::Error),

    /// the rule gateway failed. the state mutation that already
    /// committed stands; blocking may disagree with it until the next
    /// transition or restart reapplies the gateway call.
    #[error("rule gateway unavailable: {0}")]
    Gateway(#[source] GatewayError),

    /// the redemption ledger could not be reached. no state was mutated
    /// and the code was not spent.
    #[error("redemption ledger unavailable: {0}")]
    Ledger(#[source] LedgerError),
}

/// result type for gate operations.
pub type Result<T> = std::result::Result<T, Error>;
